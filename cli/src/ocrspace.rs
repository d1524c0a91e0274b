//! OCR.space client used by `larder scan`.
//!
//! The free tier accepts a base64-encoded image in a form POST and returns
//! the recognized text per page. The blocking [`TextRecognizer`] impl lets
//! the synchronous core drive it without caring about the async plumbing.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose;
use larder_core::service::TextRecognizer;
use serde::Deserialize;

const DEFAULT_URL: &str = "https://api.ocr.space/parse/image";
// Public demo key; rate-limited but fine for occasional use.
const DEFAULT_KEY: &str = "helloworld";

pub struct OcrSpaceClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    url: String,
    api_key: String,
}

impl OcrSpaceClient {
    /// Build a client from `LARDER_OCR_KEY` and `LARDER_OCR_URL`, falling
    /// back to the public demo endpoint.
    pub fn from_env() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "larder-cli/{} (https://github.com/larder-tools/larder)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to build tokio runtime");

        OcrSpaceClient {
            client,
            rt,
            url: std::env::var("LARDER_OCR_URL").unwrap_or_else(|_| DEFAULT_URL.to_string()),
            api_key: std::env::var("LARDER_OCR_KEY").unwrap_or_else(|_| DEFAULT_KEY.to_string()),
        }
    }

    async fn recognize_async(&self, image: &[u8]) -> Result<String> {
        let encoded = general_purpose::STANDARD.encode(image);
        let form = [
            ("apikey", self.api_key.clone()),
            (
                "base64Image",
                format!("data:image/jpeg;base64,{encoded}"),
            ),
            ("language", "eng".to_string()),
            ("scale", "true".to_string()),
            ("OCREngine", "2".to_string()),
        ];

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .context("Failed to reach OCR.space")?;

        if !response.status().is_success() {
            bail!("OCR.space returned HTTP {}", response.status());
        }

        let body: OcrSpaceResponse = response
            .json()
            .await
            .context("Failed to parse OCR.space response")?;

        response_to_text(body)
    }
}

impl TextRecognizer for OcrSpaceClient {
    fn recognize(&self, image: &[u8]) -> Result<String> {
        self.rt.block_on(self.recognize_async(image))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    parsed_results: Option<Vec<OcrParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    error_message: Option<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrParsedResult {
    parsed_text: String,
}

/// OCR.space sends either a bare string or a list of strings here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn joined(&self) -> String {
        match self {
            ErrorMessage::One(s) => s.clone(),
            ErrorMessage::Many(parts) => parts.join("; "),
        }
    }
}

fn response_to_text(body: OcrSpaceResponse) -> Result<String> {
    if body.is_errored_on_processing {
        let detail = body
            .error_message
            .as_ref()
            .map_or_else(|| "unknown error".to_string(), ErrorMessage::joined);
        bail!("OCR.space could not process the image: {detail}");
    }

    let pages = body.parsed_results.unwrap_or_default();
    if pages.is_empty() {
        bail!("OCR.space returned no text for the image");
    }

    Ok(pages
        .into_iter()
        .map(|page| page.parsed_text)
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_to_text_joins_pages() {
        let body: OcrSpaceResponse = serde_json::from_str(
            r#"{
                "ParsedResults": [
                    {"ParsedText": "Tomato 2.5 kg\nOnion 1 kg"},
                    {"ParsedText": "Olive Oil 750 ml"}
                ],
                "IsErroredOnProcessing": false,
                "ErrorMessage": null
            }"#,
        )
        .unwrap();

        let text = response_to_text(body).unwrap();
        assert_eq!(text, "Tomato 2.5 kg\nOnion 1 kg\nOlive Oil 750 ml");
    }

    #[test]
    fn test_response_to_text_error_string() {
        let body: OcrSpaceResponse = serde_json::from_str(
            r#"{
                "ParsedResults": null,
                "IsErroredOnProcessing": true,
                "ErrorMessage": "Invalid API key"
            }"#,
        )
        .unwrap();

        let err = response_to_text(body).unwrap_err();
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_response_to_text_error_list() {
        let body: OcrSpaceResponse = serde_json::from_str(
            r#"{
                "IsErroredOnProcessing": true,
                "ErrorMessage": ["Timed out", "Engine busy"]
            }"#,
        )
        .unwrap();

        let err = response_to_text(body).unwrap_err();
        assert!(err.to_string().contains("Timed out; Engine busy"));
    }

    #[test]
    fn test_response_to_text_no_pages() {
        let body: OcrSpaceResponse = serde_json::from_str(
            r#"{"ParsedResults": [], "IsErroredOnProcessing": false}"#,
        )
        .unwrap();

        assert!(response_to_text(body).is_err());
    }
}
