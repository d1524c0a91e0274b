use super::helpers::{confirm, fmt_qty, prompt_optional_choice};
use crate::ocrspace::OcrSpaceClient;
use anyhow::{Context, Result, bail};
use larder_core::ocr::{ItemStatus, OcrItem, ScanSession};
use larder_core::service::LarderService;
use std::path::PathBuf;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn cmd_scan(
    service: &LarderService,
    image: Option<PathBuf>,
    text: Option<PathBuf>,
    yes: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut session = match (image, text) {
        (Some(_), Some(_)) => bail!("Provide an image or --text, not both"),
        (None, None) => bail!("Provide an image to scan, or --text with recognized text"),
        (Some(path), None) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let recognizer = OcrSpaceClient::from_env();
            service.scan_image(&recognizer, &bytes)?
        }
        (None, Some(path)) => {
            let recognized = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            service.scan_text(recognized)?
        }
    };

    if session.items.is_empty() {
        if json {
            println!("{}", serde_json::to_string_pretty(&session)?);
        } else {
            eprintln!("No stock lines recognized.");
        }
        process::exit(2);
    }

    session.begin_review();

    if !json {
        print_review_table(&session.items);
    }

    // Let the user file new items under a category before anything is written.
    if !yes && !json {
        assign_categories(service, &mut session)?;
    }

    if dry_run {
        if json {
            println!("{}", serde_json::to_string_pretty(&session)?);
        } else {
            println!("\nDry run: nothing written.");
        }
        return Ok(());
    }

    if !yes && !json {
        let count = session.items.len();
        if !confirm(&format!("\nCommit {count} item(s) to stock?"))? {
            println!("Nothing committed.");
            return Ok(());
        }
    }

    let summary = service.commit_scan(&mut session);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "session": session,
                "summary": summary,
            }))?
        );
        return Ok(());
    }

    println!(
        "\nCommitted {} item(s): {} row(s) updated, {} created.",
        summary.items_committed, summary.rows_updated, summary.rows_created
    );
    for failure in &summary.failures {
        eprintln!("Warning: {failure}");
    }
    Ok(())
}

fn print_review_table(items: &[OcrItem]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "Scanned")]
        scanned: String,
        #[tabled(rename = "Resolved")]
        resolved: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Category")]
        category: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .enumerate()
        .map(|(i, item)| ItemRow {
            index: i + 1,
            scanned: item.name.clone(),
            resolved: item.corrected_name.clone(),
            quantity: fmt_qty(item.quantity),
            unit: item.unit.clone(),
            status: match item.status {
                ItemStatus::Tracked => "tracked",
                ItemStatus::New => "new",
                ItemStatus::Unknown => "unknown",
            }
            .to_string(),
            category: item.category.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Prompts for a category on each item that will create a stock row and has
/// none yet. Skipped entirely when no categories exist.
fn assign_categories(service: &LarderService, session: &mut ScanSession) -> Result<()> {
    let categories = service.list_categories()?;
    if categories.is_empty() {
        return Ok(());
    }

    let needs_category: Vec<usize> = session
        .items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.status != ItemStatus::Tracked && item.category.is_none())
        .map(|(i, _)| i)
        .collect();
    if needs_category.is_empty() {
        return Ok(());
    }

    eprintln!("\nCategories:");
    for (i, category) in categories.iter().enumerate() {
        eprintln!("  {}. {category}", i + 1);
    }

    for index in needs_category {
        let name = session.items[index].corrected_name.clone();
        let choice = prompt_optional_choice(&format!("Category for {name}"), categories.len())?;
        if let Some(picked) = choice {
            session.set_category(index, Some(categories[picked].clone()));
        }
    }
    Ok(())
}
