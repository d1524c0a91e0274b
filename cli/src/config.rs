use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use larder_core::models::{Settings, WriteMode};
use std::path::PathBuf;

pub struct Config {
    pub db_path: PathBuf,
    pub settings: Settings,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "larder").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = match std::env::var("LARDER_DB") {
            Ok(path) => PathBuf::from(path),
            Err(_) => data_dir.join("larder.db"),
        };

        let mut settings = Settings::default();
        if let Ok(mode) = std::env::var("LARDER_WRITE_MODE") {
            settings.write_mode = parse_write_mode(&mode)?;
        }

        Ok(Config { db_path, settings })
    }
}

fn parse_write_mode(mode: &str) -> Result<WriteMode> {
    match mode.to_lowercase().as_str() {
        "atomic" => Ok(WriteMode::Atomic),
        "read-modify-write" | "rmw" => Ok(WriteMode::ReadModifyWrite),
        _ => bail!("Invalid LARDER_WRITE_MODE '{mode}'. Use: atomic, read-modify-write"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_mode() {
        assert!(matches!(
            parse_write_mode("atomic").unwrap(),
            WriteMode::Atomic
        ));
        assert!(matches!(
            parse_write_mode("RMW").unwrap(),
            WriteMode::ReadModifyWrite
        ));
        assert!(matches!(
            parse_write_mode("read-modify-write").unwrap(),
            WriteMode::ReadModifyWrite
        ));
        assert!(parse_write_mode("upsert").is_err());
    }
}
