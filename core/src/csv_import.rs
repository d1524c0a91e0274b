//! Bulk stock import from CSV, for seeding a fresh database or booking in a
//! delivery. Parsing is strict about structure; semantic problems are
//! recorded per row so one bad line never sinks the batch.

use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    validate_name, validate_non_negative, validate_unit, NewIngredientStock, Settings, WriteMode,
    DEFAULT_ALERT_LEVEL,
};

/// One data row from a stock CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct StockRow {
    pub name: String,
    pub quantity: f64,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub alert_level: Option<f64>,
}

/// Summary of an import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StockImportSummary {
    pub rows_parsed: usize,
    pub rows_created: usize,
    pub rows_updated: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

/// Parse a stock CSV from any reader.
///
/// Expected header: `name,quantity[,unit][,category][,alert_level]`.
/// Header matching is case-insensitive and column order does not matter.
/// Fully blank rows are skipped; a malformed number fails the parse with
/// the row it came from.
pub fn parse_stock_csv<R: Read>(reader: R) -> Result<Vec<StockRow>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("reading CSV header")?.clone();
    let col = |name: &str| -> Option<usize> {
        headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    };

    let name_idx = col("name").context("CSV missing 'name' column")?;
    let quantity_idx = col("quantity").context("CSV missing 'quantity' column")?;
    let unit_idx = col("unit");
    let category_idx = col("category");
    let alert_idx = col("alert_level");

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // Header is line 1, first data row is line 2.
        let line = i + 2;
        let record = result.with_context(|| format!("reading CSV row {line}"))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let get = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        let get_opt = |idx: Option<usize>| {
            idx.map(|idx| get(idx)).filter(|value| !value.is_empty())
        };

        let quantity: f64 = get(quantity_idx)
            .parse()
            .with_context(|| format!("CSV row {line}: invalid quantity"))?;
        let alert_level = match get_opt(alert_idx) {
            Some(raw) => Some(
                raw.parse()
                    .with_context(|| format!("CSV row {line}: invalid alert_level"))?,
            ),
            None => None,
        };

        rows.push(StockRow {
            name: get(name_idx),
            quantity,
            unit: get_opt(unit_idx),
            category: get_opt(category_idx),
            alert_level,
        });
    }

    Ok(rows)
}

/// Import parsed stock rows.
///
/// Rows naming an existing ingredient add their quantity to it, everything
/// else creates a row. A row that fails validation is skipped and recorded
/// in the summary. When `dry_run` is true, nothing is written.
pub fn import_stock_rows(
    db: &Database,
    settings: &Settings,
    rows: &[StockRow],
    dry_run: bool,
) -> StockImportSummary {
    let mut summary = StockImportSummary {
        rows_parsed: rows.len(),
        ..StockImportSummary::default()
    };
    // Names created earlier in this pass, so dry runs count repeats as
    // updates the way a real run would.
    let mut created_names: HashSet<String> = HashSet::new();

    for (i, row) in rows.iter().enumerate() {
        match import_stock_row(db, settings, row, dry_run, &mut created_names) {
            Ok(Imported::Created) => summary.rows_created += 1,
            Ok(Imported::Updated) => summary.rows_updated += 1,
            Err(e) => {
                summary.rows_skipped += 1;
                summary.errors.push(format!("row {}: {e:#}", i + 1));
            }
        }
    }

    summary
}

enum Imported {
    Created,
    Updated,
}

fn import_stock_row(
    db: &Database,
    settings: &Settings,
    row: &StockRow,
    dry_run: bool,
    created_names: &mut HashSet<String>,
) -> Result<Imported> {
    let name = validate_name(&row.name)?;
    validate_non_negative(row.quantity, "Quantity")?;
    let unit = match &row.unit {
        Some(unit) => validate_unit(unit)?,
        None => "kg".to_string(),
    };
    let alert_level = match row.alert_level {
        Some(level) => {
            validate_non_negative(level, "Alert level")?;
            level
        }
        None => DEFAULT_ALERT_LEVEL,
    };

    let key = name.to_lowercase();
    let existing = db.find_ingredient_by_name(&name)?;

    if dry_run {
        if existing.is_some() || created_names.contains(&key) {
            return Ok(Imported::Updated);
        }
        created_names.insert(key);
        return Ok(Imported::Created);
    }

    if let Some(stock) = existing {
        match settings.write_mode {
            WriteMode::Atomic => {
                db.adjust_ingredient_quantity(&stock.id, row.quantity)?;
            }
            WriteMode::ReadModifyWrite => {
                db.set_ingredient_quantity(&stock.id, stock.quantity + row.quantity)?;
            }
        }
        Ok(Imported::Updated)
    } else {
        db.insert_ingredient(&NewIngredientStock {
            name,
            quantity: row.quantity,
            unit,
            category: row.category.clone(),
            alert_level,
        })?;
        created_names.insert(key);
        Ok(Imported::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
name,quantity,unit,category,alert_level
Tomato,5.0,kg,Vegetables,1.5
Onion,2,kg,Vegetables,
Olive Oil,750,ml,Pantry,100
,,,
Rice,10,,,";

    #[test]
    fn test_parses_sample_csv() {
        let rows = parse_stock_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].name, "Tomato");
        assert_eq!(rows[0].quantity, 5.0);
        assert_eq!(rows[0].unit.as_deref(), Some("kg"));
        assert_eq!(rows[0].category.as_deref(), Some("Vegetables"));
        assert_eq!(rows[0].alert_level, Some(1.5));

        assert_eq!(rows[1].alert_level, None);

        assert_eq!(rows[3].name, "Rice");
        assert_eq!(rows[3].unit, None);
        assert_eq!(rows[3].category, None);
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let csv = "Name,Quantity\nTomato,5";
        let rows = parse_stock_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].name, "Tomato");
        assert_eq!(rows[0].quantity, 5.0);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let err = parse_stock_csv("name,unit\nTomato,kg".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn test_malformed_quantity_names_the_row() {
        let err = parse_stock_csv("name,quantity\nTomato,lots".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
    }

    #[test]
    fn test_import_creates_and_merges_rows() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let rows = parse_stock_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let summary = import_stock_rows(&db, &settings, &rows, false);
        assert_eq!(summary.rows_parsed, 4);
        assert_eq!(summary.rows_created, 4);
        assert_eq!(summary.rows_updated, 0);
        assert!(summary.errors.is_empty());

        // Booking in the same delivery again adds to the existing rows.
        let again = import_stock_rows(&db, &settings, &rows, false);
        assert_eq!(again.rows_created, 0);
        assert_eq!(again.rows_updated, 4);

        let tomato = db.find_ingredient_by_name("tomato").unwrap().unwrap();
        assert_eq!(tomato.quantity, 10.0);
        assert_eq!(tomato.alert_level, 1.5);

        let rice = db.find_ingredient_by_name("Rice").unwrap().unwrap();
        assert_eq!(rice.unit, "kg");
        assert_eq!(rice.alert_level, DEFAULT_ALERT_LEVEL);
    }

    #[test]
    fn test_import_skips_invalid_rows_and_keeps_going() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let rows = vec![
            StockRow {
                name: "Tomato".to_string(),
                quantity: 5.0,
                unit: Some("crates".to_string()),
                category: None,
                alert_level: None,
            },
            StockRow {
                name: "  ".to_string(),
                quantity: 1.0,
                unit: None,
                category: None,
                alert_level: None,
            },
            StockRow {
                name: "Onion".to_string(),
                quantity: -2.0,
                unit: None,
                category: None,
                alert_level: None,
            },
            StockRow {
                name: "Rice".to_string(),
                quantity: 10.0,
                unit: None,
                category: None,
                alert_level: None,
            },
        ];

        let summary = import_stock_rows(&db, &settings, &rows, false);
        assert_eq!(summary.rows_created, 1);
        assert_eq!(summary.rows_skipped, 3);
        assert_eq!(summary.errors.len(), 3);
        assert!(summary.errors[0].starts_with("row 1:"));
        assert!(summary.errors[0].contains("Invalid unit"));

        assert!(db.find_ingredient_by_name("Tomato").unwrap().is_none());
        assert!(db.find_ingredient_by_name("Rice").unwrap().is_some());
    }

    #[test]
    fn test_dry_run_counts_without_writing() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let rows = vec![
            StockRow {
                name: "Tomato".to_string(),
                quantity: 5.0,
                unit: None,
                category: None,
                alert_level: None,
            },
            StockRow {
                name: "tomato".to_string(),
                quantity: 2.0,
                unit: None,
                category: None,
                alert_level: None,
            },
        ];

        let summary = import_stock_rows(&db, &settings, &rows, true);
        assert_eq!(summary.rows_created, 1);
        assert_eq!(summary.rows_updated, 1);
        assert!(db.list_ingredients(None).unwrap().is_empty());
    }

    #[test]
    fn test_read_modify_write_mode_merges_the_same_way() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings {
            write_mode: WriteMode::ReadModifyWrite,
            ..Settings::default()
        };
        let rows = parse_stock_csv("name,quantity\nTomato,5\nTomato,3".as_bytes()).unwrap();

        let summary = import_stock_rows(&db, &settings, &rows, false);
        assert_eq!(summary.rows_created, 1);
        assert_eq!(summary.rows_updated, 1);

        let tomato = db.find_ingredient_by_name("Tomato").unwrap().unwrap();
        assert_eq!(tomato.quantity, 8.0);
    }
}
