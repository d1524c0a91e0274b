use super::helpers::fmt_qty;
use anyhow::{Context, Result, bail};
use larder_core::models::{NewIngredientStock, UpdateIngredientStock};
use larder_core::service::LarderService;
use std::path::Path;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn cmd_stock_add(
    service: &LarderService,
    name: String,
    quantity: f64,
    unit: String,
    category: Option<String>,
    alert: f64,
    json: bool,
) -> Result<()> {
    let stock = service.add_stock(&NewIngredientStock {
        name,
        quantity,
        unit,
        category,
        alert_level: alert,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stock)?);
    } else {
        println!(
            "Added {}: {} {} (alert at {})",
            stock.name,
            fmt_qty(stock.quantity),
            stock.unit,
            fmt_qty(stock.alert_level)
        );
    }
    Ok(())
}

pub(crate) fn cmd_stock_list(
    service: &LarderService,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let stock = service.list_stock(category.as_deref())?;

    if stock.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No ingredients in stock.");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stock)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Unit")]
        unit: String,
        #[tabled(rename = "Alert")]
        alert: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<Row> = stock
        .iter()
        .map(|row| Row {
            name: row.name.clone(),
            quantity: fmt_qty(row.quantity),
            unit: row.unit.clone(),
            alert: fmt_qty(row.alert_level),
            category: row.category.clone().unwrap_or_else(|| "-".to_string()),
            status: if row.is_low() { "LOW" } else { "" }.to_string(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let low = stock.iter().filter(|row| row.is_low()).count();
    if low > 0 {
        println!("\n{low} ingredient(s) at or below their alert level.");
    }
    Ok(())
}

pub(crate) fn cmd_stock_categories(service: &LarderService, json: bool) -> Result<()> {
    let categories = service.list_categories()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    if categories.is_empty() {
        println!("No categories yet.");
        return Ok(());
    }
    for category in categories {
        println!("{category}");
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_stock_set(
    service: &LarderService,
    name: String,
    quantity: Option<f64>,
    unit: Option<String>,
    alert: Option<f64>,
    category: Option<String>,
    clear_category: bool,
    json: bool,
) -> Result<()> {
    if quantity.is_none() && unit.is_none() && alert.is_none() && category.is_none() && !clear_category
    {
        bail!(
            "Nothing to update. Provide at least one of --quantity, --unit, --alert, --category, --clear-category"
        );
    }
    if category.is_some() && clear_category {
        bail!("--category and --clear-category are mutually exclusive");
    }

    let category_update = if clear_category {
        Some(None)
    } else {
        category.map(Some)
    };
    let stock = service.set_stock(
        &name,
        &UpdateIngredientStock {
            quantity,
            unit,
            alert_level: alert,
            category: category_update,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stock)?);
    } else {
        println!(
            "Updated {}: {} {} (alert at {})",
            stock.name,
            fmt_qty(stock.quantity),
            stock.unit,
            fmt_qty(stock.alert_level)
        );
    }
    Ok(())
}

pub(crate) fn cmd_stock_import(
    service: &LarderService,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let csv_data = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let summary = service.import_stock_csv(&csv_data, dry_run)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.rows_parsed == 0 {
        println!("No stock rows found in {}.", file.display());
        return Ok(());
    }

    if dry_run {
        println!(
            "Dry run: {} rows parsed, would create {} and update {}.",
            summary.rows_parsed, summary.rows_created, summary.rows_updated
        );
    } else {
        println!(
            "Imported {} rows: {} created, {} updated, {} skipped.",
            summary.rows_parsed, summary.rows_created, summary.rows_updated, summary.rows_skipped
        );
    }
    for error in &summary.errors {
        eprintln!("Warning: {error}");
    }
    Ok(())
}
