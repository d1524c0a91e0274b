use super::helpers::{fmt_qty, json_error, parse_date, truncate};
use anyhow::Result;
use larder_core::service::LarderService;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn cmd_log_list(
    service: &LarderService,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let groups = service.list_logs(search.as_deref())?;

    if groups.is_empty() {
        if json {
            println!("[]");
        } else if let Some(term) = &search {
            eprintln!("No log entries match '{term}'.");
        } else {
            eprintln!("No log entries yet.");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct LogRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Entries")]
        entries: usize,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let rows: Vec<LogRow> = groups
        .iter()
        .map(|group| LogRow {
            id: group.id.clone(),
            date: group.date.clone(),
            recipe: truncate(&group.recipe_name, 30),
            quantity: fmt_qty(group.quantity),
            entries: group.member_ids.len(),
            notes: truncate(group.notes.as_deref().unwrap_or(""), 30).replace('\n', "; "),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_log_add(
    service: &LarderService,
    recipe: &str,
    quantity: f64,
    date: Option<String>,
    notes: Option<String>,
    servings: Option<f64>,
    json: bool,
) -> Result<()> {
    let date = match date {
        Some(s) => Some(parse_date(Some(s))?),
        None => None,
    };
    let entry = service.add_log(recipe, quantity, date, notes, servings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let name = entry.recipe_name.as_deref().unwrap_or(recipe);
        println!(
            "Logged: {} x {name} on {}",
            fmt_qty(entry.quantity),
            entry.date
        );
    }
    Ok(())
}

pub(crate) fn cmd_log_set_quantity(
    service: &LarderService,
    id: &str,
    quantity: f64,
    json: bool,
) -> Result<()> {
    let change = service.set_log_quantity(id, quantity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&change)?);
        return Ok(());
    }

    let name = change.entry.recipe_name.as_deref().unwrap_or("recipe");
    println!("Updated: {} x {name}", fmt_qty(change.entry.quantity));
    let sign = if change.delta >= 0.0 { "+" } else { "" };
    println!(
        "Prepared stock adjusted by {sign}{}: now {}",
        fmt_qty(change.delta),
        fmt_qty(change.finished_goods)
    );
    if let Some(advisory) = &change.advisory {
        eprintln!(
            "WARNING: {} is low on prepared stock ({} left)",
            advisory.recipe_name,
            fmt_qty(advisory.remaining)
        );
    }
    Ok(())
}

pub(crate) fn cmd_log_set_notes(
    service: &LarderService,
    id: &str,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let cleared = notes.is_none();
    let entry = service.set_log_notes(id, notes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else if cleared {
        println!("Cleared notes on log entry {id}.");
    } else {
        println!("Updated notes on log entry {id}.");
    }
    Ok(())
}

pub(crate) fn cmd_log_set_servings(
    service: &LarderService,
    id: &str,
    servings: Option<f64>,
    json: bool,
) -> Result<()> {
    let cleared = servings.is_none();
    let entry = service.set_log_servings(id, servings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else if cleared {
        println!("Cleared servings override on log entry {id}.");
    } else if let Some(servings) = entry.manual_override_servings {
        println!("Set servings override to {} on log entry {id}.", fmt_qty(servings));
    }
    Ok(())
}

pub(crate) fn cmd_log_delete(service: &LarderService, id: &str, json: bool) -> Result<()> {
    if service.delete_log(id)? {
        if json {
            println!("{}", serde_json::json!({ "deleted": id }));
        } else {
            println!("Deleted log entry {id}. Stock is unchanged.");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error("Log entry not found"));
        } else {
            eprintln!("Log entry not found: {id}");
        }
        process::exit(2);
    }
}
