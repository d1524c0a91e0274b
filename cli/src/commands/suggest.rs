use super::helpers::fmt_qty;
use anyhow::Result;
use larder_core::service::LarderService;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn cmd_suggest_set(
    service: &LarderService,
    recipe: &str,
    day: &str,
    quantity: f64,
    json: bool,
) -> Result<()> {
    let suggestion = service.set_suggestion(recipe, day, quantity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestion)?);
    } else {
        let kind = suggestion.day_kind.as_str();
        println!(
            "Suggesting {} x {recipe} on {kind}s",
            fmt_qty(suggestion.suggested_quantity)
        );
    }
    Ok(())
}

pub(crate) fn cmd_suggest_list(service: &LarderService, json: bool) -> Result<()> {
    let suggestions = service.list_suggestions()?;

    if suggestions.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No prep suggestions set.");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct SuggestionRow {
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Suggested")]
        suggested: String,
    }

    let rows: Vec<SuggestionRow> = suggestions
        .iter()
        .map(|s| SuggestionRow {
            recipe: s.recipe_name.clone().unwrap_or_else(|| s.recipe_id.clone()),
            day: s.day_kind.as_str().to_string(),
            suggested: fmt_qty(s.suggested_quantity),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
