use super::helpers::{fmt_qty, parse_date, truncate};
use anyhow::Result;
use larder_core::models::PrepTask;
use larder_core::service::LarderService;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

pub(crate) fn cmd_prep_sheet(
    service: &LarderService,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let sheet = service.prep_sheet(Some(date))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sheet)?);
        return Ok(());
    }

    if sheet.tasks.is_empty() {
        eprintln!(
            "No prep suggestions for {} ({}).",
            sheet.date,
            sheet.day_kind.as_str()
        );
        process::exit(2);
    }

    println!("Prep sheet for {} ({})", sheet.date, sheet.day_kind.as_str());
    if let Some(note) = &sheet.note {
        let from = &note.note_date;
        let comment = &note.comment;
        println!("Note ({from}): {comment}");
    }
    println!();

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "Recipe")]
        recipe: String,
        #[tabled(rename = "Suggested")]
        suggested: String,
        #[tabled(rename = "Done")]
        done: String,
        #[tabled(rename = "To prep")]
        planned: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Short of")]
        short_of: String,
    }

    let rows: Vec<TaskRow> = sheet
        .tasks
        .iter()
        .map(|task| TaskRow {
            recipe: truncate(&task.recipe.name, 30),
            suggested: fmt_qty(task.suggested_quantity),
            done: fmt_qty(task.completed_quantity),
            planned: fmt_qty(task.planned_quantity),
            status: task_status(task).to_string(),
            short_of: shortage_summary(task),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

fn task_status(task: &PrepTask) -> &'static str {
    if task.is_completed {
        "done"
    } else if task.shortages.is_empty() {
        "ready"
    } else {
        "short"
    }
}

fn shortage_summary(task: &PrepTask) -> String {
    if task.shortages.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = task
        .shortages
        .iter()
        .map(|s| {
            format!(
                "{} (need {}, have {} {})",
                s.ingredient_name,
                fmt_qty(s.required),
                fmt_qty(s.available),
                s.unit
            )
        })
        .collect();
    truncate(&parts.join("; "), 60)
}

pub(crate) fn cmd_prep_complete(
    service: &LarderService,
    recipe: &str,
    quantity: f64,
    json: bool,
) -> Result<()> {
    let completion = service.complete_prep(recipe, quantity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&completion)?);
        return Ok(());
    }

    println!("Completed {} x {recipe}", fmt_qty(quantity));
    for debit in &completion.debits {
        println!(
            "  {}: -{} {} ({} left)",
            debit.ingredient_name,
            fmt_qty(debit.amount),
            debit.unit,
            fmt_qty(debit.remaining)
        );
    }
    for name in &completion.skipped {
        println!("  {name}: not in stock, skipped");
    }
    for failure in &completion.failures {
        eprintln!("Warning: {failure}");
    }
    Ok(())
}

pub(crate) fn cmd_prep_check(
    service: &LarderService,
    recipe: &str,
    quantity: f64,
    json: bool,
) -> Result<()> {
    let info = service.necessary_prep(recipe, quantity)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if info.necessary_ingredients.is_empty() {
        println!("{recipe} has no ingredient lines; nothing to check.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct NeedRow {
        #[tabled(rename = "Ingredient")]
        ingredient: String,
        #[tabled(rename = "Needed")]
        needed: String,
        #[tabled(rename = "In stock")]
        in_stock: String,
        #[tabled(rename = "Unit")]
        unit: String,
    }

    let rows: Vec<NeedRow> = info
        .necessary_ingredients
        .iter()
        .map(|need| NeedRow {
            ingredient: need.name.clone(),
            needed: fmt_qty(need.necessary_amount),
            in_stock: fmt_qty(need.current_stock),
            unit: need.unit.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    if info.can_prep_with_current_stock {
        println!("\nStock covers {} x {recipe}.", fmt_qty(quantity));
    } else {
        println!("\nStock does NOT cover {} x {recipe}.", fmt_qty(quantity));
    }
    Ok(())
}
