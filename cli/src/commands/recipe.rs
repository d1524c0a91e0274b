use super::helpers::{fmt_qty, truncate};
use anyhow::{Context, Result, bail};
use larder_core::models::{NewRecipe, NewRecipeIngredient};
use larder_core::service::LarderService;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

/// Parses an ingredient line like `"Tomato:0.5"` or `"Tomato:0.5:kg"`.
/// The unit defaults to kg.
fn parse_ingredient_spec(spec: &str) -> Result<NewRecipeIngredient> {
    let mut parts = spec.splitn(3, ':');
    let name = parts.next().unwrap_or("").trim().to_string();
    let quantity_str = parts
        .next()
        .with_context(|| format!("Invalid ingredient '{spec}'. Use name:quantity[:unit]"))?;
    let quantity_per_batch: f64 = quantity_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid quantity in ingredient '{spec}'"))?;
    if name.is_empty() {
        bail!("Invalid ingredient '{spec}'. Use name:quantity[:unit]");
    }
    let unit = parts.next().map_or("kg", str::trim).to_string();
    Ok(NewRecipeIngredient {
        name,
        quantity_per_batch,
        unit,
    })
}

pub(crate) fn cmd_recipe_add(
    service: &LarderService,
    name: String,
    ingredient_specs: Vec<String>,
    category: Option<String>,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ingredients = Vec::with_capacity(ingredient_specs.len());
    for spec in &ingredient_specs {
        ingredients.push(parse_ingredient_spec(spec)?);
    }

    let recipe = service.add_recipe(&NewRecipe {
        name,
        category,
        description,
        ingredients,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let name = &recipe.name;
        let count = recipe.ingredients.len();
        println!("Created recipe: {name} ({count} ingredient lines)");
        if recipe.ingredients.is_empty() {
            println!("Completing a prep of it will not debit any stock until lines are added.");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(service: &LarderService, json: bool) -> Result<()> {
    let recipes = service.list_recipes()?;
    if recipes.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No recipes found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Lines")]
        lines: usize,
        #[tabled(rename = "Prepared")]
        prepared: String,
    }

    let mut rows = Vec::with_capacity(recipes.len());
    for recipe in &recipes {
        let prepared = service.finished_goods(&recipe.name)?;
        rows.push(RecipeRow {
            name: truncate(&recipe.name, 30),
            category: recipe.category.clone().unwrap_or_else(|| "-".to_string()),
            lines: recipe.ingredients.len(),
            prepared: fmt_qty(prepared),
        });
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_recipe_show(service: &LarderService, name: &str, json: bool) -> Result<()> {
    let recipe = service.get_recipe(name)?;
    let prepared = service.finished_goods(&recipe.name)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "recipe": recipe,
                "prepared": prepared,
            }))?
        );
        return Ok(());
    }

    let rname = &recipe.name;
    println!("=== {rname} ===");
    if let Some(category) = &recipe.category {
        println!("  Category: {category}");
    }
    if let Some(description) = &recipe.description {
        println!("  {description}");
    }
    println!("  Prepared batches on hand: {}", fmt_qty(prepared));

    println!("\n  PER BATCH:");
    if recipe.ingredients.is_empty() {
        println!("    (no ingredient lines)");
    }
    for line in &recipe.ingredients {
        let lname = &line.name;
        let qty = fmt_qty(line.quantity_per_batch);
        let unit = &line.unit;
        println!("    {lname}: {qty} {unit}");
    }

    Ok(())
}

pub(crate) fn cmd_recipe_set_prepared(
    service: &LarderService,
    name: &str,
    quantity: f64,
    json: bool,
) -> Result<()> {
    service.set_finished_goods(name, quantity)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "recipe": name, "prepared": quantity })
        );
    } else {
        println!("Set prepared batches for {name}: {}", fmt_qty(quantity));
    }
    Ok(())
}
