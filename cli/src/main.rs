mod commands;
mod config;
mod ocrspace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_log_add, cmd_log_delete, cmd_log_list, cmd_log_set_notes, cmd_log_set_quantity,
    cmd_log_set_servings, cmd_note, cmd_prep_check, cmd_prep_complete, cmd_prep_sheet,
    cmd_recipe_add, cmd_recipe_list, cmd_recipe_set_prepared, cmd_recipe_show, cmd_scan,
    cmd_stock_add, cmd_stock_categories, cmd_stock_import, cmd_stock_list, cmd_stock_set,
    cmd_suggest_list, cmd_suggest_set,
};
use crate::config::Config;
use larder_core::service::LarderService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "A kitchen inventory and prep forecast CLI",
    long_about = "\n\n  ██╗      █████╗ ██████╗ ██████╗ ███████╗██████╗
  ██║     ██╔══██╗██╔══██╗██╔══██╗██╔════╝██╔══██╗
  ██║     ███████║██████╔╝██║  ██║█████╗  ██████╔╝
  ██║     ██╔══██║██╔══██╗██║  ██║██╔══╝  ██╔══██╗
  ███████╗██║  ██║██║  ██║██████╔╝███████╗██║  ██║
  ╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═╝
        know what's in your kitchen.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage raw ingredient stock
    Stock {
        #[command(subcommand)]
        command: StockCommands,
    },
    /// Manage recipes and their prepared batches
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage weekday/weekend prep suggestions
    Suggest {
        #[command(subcommand)]
        command: SuggestCommands,
    },
    /// Plan and record prep runs
    Prep {
        #[command(subcommand)]
        command: PrepCommands,
    },
    /// Manage the meal log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Scan an invoice or delivery note into stock
    Scan {
        /// Path to the image to recognize
        image: Option<std::path::PathBuf>,
        /// Read already-recognized text from a file instead of calling OCR
        #[arg(long, value_name = "PATH")]
        text: Option<std::path::PathBuf>,
        /// Commit without prompting for categories or confirmation
        #[arg(short, long)]
        yes: bool,
        /// Parse and review without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or save the kitchen note for a day
    Note {
        /// Note text to save (shows the current note when omitted)
        text: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StockCommands {
    /// Add an ingredient to stock
    Add {
        /// Ingredient name
        name: String,
        /// Quantity on hand
        quantity: f64,
        /// Unit: kg, g, ml
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Category (e.g. Vegetables, Pantry)
        #[arg(long)]
        category: Option<String>,
        /// Alert when stock falls to this level
        #[arg(long, default_value = "1")]
        alert: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stock, flagging rows at or below their alert level
    List {
        /// Only show one category
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an ingredient's quantity, unit, alert level, or category
    Set {
        /// Ingredient name
        name: String,
        /// New quantity
        #[arg(long)]
        quantity: Option<f64>,
        /// New unit: kg, g, ml
        #[arg(long)]
        unit: Option<String>,
        /// New alert level
        #[arg(long)]
        alert: Option<f64>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List categories in use
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import stock rows from a CSV file
    Import {
        /// Path to the CSV file (header: name,quantity[,unit][,category][,alert_level])
        file: std::path::PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Add a recipe with its per-batch ingredient lines
    Add {
        /// Recipe name
        name: String,
        /// Ingredient line as "name:quantity[:unit]" (repeatable)
        #[arg(short, long = "ingredient", value_name = "NAME:QTY[:UNIT]")]
        ingredients: Vec<String>,
        /// Category (e.g. Bread, Sauces)
        #[arg(long)]
        category: Option<String>,
        /// Free-form description
        #[arg(long)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recipes with prepared-batch counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe's lines and prepared batches
    Show {
        /// Recipe name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the prepared-batch count (stocktake correction)
    SetPrepared {
        /// Recipe name
        name: String,
        /// Batches on hand
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SuggestCommands {
    /// Set how many batches to prep on a kind of day
    Set {
        /// Recipe name
        recipe: String,
        /// Day kind: weekday or weekend
        day: String,
        /// Suggested batches
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all suggestions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PrepCommands {
    /// Show the prep sheet for a day (default: today)
    Sheet {
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a finished prep run, debiting raw stock
    Complete {
        /// Recipe name
        recipe: String,
        /// Batches completed
        #[arg(default_value = "1")]
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether current stock covers a prep run
    Check {
        /// Recipe name
        recipe: String,
        /// Batches to check for
        #[arg(default_value = "1")]
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// List log entries grouped per recipe
    List {
        /// Filter by recipe name
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Book a log entry directly (stock is untouched)
    Add {
        /// Recipe name
        recipe: String,
        /// Quantity consumed
        quantity: f64,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Servings override
        #[arg(long)]
        servings: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry's quantity, adjusting prepared stock by the difference
    SetQuantity {
        /// Entry ID
        id: String,
        /// New quantity
        quantity: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry's notes (omit to clear)
    SetNotes {
        /// Entry ID
        id: String,
        /// New notes
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an entry's servings override (omit to clear)
    SetServings {
        /// Entry ID
        id: String,
        /// New servings override
        servings: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an entry (stock is untouched)
    Delete {
        /// Entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service =
        LarderService::with_settings(&config.db_path.to_string_lossy(), config.settings)?;

    match cli.command {
        Commands::Stock { command } => match command {
            StockCommands::Add {
                name,
                quantity,
                unit,
                category,
                alert,
                json,
            } => cmd_stock_add(&service, name, quantity, unit, category, alert, json),
            StockCommands::List { category, json } => cmd_stock_list(&service, category, json),
            StockCommands::Set {
                name,
                quantity,
                unit,
                alert,
                category,
                clear_category,
                json,
            } => cmd_stock_set(
                &service,
                name,
                quantity,
                unit,
                alert,
                category,
                clear_category,
                json,
            ),
            StockCommands::Categories { json } => cmd_stock_categories(&service, json),
            StockCommands::Import {
                file,
                dry_run,
                json,
            } => cmd_stock_import(&service, &file, dry_run, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Add {
                name,
                ingredients,
                category,
                description,
                json,
            } => cmd_recipe_add(&service, name, ingredients, category, description, json),
            RecipeCommands::List { json } => cmd_recipe_list(&service, json),
            RecipeCommands::Show { name, json } => cmd_recipe_show(&service, &name, json),
            RecipeCommands::SetPrepared {
                name,
                quantity,
                json,
            } => cmd_recipe_set_prepared(&service, &name, quantity, json),
        },
        Commands::Suggest { command } => match command {
            SuggestCommands::Set {
                recipe,
                day,
                quantity,
                json,
            } => cmd_suggest_set(&service, &recipe, &day, quantity, json),
            SuggestCommands::List { json } => cmd_suggest_list(&service, json),
        },
        Commands::Prep { command } => match command {
            PrepCommands::Sheet { date, json } => cmd_prep_sheet(&service, date, json),
            PrepCommands::Complete {
                recipe,
                quantity,
                json,
            } => cmd_prep_complete(&service, &recipe, quantity, json),
            PrepCommands::Check {
                recipe,
                quantity,
                json,
            } => cmd_prep_check(&service, &recipe, quantity, json),
        },
        Commands::Log { command } => match command {
            LogCommands::List { search, json } => cmd_log_list(&service, search, json),
            LogCommands::Add {
                recipe,
                quantity,
                date,
                notes,
                servings,
                json,
            } => cmd_log_add(&service, &recipe, quantity, date, notes, servings, json),
            LogCommands::SetQuantity { id, quantity, json } => {
                cmd_log_set_quantity(&service, &id, quantity, json)
            }
            LogCommands::SetNotes { id, notes, json } => {
                cmd_log_set_notes(&service, &id, notes, json)
            }
            LogCommands::SetServings { id, servings, json } => {
                cmd_log_set_servings(&service, &id, servings, json)
            }
            LogCommands::Delete { id, json } => cmd_log_delete(&service, &id, json),
        },
        Commands::Scan {
            image,
            text,
            yes,
            dry_run,
            json,
        } => cmd_scan(&service, image, text, yes, dry_run, json),
        Commands::Note { text, date, json } => cmd_note(&service, text, date, json),
    }
}
