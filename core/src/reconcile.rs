//! Delta reconciliation between the meal ledger and the two stock pools.
//!
//! Two independent paths mutate stock. Quantity edits on ledger rows adjust
//! the recipe's finished-goods counter by the edit delta. Prep completion
//! debits raw ingredients and appends a ledger row. Completion does not touch
//! finished goods, and notes edits and deletes reconcile nothing; that
//! asymmetry is longstanding observed behavior and is kept as is.
//!
//! Neither path is safe to invoke twice for one logical edit: deltas apply
//! on every call.

use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    MealLogEntry, NewMealLogEntry, Settings, UpdateMealLogEntry, WriteMode,
};

/// Notice that a finished-goods counter ended at or below the configured
/// threshold. Raised after the write succeeds; never blocks or undoes it.
#[derive(Debug, Clone, Serialize)]
pub struct LowStockAdvisory {
    pub recipe_name: String,
    pub remaining: f64,
}

/// Outcome of one ledger quantity edit.
#[derive(Debug, Serialize)]
pub struct QuantityChange {
    pub entry: MealLogEntry,
    pub delta: f64,
    pub finished_goods: f64,
    pub advisory: Option<LowStockAdvisory>,
}

/// One ingredient debit performed during completion.
#[derive(Debug, Clone, Serialize)]
pub struct StockDebit {
    pub ingredient_name: String,
    pub amount: f64,
    pub unit: String,
    pub remaining: f64,
}

/// Outcome of one prep-task completion.
#[derive(Debug, Serialize)]
pub struct PrepCompletion {
    pub entry: MealLogEntry,
    pub debits: Vec<StockDebit>,
    /// Recipe lines with no matching stock row, left untouched.
    pub skipped: Vec<String>,
    /// Per-ingredient store failures; the loop continues past them.
    pub failures: Vec<String>,
}

/// Applies a quantity edit to a ledger row, adjusting the recipe's
/// finished-goods counter by `new_quantity - old_quantity` exactly once
/// before persisting the row.
pub fn apply_quantity_change(
    db: &Database,
    settings: &Settings,
    log_id: &str,
    new_quantity: f64,
) -> Result<QuantityChange> {
    let current = db.get_meal_log(log_id)?;
    let delta = new_quantity - current.quantity;

    let finished_goods = if delta == 0.0 {
        db.get_finished_goods(&current.recipe_id)?
    } else {
        adjust_finished_goods(db, settings, &current.recipe_id, delta)?
    };

    let entry = db.update_meal_log(
        log_id,
        &UpdateMealLogEntry {
            quantity: Some(new_quantity),
            ..Default::default()
        },
    )?;

    let advisory = if finished_goods <= settings.low_stock_threshold {
        Some(LowStockAdvisory {
            recipe_name: entry
                .recipe_name
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            remaining: finished_goods,
        })
    } else {
        None
    };

    Ok(QuantityChange {
        entry,
        delta,
        finished_goods,
        advisory,
    })
}

/// Completes a prep task: debits each recipe ingredient's raw stock by
/// `quantity_per_batch * completed_quantity`, then inserts one ledger row
/// for the completed quantity.
pub fn complete_prep(
    db: &Database,
    settings: &Settings,
    recipe_id: &str,
    completed_quantity: f64,
) -> Result<PrepCompletion> {
    let recipe = db.get_recipe(recipe_id)?;

    let mut debits = Vec::new();
    let mut skipped = Vec::new();
    let mut failures = Vec::new();

    for line in &recipe.ingredients {
        let amount = line.quantity_per_batch * completed_quantity;
        match debit_ingredient(db, settings, &line.name, amount) {
            Ok(Some(remaining)) => debits.push(StockDebit {
                ingredient_name: line.name.clone(),
                amount,
                unit: line.unit.clone(),
                remaining,
            }),
            Ok(None) => skipped.push(line.name.clone()),
            Err(e) => failures.push(format!("{}: {e}", line.name)),
        }
    }

    let entry = db.insert_meal_log(&NewMealLogEntry {
        recipe_id: recipe.id.clone(),
        quantity: completed_quantity,
        date: None,
        notes: None,
        manual_override_servings: None,
    })?;

    Ok(PrepCompletion {
        entry,
        debits,
        skipped,
        failures,
    })
}

fn adjust_finished_goods(
    db: &Database,
    settings: &Settings,
    recipe_id: &str,
    delta: f64,
) -> Result<f64> {
    match settings.write_mode {
        WriteMode::Atomic => db.adjust_finished_goods(recipe_id, delta),
        WriteMode::ReadModifyWrite => {
            let next = db.get_finished_goods(recipe_id)? + delta;
            db.set_finished_goods(recipe_id, next)?;
            Ok(next)
        }
    }
}

/// Returns the remaining quantity, or `None` when the name has no stock row.
fn debit_ingredient(
    db: &Database,
    settings: &Settings,
    name: &str,
    amount: f64,
) -> Result<Option<f64>> {
    let Some(row) = db.find_ingredient_by_name(name)? else {
        return Ok(None);
    };
    match settings.write_mode {
        WriteMode::Atomic => {
            let after = db.adjust_ingredient_quantity(&row.id, -amount)?;
            Ok(Some(after.quantity))
        }
        WriteMode::ReadModifyWrite => {
            let next = row.quantity - amount;
            db.set_ingredient_quantity(&row.id, next)?;
            Ok(Some(next))
        }
    }
}
