//! Prep forecasting: planned quantities, shortage checks, and feasibility.
//!
//! Every function here is pure over its inputs. Callers gather the day's
//! suggestions, today's logged consumption, and a stock snapshot up front,
//! so the arithmetic can be unit tested without a live store.

use std::collections::HashMap;

use crate::models::{
    IngredientStock, NecessaryPrepInfo, PrepIngredientInfo, PrepTask, Recipe, ShortageRecord,
};

/// Point-in-time view of raw stock, keyed by lowercased ingredient name.
///
/// Quantities are not reserved between recipes evaluated against the same
/// snapshot; two recipes sharing an ingredient each see the full amount.
#[derive(Debug, Clone, Default)]
pub struct StockSnapshot {
    rows: HashMap<String, IngredientStock>,
}

impl StockSnapshot {
    #[must_use]
    pub fn new(rows: Vec<IngredientStock>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| (row.name.to_lowercase(), row))
            .collect();
        Self { rows }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IngredientStock> {
        self.rows.get(&name.to_lowercase())
    }

    /// Available quantity for an ingredient; 0 when the name has no row.
    #[must_use]
    pub fn available(&self, name: &str) -> f64 {
        self.get(name).map_or(0.0, |row| row.quantity)
    }
}

/// Batches still worth prepping today. Never negative.
#[must_use]
pub fn planned_quantity(suggested: f64, consumed_today: f64) -> f64 {
    (suggested - consumed_today).max(0.0)
}

/// Ingredients whose required amount at `planned_quantity` exceeds the
/// snapshot's available amount. Sufficient ingredients are omitted.
#[must_use]
pub fn check_shortages(
    recipe: &Recipe,
    planned_quantity: f64,
    stock: &StockSnapshot,
) -> Vec<ShortageRecord> {
    let mut shortages = Vec::new();
    for line in &recipe.ingredients {
        let required = line.quantity_per_batch * planned_quantity;
        let available = stock.available(&line.name);
        if required > available {
            shortages.push(ShortageRecord {
                ingredient_name: line.name.clone(),
                required,
                available,
                unit: line.unit.clone(),
            });
        }
    }
    shortages
}

/// Per-ingredient requirements for `planned_quantity` batches, plus whether
/// the snapshot covers all of them.
#[must_use]
pub fn necessary_prep_info(
    recipe: &Recipe,
    planned_quantity: f64,
    stock: &StockSnapshot,
) -> NecessaryPrepInfo {
    let necessary_ingredients = recipe
        .ingredients
        .iter()
        .map(|line| PrepIngredientInfo {
            name: line.name.clone(),
            necessary_amount: line.quantity_per_batch * planned_quantity,
            unit: line.unit.clone(),
            current_stock: stock.available(&line.name),
        })
        .collect();
    let can_prep_with_current_stock = check_shortages(recipe, planned_quantity, stock).is_empty();
    NecessaryPrepInfo {
        necessary_ingredients,
        can_prep_with_current_stock,
    }
}

/// One task per recipe. `suggestions` and `consumed_today` are keyed by
/// recipe id; recipes missing from either map count as 0.
#[must_use]
pub fn build_prep_tasks(
    recipes: Vec<Recipe>,
    suggestions: &HashMap<String, f64>,
    consumed_today: &HashMap<String, f64>,
    stock: &StockSnapshot,
) -> Vec<PrepTask> {
    recipes
        .into_iter()
        .map(|recipe| {
            let suggested = suggestions.get(&recipe.id).copied().unwrap_or(0.0);
            let consumed = consumed_today.get(&recipe.id).copied().unwrap_or(0.0);
            let planned = planned_quantity(suggested, consumed);
            let shortages = check_shortages(&recipe, planned, stock);
            let necessary_prep_info = necessary_prep_info(&recipe, planned, stock);
            PrepTask {
                recipe,
                suggested_quantity: suggested,
                consumed_today: consumed,
                planned_quantity: planned,
                shortages,
                necessary_prep_info,
                is_completed: false,
                completed_quantity: 0.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeIngredient;

    fn stock_row(name: &str, quantity: f64) -> IngredientStock {
        IngredientStock {
            id: format!("stock-{name}"),
            name: name.to_string(),
            quantity,
            unit: "kg".to_string(),
            alert_level: 1.0,
            category: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn soup_recipe() -> Recipe {
        Recipe {
            id: "r1".to_string(),
            name: "Tomato Soup".to_string(),
            category: None,
            description: None,
            created_at: String::new(),
            ingredients: vec![
                RecipeIngredient {
                    id: "i1".to_string(),
                    name: "Tomato".to_string(),
                    quantity_per_batch: 0.5,
                    unit: "kg".to_string(),
                },
                RecipeIngredient {
                    id: "i2".to_string(),
                    name: "Onion".to_string(),
                    quantity_per_batch: 0.2,
                    unit: "kg".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_planned_quantity_clamps_at_zero() {
        assert_eq!(planned_quantity(10.0, 4.0), 6.0);
        assert_eq!(planned_quantity(10.0, 12.0), 0.0);
        assert_eq!(planned_quantity(0.0, 0.0), 0.0);
        assert_eq!(planned_quantity(3.0, 3.0), 0.0);
    }

    #[test]
    fn test_check_shortages_reports_only_insufficient_lines() {
        let recipe = soup_recipe();
        // 4 batches: needs 2.0 Tomato and 0.8 Onion
        let stock = StockSnapshot::new(vec![stock_row("Tomato", 1.5), stock_row("Onion", 0.8)]);

        let shortages = check_shortages(&recipe, 4.0, &stock);
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].ingredient_name, "Tomato");
        assert_eq!(shortages[0].required, 2.0);
        assert_eq!(shortages[0].available, 1.5);
        assert_eq!(shortages[0].unit, "kg");
    }

    #[test]
    fn test_check_shortages_exact_cover_is_not_short() {
        let recipe = soup_recipe();
        let stock = StockSnapshot::new(vec![stock_row("Tomato", 2.0), stock_row("Onion", 0.8)]);
        assert!(check_shortages(&recipe, 4.0, &stock).is_empty());
    }

    #[test]
    fn test_check_shortages_missing_ingredient_counts_as_zero() {
        let recipe = soup_recipe();
        let stock = StockSnapshot::new(vec![stock_row("Tomato", 10.0)]);

        let shortages = check_shortages(&recipe, 1.0, &stock);
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].ingredient_name, "Onion");
        assert_eq!(shortages[0].available, 0.0);
    }

    #[test]
    fn test_zero_planned_quantity_never_shorts() {
        let recipe = soup_recipe();
        let stock = StockSnapshot::default();
        assert!(check_shortages(&recipe, 0.0, &stock).is_empty());
    }

    #[test]
    fn test_snapshot_lookup_is_case_insensitive() {
        let stock = StockSnapshot::new(vec![stock_row("Tomato", 3.0)]);
        assert_eq!(stock.available("tomato"), 3.0);
        assert_eq!(stock.available("TOMATO"), 3.0);
        assert_eq!(stock.available("Basil"), 0.0);
    }

    #[test]
    fn test_necessary_prep_info_matches_shortage_check() {
        let recipe = soup_recipe();
        let short = StockSnapshot::new(vec![stock_row("Tomato", 0.4)]);
        let covered = StockSnapshot::new(vec![stock_row("Tomato", 5.0), stock_row("Onion", 5.0)]);

        for (stock, expected) in [(&short, false), (&covered, true)] {
            let info = necessary_prep_info(&recipe, 2.0, stock);
            assert_eq!(info.can_prep_with_current_stock, expected);
            assert_eq!(
                info.can_prep_with_current_stock,
                check_shortages(&recipe, 2.0, stock).is_empty()
            );
        }

        let info = necessary_prep_info(&recipe, 2.0, &short);
        assert_eq!(info.necessary_ingredients.len(), 2);
        assert_eq!(info.necessary_ingredients[0].name, "Tomato");
        assert_eq!(info.necessary_ingredients[0].necessary_amount, 1.0);
        assert_eq!(info.necessary_ingredients[0].current_stock, 0.4);
        assert_eq!(info.necessary_ingredients[1].current_stock, 0.0);
    }

    #[test]
    fn test_build_prep_tasks_defaults_and_arithmetic() {
        let recipes = vec![soup_recipe()];
        let stock = StockSnapshot::new(vec![stock_row("Tomato", 10.0), stock_row("Onion", 10.0)]);

        let mut suggestions = HashMap::new();
        suggestions.insert("r1".to_string(), 10.0);
        let mut consumed = HashMap::new();
        consumed.insert("r1".to_string(), 4.0);

        let tasks = build_prep_tasks(recipes.clone(), &suggestions, &consumed, &stock);
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.suggested_quantity, 10.0);
        assert_eq!(task.consumed_today, 4.0);
        assert_eq!(task.planned_quantity, 6.0);
        assert!(task.shortages.is_empty());
        assert!(task.necessary_prep_info.can_prep_with_current_stock);
        assert!(!task.is_completed);
        assert_eq!(task.completed_quantity, 0.0);

        // No suggestion row and no consumption: everything defaults to zero
        let tasks = build_prep_tasks(recipes, &HashMap::new(), &HashMap::new(), &stock);
        assert_eq!(tasks[0].suggested_quantity, 0.0);
        assert_eq!(tasks[0].planned_quantity, 0.0);
    }
}
