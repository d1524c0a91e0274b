use std::fmt;

use anyhow::{Result, bail};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Alert level assigned to stock rows created by a scan commit.
pub const DEFAULT_ALERT_LEVEL: f64 = 1.0;

pub const STOCK_UNITS: &[&str] = &["kg", "g", "ml"];

#[derive(Debug, Clone, Serialize)]
pub struct IngredientStock {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub alert_level: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl IngredientStock {
    /// True when the row sits at or below its own alert level.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.quantity <= self.alert_level
    }
}

#[derive(Debug, Clone)]
pub struct NewIngredientStock {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: Option<String>,
    pub alert_level: f64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateIngredientStock {
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub alert_level: Option<f64>,
    pub category: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub ingredients: Vec<RecipeIngredient>,
}

/// One line of a recipe. Lines reference raw stock by ingredient name; a
/// line may name an ingredient that has no stock row yet.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: String,
    pub name: String,
    pub quantity_per_batch: f64,
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub ingredients: Vec<NewRecipeIngredient>,
}

#[derive(Debug, Clone)]
pub struct NewRecipeIngredient {
    pub name: String,
    pub quantity_per_batch: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealLogEntry {
    pub id: String,
    pub recipe_id: String,
    pub quantity: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_override_servings: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    // Joined fields for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMealLogEntry {
    pub recipe_id: String,
    pub quantity: f64,
    /// Log date; `None` stamps the current local time.
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub manual_override_servings: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMealLogEntry {
    pub quantity: Option<f64>,
    pub notes: Option<Option<String>>,
    pub manual_override_servings: Option<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepSuggestion {
    pub id: String,
    pub recipe_id: String,
    pub day_kind: DayKind,
    pub suggested_quantity: f64,
    // Joined field for display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyNote {
    pub note_date: String,
    pub comment: String,
    pub updated_at: String,
}

/// Weekday/weekend split used to pick the applicable prep suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    /// Saturday and Sunday count as weekend, everything else as weekday.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekday,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::Weekend => "weekend",
        }
    }
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shortfall of one ingredient at an evaluated planned quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortageRecord {
    pub ingredient_name: String,
    pub required: f64,
    pub available: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrepIngredientInfo {
    pub name: String,
    pub necessary_amount: f64,
    pub unit: String,
    pub current_stock: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NecessaryPrepInfo {
    pub necessary_ingredients: Vec<PrepIngredientInfo>,
    pub can_prep_with_current_stock: bool,
}

/// One row of a prep sheet. Derived on every forecast run, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PrepTask {
    pub recipe: Recipe,
    pub suggested_quantity: f64,
    pub consumed_today: f64,
    pub planned_quantity: f64,
    pub shortages: Vec<ShortageRecord>,
    pub necessary_prep_info: NecessaryPrepInfo,
    pub is_completed: bool,
    pub completed_quantity: f64,
}

/// Everything the kitchen pins up for one day: the prep tasks plus the
/// note carried over from the day before when today has none.
#[derive(Debug, Clone, Serialize)]
pub struct PrepSheet {
    pub date: NaiveDate,
    pub day_kind: DayKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<DailyNote>,
    pub tasks: Vec<PrepTask>,
}

/// How stock mutations reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Store-side `quantity = quantity + delta` in a single statement.
    #[default]
    Atomic,
    /// Separate read followed by an absolute write, matching the historical
    /// behavior; concurrent sessions can lose updates in this mode.
    ReadModifyWrite,
}

/// Tunable engine settings. Defaults mirror the historical constants.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Finished-goods level at or below which an advisory is raised.
    pub low_stock_threshold: f64,
    /// Similarity a fuzzy name match must exceed to be accepted.
    pub fuzzy_accept_score: f64,
    pub write_mode: WriteMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            low_stock_threshold: 2.0,
            fuzzy_accept_score: 0.75,
            write_mode: WriteMode::Atomic,
        }
    }
}

pub fn validate_unit(unit: &str) -> Result<String> {
    let lower = unit.to_lowercase();
    if STOCK_UNITS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid unit '{unit}'. Must be one of: {}",
            STOCK_UNITS.join(", ")
        )
    }
}

pub fn validate_day_kind(value: &str) -> Result<DayKind> {
    match value.to_lowercase().as_str() {
        "weekday" => Ok(DayKind::Weekday),
        "weekend" => Ok(DayKind::Weekend),
        _ => bail!("Invalid day kind '{value}'. Must be one of: weekday, weekend"),
    }
}

pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Name must not be empty");
    }
    Ok(trimmed.to_string())
}

pub fn validate_non_negative(value: f64, what: &str) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{what} must be a non-negative number");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_kind_from_date() {
        // 2024-06-01 is a Saturday, 2024-06-02 a Sunday, 2024-06-03 a Monday
        let sat = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let sun = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let mon = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert_eq!(DayKind::from_date(sat), DayKind::Weekend);
        assert_eq!(DayKind::from_date(sun), DayKind::Weekend);
        assert_eq!(DayKind::from_date(mon), DayKind::Weekday);
    }

    #[test]
    fn test_day_kind_as_str_round_trip() {
        assert_eq!(validate_day_kind("weekday").unwrap(), DayKind::Weekday);
        assert_eq!(validate_day_kind("WEEKEND").unwrap(), DayKind::Weekend);
        assert!(validate_day_kind("holiday").is_err());
        assert_eq!(DayKind::Weekend.as_str(), "weekend");
    }

    #[test]
    fn test_day_kind_serializes_lowercase() {
        // CLI JSON output and the suggestions table both rely on this casing.
        assert_eq!(
            serde_json::to_string(&DayKind::Weekday).unwrap(),
            "\"weekday\""
        );
        assert_eq!(
            serde_json::from_str::<DayKind>("\"weekend\"").unwrap(),
            DayKind::Weekend
        );
    }

    #[test]
    fn test_validate_unit() {
        assert_eq!(validate_unit("KG").unwrap(), "kg");
        assert_eq!(validate_unit("g").unwrap(), "g");
        assert_eq!(validate_unit("ml").unwrap(), "ml");
        assert!(validate_unit("lbs").is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Tomato ").unwrap(), "Tomato");
        assert!(validate_name("   ").is_err());
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative(0.0, "Quantity").is_ok());
        assert!(validate_non_negative(3.5, "Quantity").is_ok());
        assert!(validate_non_negative(-1.0, "Quantity").is_err());
        assert!(validate_non_negative(f64::NAN, "Quantity").is_err());
    }

    #[test]
    fn test_is_low_boundary() {
        let mut row = IngredientStock {
            id: "x".to_string(),
            name: "Salt".to_string(),
            quantity: 1.0,
            unit: "kg".to_string(),
            alert_level: 1.0,
            category: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(row.is_low());
        row.quantity = 1.1;
        assert!(!row.is_low());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert!((settings.low_stock_threshold - 2.0).abs() < f64::EPSILON);
        assert!((settings.fuzzy_accept_score - 0.75).abs() < f64::EPSILON);
        assert_eq!(settings.write_mode, WriteMode::Atomic);
    }
}
