use std::path::Path;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};

use crate::csv_import::{self, StockImportSummary};
use crate::db::Database;
use crate::error::CoreError;
use crate::forecast::{self, StockSnapshot};
use crate::grouping::{self, GroupedMealLog};
use crate::models::{
    validate_day_kind, validate_name, validate_non_negative, validate_unit, DailyNote, DayKind,
    IngredientStock, MealLogEntry, NecessaryPrepInfo, NewIngredientStock, NewMealLogEntry,
    NewRecipe, NewRecipeIngredient, PrepSheet, PrepSuggestion, Recipe, Settings,
    UpdateIngredientStock, UpdateMealLogEntry,
};
use crate::ocr::{self, CommitSummary, ScanSession};
use crate::reconcile::{self, PrepCompletion, QuantityChange};

/// Platform-native text recognition provider.
///
/// The CLI implements this with an OCR.space client; tests use a canned
/// mock. Called synchronously from Rust, so async callers should hand over
/// already-resolved text or block on their runtime before calling in.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

pub struct LarderService {
    db: Database,
    settings: Settings,
}

impl LarderService {
    pub fn new(db_path: &str) -> Result<Self> {
        Self::with_settings(db_path, Settings::default())
    }

    pub fn with_settings(db_path: &str, settings: Settings) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db, settings })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db,
            settings: Settings::default(),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // --- Raw stock ---

    pub fn add_stock(&self, new: &NewIngredientStock) -> Result<IngredientStock> {
        let name = validate_name(&new.name)?;
        validate_non_negative(new.quantity, "Quantity")?;
        validate_non_negative(new.alert_level, "Alert level")?;
        let unit = validate_unit(&new.unit)?;
        if self.db.find_ingredient_by_name(&name)?.is_some() {
            bail!("'{name}' is already in stock; use stock set to change it");
        }
        Ok(self.db.insert_ingredient(&NewIngredientStock {
            name,
            quantity: new.quantity,
            unit,
            category: new.category.clone(),
            alert_level: new.alert_level,
        })?)
    }

    pub fn get_stock(&self, name: &str) -> Result<IngredientStock> {
        Ok(self
            .db
            .find_ingredient_by_name(name)?
            .ok_or_else(|| CoreError::not_found(format!("Ingredient '{name}'")))?)
    }

    pub fn list_stock(&self, category: Option<&str>) -> Result<Vec<IngredientStock>> {
        Ok(self.db.list_ingredients(category)?)
    }

    pub fn list_categories(&self) -> Result<Vec<String>> {
        Ok(self.db.list_categories()?)
    }

    pub fn set_stock(
        &self,
        name: &str,
        update: &UpdateIngredientStock,
    ) -> Result<IngredientStock> {
        let stock = self.get_stock(name)?;
        if let Some(quantity) = update.quantity {
            validate_non_negative(quantity, "Quantity")?;
        }
        if let Some(alert_level) = update.alert_level {
            validate_non_negative(alert_level, "Alert level")?;
        }
        let mut update = update.clone();
        if let Some(ref unit) = update.unit {
            update.unit = Some(validate_unit(unit)?);
        }
        Ok(self.db.update_ingredient(&stock.id, &update)?)
    }

    pub fn import_stock_csv(&self, csv_data: &str, dry_run: bool) -> Result<StockImportSummary> {
        let rows = csv_import::parse_stock_csv(csv_data.as_bytes())?;
        Ok(csv_import::import_stock_rows(
            &self.db,
            &self.settings,
            &rows,
            dry_run,
        ))
    }

    // --- Recipes ---

    pub fn add_recipe(&self, new: &NewRecipe) -> Result<Recipe> {
        let name = validate_name(&new.name)?;
        if self.db.find_recipe_by_name(&name)?.is_some() {
            bail!("Recipe '{name}' already exists");
        }
        let mut ingredients = Vec::with_capacity(new.ingredients.len());
        for line in &new.ingredients {
            validate_non_negative(line.quantity_per_batch, "Quantity per batch")?;
            ingredients.push(NewRecipeIngredient {
                name: validate_name(&line.name)?,
                quantity_per_batch: line.quantity_per_batch,
                unit: validate_unit(&line.unit)?,
            });
        }
        Ok(self.db.insert_recipe(&NewRecipe {
            name,
            category: new.category.clone(),
            description: new.description.clone(),
            ingredients,
        })?)
    }

    pub fn get_recipe(&self, name: &str) -> Result<Recipe> {
        Ok(self
            .db
            .find_recipe_by_name(name)?
            .ok_or_else(|| CoreError::not_found(format!("Recipe '{name}'")))?)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        Ok(self.db.list_recipes()?)
    }

    /// Prepared-batch count currently on hand for a recipe.
    pub fn finished_goods(&self, recipe_name: &str) -> Result<f64> {
        let recipe = self.get_recipe(recipe_name)?;
        Ok(self.db.get_finished_goods(&recipe.id)?)
    }

    /// Overwrites the prepared-batch count, for stocktake corrections.
    pub fn set_finished_goods(&self, recipe_name: &str, quantity: f64) -> Result<()> {
        validate_non_negative(quantity, "Quantity")?;
        let recipe = self.get_recipe(recipe_name)?;
        Ok(self.db.set_finished_goods(&recipe.id, quantity)?)
    }

    // --- Prep suggestions ---

    pub fn set_suggestion(
        &self,
        recipe_name: &str,
        day_kind: &str,
        suggested_quantity: f64,
    ) -> Result<PrepSuggestion> {
        let day_kind = validate_day_kind(day_kind)?;
        validate_non_negative(suggested_quantity, "Suggested quantity")?;
        let recipe = self.get_recipe(recipe_name)?;
        Ok(self
            .db
            .set_suggestion(&recipe.id, day_kind, suggested_quantity)?)
    }

    pub fn list_suggestions(&self) -> Result<Vec<PrepSuggestion>> {
        Ok(self.db.list_suggestions()?)
    }

    // --- Prep forecast ---

    /// Builds the prep sheet for a day, defaulting to today. Suggestions are
    /// picked by the day's weekday/weekend kind; what was already logged that
    /// day counts against them.
    pub fn prep_sheet(&self, date: Option<NaiveDate>) -> Result<PrepSheet> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        let day_kind = DayKind::from_date(date);
        let suggestions = self.db.suggestions_for(day_kind)?;
        let consumed = self.db.consumed_on(date)?;
        let stock = StockSnapshot::new(self.db.list_ingredients(None)?);
        let recipes = self.db.list_recipes()?;

        let mut tasks = forecast::build_prep_tasks(recipes, &suggestions, &consumed, &stock);
        for task in &mut tasks {
            task.completed_quantity = consumed.get(&task.recipe.id).copied().unwrap_or(0.0);
            task.is_completed = task.suggested_quantity > 0.0 && task.planned_quantity <= 0.0;
        }

        let note = self.db.get_note_or_previous(date)?;
        Ok(PrepSheet {
            date,
            day_kind,
            note,
            tasks,
        })
    }

    /// What a batch count of a recipe would take out of current stock, and
    /// whether the stock covers it.
    pub fn necessary_prep(&self, recipe_name: &str, quantity: f64) -> Result<NecessaryPrepInfo> {
        validate_non_negative(quantity, "Quantity")?;
        let recipe = self.get_recipe(recipe_name)?;
        let stock = StockSnapshot::new(self.db.list_ingredients(None)?);
        Ok(forecast::necessary_prep_info(&recipe, quantity, &stock))
    }

    /// Records a completed prep run: debits raw stock per recipe line and
    /// logs the batch as consumed.
    pub fn complete_prep(&self, recipe_name: &str, quantity: f64) -> Result<PrepCompletion> {
        validate_non_negative(quantity, "Quantity")?;
        let recipe = self.get_recipe(recipe_name)?;
        Ok(reconcile::complete_prep(
            &self.db,
            &self.settings,
            &recipe.id,
            quantity,
        )?)
    }

    // --- Meal log ---

    /// Books a log entry directly, without touching either stock pool.
    pub fn add_log(
        &self,
        recipe_name: &str,
        quantity: f64,
        date: Option<NaiveDate>,
        notes: Option<String>,
        manual_override_servings: Option<f64>,
    ) -> Result<MealLogEntry> {
        validate_non_negative(quantity, "Quantity")?;
        if let Some(servings) = manual_override_servings {
            validate_non_negative(servings, "Servings override")?;
        }
        let recipe = self.get_recipe(recipe_name)?;
        Ok(self.db.insert_meal_log(&NewMealLogEntry {
            recipe_id: recipe.id,
            quantity,
            date,
            notes,
            manual_override_servings,
        })?)
    }

    /// Log entries grouped per recipe, newest group first. A search term
    /// filters entries by recipe name before grouping.
    pub fn list_logs(&self, search: Option<&str>) -> Result<Vec<GroupedMealLog>> {
        let mut logs = self.db.list_meal_logs()?;
        if let Some(term) = search {
            logs = grouping::filter_by_recipe_name(logs, term);
        }
        Ok(grouping::group_by_recipe_name(&logs))
    }

    pub fn get_log(&self, id: &str) -> Result<MealLogEntry> {
        Ok(self.db.get_meal_log(id)?)
    }

    /// Changes an entry's quantity and applies the difference to the
    /// prepared-batch count, raising a low-stock advisory when the result
    /// runs low.
    pub fn set_log_quantity(&self, id: &str, new_quantity: f64) -> Result<QuantityChange> {
        validate_non_negative(new_quantity, "Quantity")?;
        Ok(reconcile::apply_quantity_change(
            &self.db,
            &self.settings,
            id,
            new_quantity,
        )?)
    }

    /// Edits an entry's notes. Stock is untouched.
    pub fn set_log_notes(&self, id: &str, notes: Option<String>) -> Result<MealLogEntry> {
        Ok(self.db.update_meal_log(
            id,
            &UpdateMealLogEntry {
                notes: Some(notes),
                ..UpdateMealLogEntry::default()
            },
        )?)
    }

    /// Edits an entry's servings override. Stock is untouched.
    pub fn set_log_servings(&self, id: &str, servings: Option<f64>) -> Result<MealLogEntry> {
        if let Some(servings) = servings {
            validate_non_negative(servings, "Servings override")?;
        }
        Ok(self.db.update_meal_log(
            id,
            &UpdateMealLogEntry {
                manual_override_servings: Some(servings),
                ..UpdateMealLogEntry::default()
            },
        )?)
    }

    /// Deletes an entry. Stock is untouched, so a completed prep's debits
    /// stand even after its log row is gone.
    pub fn delete_log(&self, id: &str) -> Result<bool> {
        Ok(self.db.delete_meal_log(id)?)
    }

    // --- Daily notes ---

    /// The note for a day, falling back to the previous day's so yesterday's
    /// handover stays visible until something is written today.
    pub fn daily_note(&self, date: Option<NaiveDate>) -> Result<Option<DailyNote>> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        Ok(self.db.get_note_or_previous(date)?)
    }

    pub fn save_note(&self, date: Option<NaiveDate>, comment: &str) -> Result<DailyNote> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        Ok(self.db.upsert_note(date, comment)?)
    }

    // --- Invoice scanning ---

    /// Runs an image through the recognizer and parses the text into review
    /// items matched against current stock.
    pub fn scan_image(
        &self,
        recognizer: &dyn TextRecognizer,
        image: &[u8],
    ) -> Result<ScanSession> {
        let mut session = ScanSession::new();
        session.begin_recognition();
        let text = recognizer.recognize(image)?;
        self.finish_scan(session, text)
    }

    /// Same pipeline as [`Self::scan_image`], starting from already
    /// recognized text.
    pub fn scan_text(&self, text: String) -> Result<ScanSession> {
        let mut session = ScanSession::new();
        session.begin_recognition();
        self.finish_scan(session, text)
    }

    fn finish_scan(&self, mut session: ScanSession, text: String) -> Result<ScanSession> {
        let known = self.db.list_ingredients(None)?;
        session.finish_recognition(text, &known, self.settings.fuzzy_accept_score);
        Ok(session)
    }

    /// Writes the session's reviewed items to stock and marks it committed.
    pub fn commit_scan(&self, session: &mut ScanSession) -> CommitSummary {
        let summary = ocr::commit_items(&self.db, &self.settings, &session.items);
        session.mark_committed();
        summary
    }
}
