use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{
    DailyNote, DayKind, IngredientStock, MealLogEntry, NewIngredientStock, NewMealLogEntry,
    NewRecipe, PrepSuggestion, Recipe, RecipeIngredient, UpdateIngredientStock, UpdateMealLogEntry,
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> rusqlite::Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                    quantity REAL NOT NULL DEFAULT 0,
                    unit TEXT NOT NULL DEFAULT 'kg',
                    alert_level REAL NOT NULL DEFAULT 1,
                    category TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    category TEXT,
                    description TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id TEXT PRIMARY KEY,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    quantity_per_batch REAL NOT NULL,
                    unit TEXT NOT NULL,
                    position INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS finished_goods (
                    recipe_id TEXT PRIMARY KEY REFERENCES recipes(id),
                    quantity REAL NOT NULL DEFAULT 0,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_logs (
                    id TEXT PRIMARY KEY,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id),
                    quantity REAL NOT NULL,
                    date TEXT NOT NULL,
                    notes TEXT,
                    manual_override_servings REAL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS prep_suggestions (
                    id TEXT PRIMARY KEY,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id),
                    day_kind TEXT NOT NULL CHECK (day_kind IN ('weekday', 'weekend')),
                    suggested_quantity REAL NOT NULL DEFAULT 0,
                    UNIQUE (recipe_id, day_kind)
                );

                CREATE TABLE IF NOT EXISTS prep_notes (
                    note_date TEXT PRIMARY KEY,
                    comment TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_meal_logs_date ON meal_logs(date);
                CREATE INDEX IF NOT EXISTS idx_meal_logs_recipe ON meal_logs(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Ingredients (raw stock) ---

    // Expects columns:
    // 0: id, 1: name, 2: quantity, 3: unit, 4: alert_level, 5: category,
    // 6: created_at, 7: updated_at
    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<IngredientStock> {
        Ok(IngredientStock {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            unit: row.get(3)?,
            alert_level: row.get(4)?,
            category: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn insert_ingredient(&self, new: &NewIngredientStock) -> Result<IngredientStock> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO ingredients (id, name, quantity, unit, alert_level, category, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                new.name,
                new.quantity,
                new.unit,
                new.alert_level,
                new.category,
                now,
                now,
            ],
        )?;
        self.get_ingredient(&id)
    }

    pub fn get_ingredient(&self, id: &str) -> Result<IngredientStock> {
        self.conn
            .query_row(
                "SELECT id, name, quantity, unit, alert_level, category, created_at, updated_at
                 FROM ingredients WHERE id = ?1",
                params![id],
                Self::ingredient_from_row,
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Ingredient"))
    }

    pub fn find_ingredient_by_name(&self, name: &str) -> Result<Option<IngredientStock>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, quantity, unit, alert_level, category, created_at, updated_at
                 FROM ingredients WHERE LOWER(name) = LOWER(?1)",
                params![name],
                Self::ingredient_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_ingredients(&self, category: Option<&str>) -> Result<Vec<IngredientStock>> {
        let sql = "SELECT id, name, quantity, unit, alert_level, category, created_at, updated_at
                   FROM ingredients";
        let rows = if let Some(category) = category {
            let mut stmt = self
                .conn
                .prepare(&format!("{sql} WHERE LOWER(category) = LOWER(?1) ORDER BY name"))?;
            stmt.query_map(params![category], Self::ingredient_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = self.conn.prepare(&format!("{sql} ORDER BY name"))?;
            stmt.query_map([], Self::ingredient_from_row)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category FROM ingredients
             WHERE category IS NOT NULL AND category != '' ORDER BY category",
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn update_ingredient(
        &self,
        id: &str,
        update: &UpdateIngredientStock,
    ) -> Result<IngredientStock> {
        // Verify existence
        self.get_ingredient(id)?;

        let now = Local::now().to_rfc3339();
        if let Some(quantity) = update.quantity {
            self.conn.execute(
                "UPDATE ingredients SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
                params![quantity, now, id],
            )?;
        }
        if let Some(ref unit) = update.unit {
            self.conn.execute(
                "UPDATE ingredients SET unit = ?1, updated_at = ?2 WHERE id = ?3",
                params![unit, now, id],
            )?;
        }
        if let Some(alert_level) = update.alert_level {
            self.conn.execute(
                "UPDATE ingredients SET alert_level = ?1, updated_at = ?2 WHERE id = ?3",
                params![alert_level, now, id],
            )?;
        }
        if let Some(ref category) = update.category {
            self.conn.execute(
                "UPDATE ingredients SET category = ?1, updated_at = ?2 WHERE id = ?3",
                params![category, now, id],
            )?;
        }

        self.get_ingredient(id)
    }

    /// Absolute quantity write, the second half of a read-modify-write pair.
    pub fn set_ingredient_quantity(&self, id: &str, quantity: f64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE ingredients SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![quantity, now, id],
        )?;
        if rows == 0 {
            return Err(CoreError::not_found("Ingredient"));
        }
        Ok(())
    }

    /// Store-side relative adjustment in a single statement.
    pub fn adjust_ingredient_quantity(&self, id: &str, delta: f64) -> Result<IngredientStock> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE ingredients SET quantity = quantity + ?1, updated_at = ?2 WHERE id = ?3",
            params![delta, now, id],
        )?;
        if rows == 0 {
            return Err(CoreError::not_found("Ingredient"));
        }
        self.get_ingredient(id)
    }

    // --- Recipes ---

    // Expects columns:
    // 0: id, 1: name, 2: quantity_per_batch, 3: unit
    fn recipe_ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<RecipeIngredient> {
        Ok(RecipeIngredient {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity_per_batch: row.get(2)?,
            unit: row.get(3)?,
        })
    }

    pub fn insert_recipe(&self, new: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO recipes (id, name, category, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, new.name, new.category, new.description, now],
        )?;
        let mut position = 0i64;
        for line in &new.ingredients {
            self.conn.execute(
                "INSERT INTO recipe_ingredients (id, recipe_id, name, quantity_per_batch, unit, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    id,
                    line.name,
                    line.quantity_per_batch,
                    line.unit,
                    position,
                ],
            )?;
            position += 1;
        }
        self.get_recipe(&id)
    }

    pub fn get_recipe(&self, id: &str) -> Result<Recipe> {
        let (id, name, category, description, created_at) = self
            .conn
            .query_row(
                "SELECT id, name, category, description, created_at FROM recipes WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Recipe"))?;

        let mut stmt = self.conn.prepare(
            "SELECT id, name, quantity_per_batch, unit FROM recipe_ingredients
             WHERE recipe_id = ?1 ORDER BY position",
        )?;
        let ingredients = stmt
            .query_map(params![id], Self::recipe_ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Recipe {
            id,
            name,
            category,
            description,
            created_at,
            ingredients,
        })
    }

    pub fn find_recipe_by_name(&self, name: &str) -> Result<Option<Recipe>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM recipes WHERE LOWER(name) = LOWER(?1)",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => Ok(Some(self.get_recipe(&id)?)),
            None => Ok(None),
        }
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let ids: Vec<String> = {
            let mut stmt = self.conn.prepare("SELECT id FROM recipes ORDER BY name")?;
            stmt.query_map([], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut recipes = Vec::with_capacity(ids.len());
        for id in ids {
            recipes.push(self.get_recipe(&id)?);
        }
        Ok(recipes)
    }

    // --- Finished goods ---

    pub fn get_finished_goods(&self, recipe_id: &str) -> Result<f64> {
        let quantity: Option<f64> = self
            .conn
            .query_row(
                "SELECT quantity FROM finished_goods WHERE recipe_id = ?1",
                params![recipe_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(quantity.unwrap_or(0.0))
    }

    /// Store-side relative adjustment; creates the counter at `delta` when the
    /// recipe has none yet. Returns the resulting quantity.
    pub fn adjust_finished_goods(&self, recipe_id: &str, delta: f64) -> Result<f64> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO finished_goods (recipe_id, quantity, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(recipe_id) DO UPDATE SET
                 quantity = quantity + excluded.quantity,
                 updated_at = excluded.updated_at",
            params![recipe_id, delta, now],
        )?;
        self.get_finished_goods(recipe_id)
    }

    /// Absolute counter write, the second half of a read-modify-write pair.
    pub fn set_finished_goods(&self, recipe_id: &str, quantity: f64) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO finished_goods (recipe_id, quantity, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(recipe_id) DO UPDATE SET
                 quantity = excluded.quantity,
                 updated_at = excluded.updated_at",
            params![recipe_id, quantity, now],
        )?;
        Ok(())
    }

    // --- Meal logs ---

    // Expects columns:
    // 0: ml.id, 1: ml.recipe_id, 2: ml.quantity, 3: ml.date, 4: ml.notes,
    // 5: ml.manual_override_servings, 6: ml.created_at, 7: ml.updated_at,
    // 8: r.name, 9: r.category
    fn meal_log_from_row(row: &rusqlite::Row) -> rusqlite::Result<MealLogEntry> {
        Ok(MealLogEntry {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            quantity: row.get(2)?,
            date: row.get(3)?,
            notes: row.get(4)?,
            manual_override_servings: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            recipe_name: row.get(8)?,
            recipe_category: row.get(9)?,
        })
    }

    pub fn insert_meal_log(&self, new: &NewMealLogEntry) -> Result<MealLogEntry> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        let date = match new.date {
            Some(date) => format!("{} 00:00:00", date.format("%Y-%m-%d")),
            None => Local::now()
                .naive_local()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        };
        self.conn.execute(
            "INSERT INTO meal_logs (id, recipe_id, quantity, date, notes, manual_override_servings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                new.recipe_id,
                new.quantity,
                date,
                new.notes,
                new.manual_override_servings,
                now,
                now,
            ],
        )?;
        self.get_meal_log(&id)
    }

    pub fn get_meal_log(&self, id: &str) -> Result<MealLogEntry> {
        self.conn
            .query_row(
                "SELECT ml.id, ml.recipe_id, ml.quantity, ml.date, ml.notes,
                        ml.manual_override_servings, ml.created_at, ml.updated_at,
                        r.name, r.category
                 FROM meal_logs ml
                 LEFT JOIN recipes r ON ml.recipe_id = r.id
                 WHERE ml.id = ?1",
                params![id],
                Self::meal_log_from_row,
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Meal log entry"))
    }

    /// All ledger rows, newest first.
    pub fn list_meal_logs(&self) -> Result<Vec<MealLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT ml.id, ml.recipe_id, ml.quantity, ml.date, ml.notes,
                    ml.manual_override_servings, ml.created_at, ml.updated_at,
                    r.name, r.category
             FROM meal_logs ml
             LEFT JOIN recipes r ON ml.recipe_id = r.id
             ORDER BY ml.date DESC, ml.created_at DESC",
        )?;
        let logs = stmt
            .query_map([], Self::meal_log_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    pub fn update_meal_log(&self, id: &str, update: &UpdateMealLogEntry) -> Result<MealLogEntry> {
        // Verify existence
        self.get_meal_log(id)?;

        let now = Local::now().to_rfc3339();
        if let Some(quantity) = update.quantity {
            self.conn.execute(
                "UPDATE meal_logs SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
                params![quantity, now, id],
            )?;
        }
        if let Some(ref notes) = update.notes {
            self.conn.execute(
                "UPDATE meal_logs SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                params![notes, now, id],
            )?;
        }
        if let Some(ref servings) = update.manual_override_servings {
            self.conn.execute(
                "UPDATE meal_logs SET manual_override_servings = ?1, updated_at = ?2 WHERE id = ?3",
                params![servings, now, id],
            )?;
        }

        self.get_meal_log(id)
    }

    pub fn delete_meal_log(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meal_logs WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Logged quantity per recipe for one calendar day.
    pub fn consumed_on(&self, date: NaiveDate) -> Result<HashMap<String, f64>> {
        let pattern = format!("{}%", date.format("%Y-%m-%d"));
        let mut stmt = self.conn.prepare(
            "SELECT recipe_id, SUM(quantity) FROM meal_logs
             WHERE date LIKE ?1 GROUP BY recipe_id",
        )?;
        let rows = stmt
            .query_map(params![pattern], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    // --- Prep suggestions ---

    // Expects columns:
    // 0: ps.id, 1: ps.recipe_id, 2: ps.day_kind, 3: ps.suggested_quantity, 4: r.name
    fn suggestion_from_row(row: &rusqlite::Row) -> rusqlite::Result<PrepSuggestion> {
        let day_kind: String = row.get(2)?;
        Ok(PrepSuggestion {
            id: row.get(0)?,
            recipe_id: row.get(1)?,
            day_kind: if day_kind == "weekend" {
                DayKind::Weekend
            } else {
                DayKind::Weekday
            },
            suggested_quantity: row.get(3)?,
            recipe_name: row.get(4)?,
        })
    }

    pub fn set_suggestion(
        &self,
        recipe_id: &str,
        day_kind: DayKind,
        suggested_quantity: f64,
    ) -> Result<PrepSuggestion> {
        self.conn.execute(
            "INSERT INTO prep_suggestions (id, recipe_id, day_kind, suggested_quantity)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(recipe_id, day_kind) DO UPDATE SET
                 suggested_quantity = excluded.suggested_quantity",
            params![
                Uuid::new_v4().to_string(),
                recipe_id,
                day_kind.as_str(),
                suggested_quantity,
            ],
        )?;
        self.conn
            .query_row(
                "SELECT ps.id, ps.recipe_id, ps.day_kind, ps.suggested_quantity, r.name
                 FROM prep_suggestions ps
                 LEFT JOIN recipes r ON ps.recipe_id = r.id
                 WHERE ps.recipe_id = ?1 AND ps.day_kind = ?2",
                params![recipe_id, day_kind.as_str()],
                Self::suggestion_from_row,
            )
            .optional()?
            .ok_or_else(|| CoreError::not_found("Prep suggestion"))
    }

    pub fn list_suggestions(&self) -> Result<Vec<PrepSuggestion>> {
        let mut stmt = self.conn.prepare(
            "SELECT ps.id, ps.recipe_id, ps.day_kind, ps.suggested_quantity, r.name
             FROM prep_suggestions ps
             LEFT JOIN recipes r ON ps.recipe_id = r.id
             ORDER BY r.name, ps.day_kind",
        )?;
        let suggestions = stmt
            .query_map([], Self::suggestion_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(suggestions)
    }

    /// Suggested quantity per recipe for one day classification.
    pub fn suggestions_for(&self, day_kind: DayKind) -> Result<HashMap<String, f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT recipe_id, suggested_quantity FROM prep_suggestions WHERE day_kind = ?1",
        )?;
        let rows = stmt
            .query_map(params![day_kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().collect())
    }

    // --- Daily notes ---

    fn note_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyNote> {
        Ok(DailyNote {
            note_date: row.get(0)?,
            comment: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }

    pub fn get_note(&self, date: NaiveDate) -> Result<Option<DailyNote>> {
        let note = self
            .conn
            .query_row(
                "SELECT note_date, comment, updated_at FROM prep_notes WHERE note_date = ?1",
                params![date.format("%Y-%m-%d").to_string()],
                Self::note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Today's note, or the prior day's when today has none yet.
    pub fn get_note_or_previous(&self, date: NaiveDate) -> Result<Option<DailyNote>> {
        if let Some(note) = self.get_note(date)? {
            return Ok(Some(note));
        }
        self.get_note(date - Duration::days(1))
    }

    pub fn upsert_note(&self, date: NaiveDate, comment: &str) -> Result<DailyNote> {
        let now = Local::now().to_rfc3339();
        let date_str = date.format("%Y-%m-%d").to_string();
        self.conn.execute(
            "INSERT INTO prep_notes (note_date, comment, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(note_date) DO UPDATE SET
                 comment = excluded.comment,
                 updated_at = excluded.updated_at",
            params![date_str, comment, now],
        )?;
        self.get_note(date)?
            .ok_or_else(|| CoreError::not_found("Daily note"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipeIngredient;

    fn sample_stock() -> NewIngredientStock {
        NewIngredientStock {
            name: "Tomato".to_string(),
            quantity: 5.0,
            unit: "kg".to_string(),
            category: Some("Vegetables".to_string()),
            alert_level: 1.0,
        }
    }

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            name: "Tomato Soup".to_string(),
            category: Some("Soup".to_string()),
            description: None,
            ingredients: vec![
                NewRecipeIngredient {
                    name: "Tomato".to_string(),
                    quantity_per_batch: 0.5,
                    unit: "kg".to_string(),
                },
                NewRecipeIngredient {
                    name: "Onion".to_string(),
                    quantity_per_batch: 0.2,
                    unit: "kg".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_insert_and_get_ingredient() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_ingredient(&sample_stock()).unwrap();

        assert_eq!(row.name, "Tomato");
        assert_eq!(row.quantity, 5.0);
        assert_eq!(row.unit, "kg");
        assert_eq!(row.alert_level, 1.0);
        assert_eq!(row.category.as_deref(), Some("Vegetables"));

        let fetched = db.get_ingredient(&row.id).unwrap();
        assert_eq!(fetched.name, "Tomato");
    }

    #[test]
    fn test_get_missing_ingredient_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_ingredient("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_find_ingredient_by_name_is_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ingredient(&sample_stock()).unwrap();

        let found = db.find_ingredient_by_name("tomato").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().name, "Tomato");
        assert!(db.find_ingredient_by_name("Basil").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_rejected_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ingredient(&sample_stock()).unwrap();

        let mut dup = sample_stock();
        dup.name = "TOMATO".to_string();
        assert!(db.insert_ingredient(&dup).is_err());
    }

    #[test]
    fn test_adjust_ingredient_quantity() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_ingredient(&sample_stock()).unwrap();

        let after = db.adjust_ingredient_quantity(&row.id, 2.5).unwrap();
        assert_eq!(after.quantity, 7.5);
        let after = db.adjust_ingredient_quantity(&row.id, -4.0).unwrap();
        assert_eq!(after.quantity, 3.5);

        let err = db.adjust_ingredient_quantity("nope", 1.0).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_set_ingredient_quantity() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_ingredient(&sample_stock()).unwrap();

        db.set_ingredient_quantity(&row.id, 1.25).unwrap();
        assert_eq!(db.get_ingredient(&row.id).unwrap().quantity, 1.25);
    }

    #[test]
    fn test_update_ingredient_partial_and_clear_category() {
        let db = Database::open_in_memory().unwrap();
        let row = db.insert_ingredient(&sample_stock()).unwrap();

        let updated = db
            .update_ingredient(
                &row.id,
                &UpdateIngredientStock {
                    alert_level: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.alert_level, 2.0);
        assert_eq!(updated.category.as_deref(), Some("Vegetables"));

        let cleared = db
            .update_ingredient(
                &row.id,
                &UpdateIngredientStock {
                    category: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.category, None);
    }

    #[test]
    fn test_list_ingredients_by_category() {
        let db = Database::open_in_memory().unwrap();
        db.insert_ingredient(&sample_stock()).unwrap();
        let mut other = sample_stock();
        other.name = "Milk".to_string();
        other.category = Some("Dairy".to_string());
        db.insert_ingredient(&other).unwrap();

        assert_eq!(db.list_ingredients(None).unwrap().len(), 2);
        let dairy = db.list_ingredients(Some("dairy")).unwrap();
        assert_eq!(dairy.len(), 1);
        assert_eq!(dairy[0].name, "Milk");

        assert_eq!(db.list_categories().unwrap(), vec!["Dairy", "Vegetables"]);
    }

    #[test]
    fn test_insert_and_get_recipe_preserves_line_order() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        assert_eq!(recipe.name, "Tomato Soup");
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].name, "Tomato");
        assert_eq!(recipe.ingredients[1].name, "Onion");

        let found = db.find_recipe_by_name("tomato soup").unwrap();
        assert!(found.is_some());
        assert!(db.find_recipe_by_name("Stew").unwrap().is_none());
    }

    #[test]
    fn test_finished_goods_defaults_to_zero_and_adjusts() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        assert_eq!(db.get_finished_goods(&recipe.id).unwrap(), 0.0);
        assert_eq!(db.adjust_finished_goods(&recipe.id, 3.0).unwrap(), 3.0);
        assert_eq!(db.adjust_finished_goods(&recipe.id, -1.5).unwrap(), 1.5);

        db.set_finished_goods(&recipe.id, 10.0).unwrap();
        assert_eq!(db.get_finished_goods(&recipe.id).unwrap(), 10.0);
    }

    #[test]
    fn test_meal_log_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        let entry = db
            .insert_meal_log(&NewMealLogEntry {
                recipe_id: recipe.id.clone(),
                quantity: 2.0,
                date: None,
                notes: Some("first batch".to_string()),
                manual_override_servings: None,
            })
            .unwrap();
        assert_eq!(entry.quantity, 2.0);
        assert_eq!(entry.recipe_name.as_deref(), Some("Tomato Soup"));

        let updated = db
            .update_meal_log(
                &entry.id,
                &UpdateMealLogEntry {
                    quantity: Some(4.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 4.0);
        assert_eq!(updated.notes.as_deref(), Some("first batch"));

        let cleared = db
            .update_meal_log(
                &entry.id,
                &UpdateMealLogEntry {
                    notes: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(cleared.notes, None);

        assert!(db.delete_meal_log(&entry.id).unwrap());
        assert!(!db.delete_meal_log(&entry.id).unwrap());
        assert!(db.get_meal_log(&entry.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_meal_logs_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        let old = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let newer = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        for (date, quantity) in [(old, 1.0), (newer, 2.0)] {
            db.insert_meal_log(&NewMealLogEntry {
                recipe_id: recipe.id.clone(),
                quantity,
                date: Some(date),
                notes: None,
                manual_override_servings: None,
            })
            .unwrap();
        }

        let logs = db.list_meal_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].quantity, 2.0);
        assert_eq!(logs[1].quantity, 1.0);
    }

    #[test]
    fn test_consumed_on_filters_by_day() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        for (date, quantity) in [(day, 2.0), (day, 3.0), (other_day, 7.0)] {
            db.insert_meal_log(&NewMealLogEntry {
                recipe_id: recipe.id.clone(),
                quantity,
                date: Some(date),
                notes: None,
                manual_override_servings: None,
            })
            .unwrap();
        }

        let consumed = db.consumed_on(day).unwrap();
        assert_eq!(consumed.get(recipe.id.as_str()), Some(&5.0));
        let consumed = db.consumed_on(NaiveDate::from_ymd_opt(2024, 6, 6).unwrap()).unwrap();
        assert!(consumed.is_empty());
    }

    #[test]
    fn test_suggestion_upsert_overwrites() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        let first = db
            .set_suggestion(&recipe.id, DayKind::Weekday, 10.0)
            .unwrap();
        assert_eq!(first.suggested_quantity, 10.0);
        assert_eq!(first.recipe_name.as_deref(), Some("Tomato Soup"));

        let second = db
            .set_suggestion(&recipe.id, DayKind::Weekday, 6.0)
            .unwrap();
        assert_eq!(second.suggested_quantity, 6.0);

        db.set_suggestion(&recipe.id, DayKind::Weekend, 3.0).unwrap();
        assert_eq!(db.list_suggestions().unwrap().len(), 2);

        let weekday = db.suggestions_for(DayKind::Weekday).unwrap();
        assert_eq!(weekday.get(recipe.id.as_str()), Some(&6.0));
        let weekend = db.suggestions_for(DayKind::Weekend).unwrap();
        assert_eq!(weekend.get(recipe.id.as_str()), Some(&3.0));
    }

    #[test]
    fn test_note_falls_back_to_previous_day() {
        let db = Database::open_in_memory().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();

        assert!(db.get_note_or_previous(today).unwrap().is_none());

        db.upsert_note(yesterday, "thaw the beans").unwrap();
        let fallback = db.get_note_or_previous(today).unwrap().unwrap();
        assert_eq!(fallback.comment, "thaw the beans");
        assert_eq!(fallback.note_date, "2024-06-04");

        db.upsert_note(today, "roast peppers").unwrap();
        let own = db.get_note_or_previous(today).unwrap().unwrap();
        assert_eq!(own.comment, "roast peppers");
        assert_eq!(own.note_date, "2024-06-05");

        // Two days without a note in between: no fallback
        let later = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        assert!(db.get_note_or_previous(later).unwrap().is_none());
    }
}
