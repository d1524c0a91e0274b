//! Scanned-invoice ingestion: cleans recognized text line by line, extracts
//! name/quantity/unit triples, fuzzy-corrects names against known stock, and
//! commits the reviewed items to raw-ingredient rows.
//!
//! Text recognition itself lives behind [`crate::service::TextRecognizer`];
//! everything here operates on plain text and is testable without a backend.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::db::Database;
use crate::error::Result;
use crate::models::{IngredientStock, NewIngredientStock, Settings, WriteMode, DEFAULT_ALERT_LEVEL};

/// Characters OCR backends commonly hallucinate around list items.
const ARTIFACT_CHARS: &str = "=:_•■●◆★・▶→~#※-";

/// Progress of one scanned image through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Idle,
    Recognizing,
    Parsed,
    Reviewing,
    Committed,
}

/// How one parsed line relates to current stock.
///
/// `Tracked` items adjust an existing row on commit, `New` and `Unknown`
/// items create one. `New` means the fuzzy correction changed the name but
/// no row matches the result; `Unknown` means the name was left as scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Tracked,
    New,
    Unknown,
}

/// Name, quantity, and unit extracted from one cleaned line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// One recognized line after parsing and name correction, awaiting review.
#[derive(Debug, Clone, Serialize)]
pub struct OcrItem {
    /// Name as scanned, after line cleaning.
    pub name: String,
    /// Accepted fuzzy match, or `name` unchanged when nothing scored high
    /// enough.
    pub corrected_name: String,
    pub quantity: f64,
    pub unit: String,
    pub status: ItemStatus,
    /// Category for the row created on commit. Prefilled from the matched
    /// stock row for tracked items, assignable during review otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// One scan moving through `Idle -> Recognizing -> Parsed -> Reviewing ->
/// Committed`. Holds the recognized text and parsed items between steps.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSession {
    pub state: ScanState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub items: Vec<OcrItem>,
}

impl ScanSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            raw_text: None,
            items: Vec::new(),
        }
    }

    pub fn begin_recognition(&mut self) {
        self.state = ScanState::Recognizing;
    }

    /// Stores the recognized text and parses it into review items.
    pub fn finish_recognition(&mut self, text: String, known: &[IngredientStock], accept_score: f64) {
        self.items = parse_text(&text, known, accept_score);
        self.raw_text = Some(text);
        self.state = ScanState::Parsed;
    }

    pub fn begin_review(&mut self) {
        self.state = ScanState::Reviewing;
    }

    /// Assigns a category to one item under review.
    pub fn set_category(&mut self, index: usize, category: Option<String>) {
        if let Some(item) = self.items.get_mut(index) {
            item.category = category;
        }
    }

    pub fn mark_committed(&mut self) {
        self.state = ScanState::Committed;
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

// --- line cleaning and extraction ---

/// `<name> <quantity> [unit]`, e.g. "Tomato 2.5 kg".
fn name_quantity_unit() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^([a-z][a-z ]*?)\s+([\d.,]+)\s*(kg|g|ml)?$").ok())
        .as_ref()
}

/// `<count> <name> <quantity> [unit]`, e.g. "4 Tomato 2.5 kg". Receipts
/// often prefix a line-item count; it is discarded.
fn counted_name_quantity_unit() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\d+\s+([a-z][a-z ]*?)\s+([\d.,]+)\s*(kg|g|ml)?$").ok())
        .as_ref()
}

/// Extraction patterns in match order. The first pattern that matches a
/// cleaned line decides its interpretation.
fn extraction_patterns() -> [Option<&'static Regex>; 2] {
    [name_quantity_unit(), counted_name_quantity_unit()]
}

/// Replaces `0` with `o` where it touches a letter. OCR backends routinely
/// misread the letter, e.g. "Tomat0". Digits next to digits or punctuation
/// are left alone so real quantities like "2.0" and "10" survive.
fn repair_zero_confusion(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    for (i, &c) in chars.iter().enumerate() {
        let prev_letter = i > 0 && chars[i - 1].is_ascii_alphabetic();
        let next_letter = chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic());
        if c == '0' && (prev_letter || next_letter) {
            out.push('o');
        } else {
            out.push(c);
        }
    }
    out
}

/// Strips scan artifacts and anything outside letters, digits, commas,
/// periods, and spaces, then collapses whitespace runs.
fn clean_line(raw: &str) -> String {
    let repaired = repair_zero_confusion(raw);
    let mut kept = String::with_capacity(repaired.len());
    for c in repaired.chars() {
        if ARTIFACT_CHARS.contains(c) {
            continue;
        }
        if c.is_ascii_alphanumeric() || c == ',' || c == '.' || c.is_whitespace() {
            kept.push(c);
        }
    }
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts a stock line from one line of recognized text.
///
/// Returns `None` when no pattern matches, the name comes out empty, or the
/// quantity does not parse to a finite number. Commas in quantities are read
/// as decimal separators; a missing unit defaults to "kg".
#[must_use]
pub fn normalize_line(raw: &str) -> Option<ParsedLine> {
    let cleaned = clean_line(raw);
    if cleaned.is_empty() {
        return None;
    }
    for pattern in extraction_patterns().into_iter().flatten() {
        if let Some(caps) = pattern.captures(&cleaned) {
            let name = caps[1].trim().to_string();
            if name.is_empty() {
                return None;
            }
            let quantity: f64 = caps[2].replace(',', ".").parse().ok()?;
            if !quantity.is_finite() {
                return None;
            }
            let unit = caps.get(3).map_or("kg", |m| m.as_str()).to_lowercase();
            return Some(ParsedLine { name, quantity, unit });
        }
    }
    None
}

// --- name correction and classification ---

/// Fuzzy-corrects a scanned name against known stock names.
///
/// Names are compared case-insensitively with the Sørensen-Dice coefficient.
/// The best match is accepted only when its score strictly exceeds
/// `accept_score`; otherwise, and whenever the candidate or the known list
/// is empty, the candidate comes back unchanged. An accepted match returns
/// the known name in its stored casing.
#[must_use]
pub fn correct_name(candidate: &str, known_names: &[String], accept_score: f64) -> String {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || known_names.is_empty() {
        return candidate.to_string();
    }
    let needle = trimmed.to_lowercase();
    let mut best: Option<(&String, f64)> = None;
    for name in known_names {
        let score = strsim::sorensen_dice(&needle, &name.to_lowercase());
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((name, score));
        }
    }
    match best {
        Some((name, score)) if score > accept_score => name.clone(),
        _ => candidate.to_string(),
    }
}

/// Review status for a parsed name given its correction and whether a stock
/// row matches the corrected name.
#[must_use]
pub fn classify(parsed_name: &str, corrected_name: &str, has_row: bool) -> ItemStatus {
    if has_row {
        ItemStatus::Tracked
    } else if corrected_name == parsed_name {
        ItemStatus::Unknown
    } else {
        ItemStatus::New
    }
}

/// Parses recognized multi-line text into review items, correcting names
/// against the given stock rows. Lines that fail extraction are dropped.
#[must_use]
pub fn parse_text(text: &str, known: &[IngredientStock], accept_score: f64) -> Vec<OcrItem> {
    let known_names: Vec<String> = known.iter().map(|row| row.name.clone()).collect();
    text.lines()
        .filter_map(normalize_line)
        .map(|parsed| {
            let corrected = correct_name(&parsed.name, &known_names, accept_score);
            let existing = known
                .iter()
                .find(|row| row.name.eq_ignore_ascii_case(&corrected));
            let status = classify(&parsed.name, &corrected, existing.is_some());
            OcrItem {
                category: existing.and_then(|row| row.category.clone()),
                name: parsed.name,
                corrected_name: corrected,
                quantity: parsed.quantity,
                unit: parsed.unit,
                status,
            }
        })
        .collect()
}

// --- commit ---

/// Summary of one commit pass over reviewed items.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitSummary {
    pub items_committed: usize,
    pub rows_updated: usize,
    pub rows_created: usize,
    pub failures: Vec<String>,
}

struct PendingName {
    /// Corrected name as reviewed; first encounter wins.
    display_name: String,
    quantity: f64,
    unit: String,
    category: Option<String>,
    items: usize,
}

enum Flushed {
    Updated,
    Created,
}

/// Commits reviewed items to raw stock.
///
/// Items are first folded into per-name totals keyed by the lowercased
/// corrected name, so repeated names within one batch accumulate against the
/// same row instead of overwriting each other. Each total is then flushed
/// with a single write: an adjustment when a row already exists, an insert
/// otherwise. A failed flush is recorded in the summary and the remaining
/// names still commit.
pub fn commit_items(db: &Database, settings: &Settings, items: &[OcrItem]) -> CommitSummary {
    let mut order: Vec<String> = Vec::new();
    let mut pending: HashMap<String, PendingName> = HashMap::new();

    for item in items {
        let key = item.corrected_name.to_lowercase();
        if let Some(entry) = pending.get_mut(&key) {
            entry.quantity += item.quantity;
            entry.items += 1;
            if entry.category.is_none() {
                entry.category.clone_from(&item.category);
            }
        } else {
            order.push(key.clone());
            pending.insert(
                key,
                PendingName {
                    display_name: item.corrected_name.clone(),
                    quantity: item.quantity,
                    unit: item.unit.clone(),
                    category: item.category.clone(),
                    items: 1,
                },
            );
        }
    }

    let mut summary = CommitSummary::default();
    for key in order {
        let Some(entry) = pending.get(&key) else {
            continue;
        };
        match flush_name(db, settings, entry) {
            Ok(Flushed::Updated) => {
                summary.rows_updated += 1;
                summary.items_committed += entry.items;
            }
            Ok(Flushed::Created) => {
                summary.rows_created += 1;
                summary.items_committed += entry.items;
            }
            Err(e) => summary.failures.push(format!("{}: {e}", entry.display_name)),
        }
    }
    summary
}

fn flush_name(db: &Database, settings: &Settings, entry: &PendingName) -> Result<Flushed> {
    if let Some(row) = db.find_ingredient_by_name(&entry.display_name)? {
        match settings.write_mode {
            WriteMode::Atomic => {
                db.adjust_ingredient_quantity(&row.id, entry.quantity)?;
            }
            WriteMode::ReadModifyWrite => {
                db.set_ingredient_quantity(&row.id, row.quantity + entry.quantity)?;
            }
        }
        Ok(Flushed::Updated)
    } else {
        db.insert_ingredient(&NewIngredientStock {
            name: entry.display_name.clone(),
            quantity: entry.quantity,
            unit: entry.unit.clone(),
            category: entry.category.clone(),
            alert_level: DEFAULT_ALERT_LEVEL,
        })?;
        Ok(Flushed::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_row(name: &str, quantity: f64, category: Option<&str>) -> IngredientStock {
        IngredientStock {
            id: format!("id-{name}"),
            name: name.to_string(),
            quantity,
            unit: "kg".to_string(),
            alert_level: DEFAULT_ALERT_LEVEL,
            category: category.map(String::from),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_normalize_line_repairs_zero_and_extracts() {
        let parsed = normalize_line("Tomat0 2.0 kg").unwrap();
        assert_eq!(parsed.name, "Tomato");
        assert_eq!(parsed.quantity, 2.0);
        assert_eq!(parsed.unit, "kg");
    }

    #[test]
    fn test_normalize_line_keeps_digit_adjacent_zeros() {
        let parsed = normalize_line("Flour 10 kg").unwrap();
        assert_eq!(parsed.name, "Flour");
        assert_eq!(parsed.quantity, 10.0);
    }

    #[test]
    fn test_normalize_line_discards_leading_count() {
        let parsed = normalize_line("4 Tomato 2.0 kg").unwrap();
        assert_eq!(parsed.name, "Tomato");
        assert_eq!(parsed.quantity, 2.0);
        assert_eq!(parsed.unit, "kg");
    }

    #[test]
    fn test_normalize_line_strips_artifacts_and_collapses_spaces() {
        let parsed = normalize_line("• Olive  Oil = 1,5   ml ▶").unwrap();
        assert_eq!(parsed.name, "Olive Oil");
        assert_eq!(parsed.quantity, 1.5);
        assert_eq!(parsed.unit, "ml");
    }

    #[test]
    fn test_normalize_line_defaults_unit_and_lowercases() {
        assert_eq!(normalize_line("Rice 3").unwrap().unit, "kg");
        assert_eq!(normalize_line("Rice 3 KG").unwrap().unit, "kg");
    }

    #[test]
    fn test_normalize_line_rejects_garbage() {
        assert!(normalize_line("???").is_none());
        assert!(normalize_line("").is_none());
        assert!(normalize_line("Tomato").is_none());
        assert!(normalize_line("Tomato abc kg").is_none());
        assert!(normalize_line("Tomato 2.5.3 kg").is_none());
    }

    #[test]
    fn test_correct_name_accepts_close_match_with_stored_casing() {
        let known = vec!["Tomato".to_string(), "Onion".to_string()];
        assert_eq!(correct_name("tomatoe", &known, 0.75), "Tomato");
        assert_eq!(correct_name("TOMATO", &known, 0.75), "Tomato");
    }

    #[test]
    fn test_correct_name_fails_closed() {
        let known = vec!["Tomato".to_string()];
        assert_eq!(correct_name("Bread", &known, 0.75), "Bread");
        assert_eq!(correct_name("tomatoe", &[], 0.75), "tomatoe");
        assert_eq!(correct_name("   ", &known, 0.75), "   ");
    }

    #[test]
    fn test_classify_covers_all_statuses() {
        assert_eq!(classify("tomatoe", "Tomato", true), ItemStatus::Tracked);
        assert_eq!(classify("tomatoe", "Tomato", false), ItemStatus::New);
        assert_eq!(classify("Bread", "Bread", false), ItemStatus::Unknown);
    }

    #[test]
    fn test_parse_text_classifies_against_stock() {
        let known = vec![stock_row("Tomato", 5.0, Some("Vegetables"))];
        let items = parse_text("Tomat0 2.0 kg\n???\nBread 1 kg", &known, 0.75);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].corrected_name, "Tomato");
        assert_eq!(items[0].status, ItemStatus::Tracked);
        assert_eq!(items[0].category.as_deref(), Some("Vegetables"));
        assert_eq!(items[1].corrected_name, "Bread");
        assert_eq!(items[1].status, ItemStatus::Unknown);
        assert!(items[1].category.is_none());
    }

    #[test]
    fn test_commit_accumulates_repeated_names_into_one_row() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let items = parse_text("Onion 1 kg\nonion 2 kg", &[], 0.75);
        assert_eq!(items.len(), 2);

        let summary = commit_items(&db, &settings, &items);
        assert_eq!(summary.rows_created, 1);
        assert_eq!(summary.rows_updated, 0);
        assert_eq!(summary.items_committed, 2);
        assert!(summary.failures.is_empty());

        let row = db.find_ingredient_by_name("Onion").unwrap().unwrap();
        assert_eq!(row.quantity, 3.0);
        assert_eq!(db.list_ingredients(None).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_adjusts_existing_rows_in_both_write_modes() {
        for write_mode in [WriteMode::Atomic, WriteMode::ReadModifyWrite] {
            let db = Database::open_in_memory().unwrap();
            let settings = Settings {
                write_mode,
                ..Settings::default()
            };
            db.insert_ingredient(&NewIngredientStock {
                name: "Tomato".to_string(),
                quantity: 5.0,
                unit: "kg".to_string(),
                category: None,
                alert_level: DEFAULT_ALERT_LEVEL,
            })
            .unwrap();

            let known = db.list_ingredients(None).unwrap();
            let items = parse_text("Tomat0 2.0 kg", &known, 0.75);
            let summary = commit_items(&db, &settings, &items);
            assert_eq!(summary.rows_updated, 1);
            assert_eq!(summary.rows_created, 0);

            let row = db.find_ingredient_by_name("Tomato").unwrap().unwrap();
            assert_eq!(row.quantity, 7.0);
        }
    }

    #[test]
    fn test_commit_creates_unknown_items_with_review_category() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let mut items = parse_text("Saffron 0.2 g", &[], 0.75);
        items[0].category = Some("Spices".to_string());

        let summary = commit_items(&db, &settings, &items);
        assert_eq!(summary.rows_created, 1);

        let row = db.find_ingredient_by_name("Saffron").unwrap().unwrap();
        assert_eq!(row.quantity, 0.2);
        assert_eq!(row.unit, "g");
        assert_eq!(row.category.as_deref(), Some("Spices"));
        assert_eq!(row.alert_level, DEFAULT_ALERT_LEVEL);
    }

    #[test]
    fn test_scan_session_walks_the_pipeline() {
        let mut session = ScanSession::new();
        assert_eq!(session.state, ScanState::Idle);

        session.begin_recognition();
        assert_eq!(session.state, ScanState::Recognizing);

        session.finish_recognition("Tomato 2 kg".to_string(), &[], 0.75);
        assert_eq!(session.state, ScanState::Parsed);
        assert_eq!(session.items.len(), 1);
        assert_eq!(session.raw_text.as_deref(), Some("Tomato 2 kg"));

        session.begin_review();
        session.set_category(0, Some("Vegetables".to_string()));
        assert_eq!(session.items[0].category.as_deref(), Some("Vegetables"));

        session.mark_committed();
        assert_eq!(session.state, ScanState::Committed);
    }
}
