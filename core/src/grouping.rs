//! Display grouping of ledger rows by recipe.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::MealLogEntry;

/// One display row merging every ledger entry of a recipe.
///
/// `id` and `date` come from the first member encountered, so edits and
/// deletes issued from a grouped view land on that representative row.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedMealLog {
    pub id: String,
    pub recipe_name: String,
    pub date: String,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_override_servings: Option<f64>,
    pub member_ids: Vec<String>,
}

struct GroupAcc {
    id: String,
    recipe_name: String,
    date: String,
    quantity: f64,
    manual_override_servings: Option<f64>,
    notes_parts: Vec<String>,
    member_ids: Vec<String>,
}

fn display_name(log: &MealLogEntry) -> &str {
    log.recipe_name.as_deref().unwrap_or("Unknown")
}

/// Case-insensitive recipe-name substring filter, order preserving.
#[must_use]
pub fn filter_by_recipe_name(logs: Vec<MealLogEntry>, search: &str) -> Vec<MealLogEntry> {
    let needle = search.to_lowercase();
    logs.into_iter()
        .filter(|log| display_name(log).to_lowercase().contains(&needle))
        .collect()
}

/// Groups ledger rows by recipe display name, in first-encounter order.
///
/// The input is expected newest first and member order is kept, so each
/// group's representative id and date are those of its newest row. Quantities
/// are summed; non-empty notes are joined with newlines.
#[must_use]
pub fn group_by_recipe_name(logs: &[MealLogEntry]) -> Vec<GroupedMealLog> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupAcc> = Vec::new();

    for log in logs {
        let name = display_name(log).to_string();
        if let Some(&i) = index.get(&name) {
            let group = &mut groups[i];
            group.quantity += log.quantity;
            if let Some(notes) = &log.notes {
                if !notes.is_empty() {
                    group.notes_parts.push(notes.clone());
                }
            }
            group.member_ids.push(log.id.clone());
        } else {
            index.insert(name.clone(), groups.len());
            groups.push(GroupAcc {
                id: log.id.clone(),
                recipe_name: name,
                date: log.date.clone(),
                quantity: log.quantity,
                manual_override_servings: log.manual_override_servings,
                notes_parts: log
                    .notes
                    .iter()
                    .filter(|notes| !notes.is_empty())
                    .cloned()
                    .collect(),
                member_ids: vec![log.id.clone()],
            });
        }
    }

    groups
        .into_iter()
        .map(|group| GroupedMealLog {
            id: group.id,
            recipe_name: group.recipe_name,
            date: group.date,
            quantity: group.quantity,
            notes: if group.notes_parts.is_empty() {
                None
            } else {
                Some(group.notes_parts.join("\n"))
            },
            manual_override_servings: group.manual_override_servings,
            member_ids: group.member_ids,
        })
        .collect()
}
