//! The layout engine: deterministic initial grouping and ordering of a
//! fresh batch of entries against the persisted preferences.

use std::collections::HashMap;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::archive::team::{normalize_team_key, team_display_label};
use crate::archive::Entry;
use crate::naming::normalize_person_token;
use crate::order::store::OrderStore;

/// One ordered block of the initial layout.
#[derive(Debug, Clone)]
pub struct TeamLayout {
    pub key: String,
    pub label: String,
    pub entries: Vec<Entry>,
}

impl OrderStore {
    /// Computes the initial grouping and ordering for a fresh batch.
    ///
    /// Teams with a learned preference come first in preference order;
    /// teams new to the store follow in first-appearance order, so nothing
    /// silently disappears. Within each team entries are sorted by the
    /// member-preference rule: matched members in preference order, then
    /// unmatched entries alphabetically. Fully deterministic for identical
    /// input and preference state.
    pub fn initial_layout(&self, entries: Vec<Entry>) -> Vec<TeamLayout> {
        let preferences = self.load_preferences();

        let mut team_map: IndexMap<String, Vec<Entry>> = IndexMap::new();
        for entry in entries {
            let team_key = normalize_team_key(entry.team_name.as_deref());
            team_map.entry(team_key).or_default().push(entry);
        }

        let mut team_sequence: Vec<String> = Vec::new();
        for team_key in &preferences.team_sequence {
            if team_map.contains_key(team_key) && !team_sequence.contains(team_key) {
                team_sequence.push(team_key.clone());
            }
        }
        for team_key in team_map.keys() {
            if !team_sequence.contains(team_key) {
                team_sequence.push(team_key.clone());
            }
        }

        team_sequence
            .into_iter()
            .map(|team_key| {
                let items = team_map.shift_remove(&team_key).unwrap_or_default();
                let member_order = preferences
                    .member_sequences
                    .get(&team_key)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                TeamLayout {
                    label: team_display_label(&team_key),
                    entries: sort_team_entries(items, member_order),
                    key: team_key,
                }
            })
            .collect()
    }
}

/// Member-preference sort: entries matching the preferred member list rank
/// by their preferred index, everything else falls back to a stable
/// alphabetical position.
pub fn sort_team_entries(mut items: Vec<Entry>, member_order: &[String]) -> Vec<Entry> {
    if items.is_empty() {
        return items;
    }

    // Alphabetical rank is unique per entry, which makes the fallback
    // deterministic even across identical display names.
    let mut alphabetical: Vec<(Uuid, String)> = items
        .iter()
        .map(|entry| (entry.identifier, entry.display_name.to_lowercase()))
        .collect();
    alphabetical.sort_by(|a, b| a.1.cmp(&b.1));
    let fallback_positions: HashMap<Uuid, usize> = alphabetical
        .into_iter()
        .enumerate()
        .map(|(index, (identifier, _))| (identifier, index))
        .collect();

    items.sort_by_key(|entry| {
        match find_member_order_index(member_order, &entry.persons) {
            Some(matched_index) => (0, matched_index),
            None => (1, fallback_positions[&entry.identifier]),
        }
    });
    items
}

/// Finds the best preferred-member rank for an entry's person tokens.
///
/// Comparison is on normalized tokens; equal, containing, or contained
/// tokens count as a match. Each person takes the first preferred name it
/// matches; across persons the smallest index wins, and index 0
/// short-circuits.
pub fn find_member_order_index(member_order: &[String], persons: &[String]) -> Option<usize> {
    if member_order.is_empty() || persons.is_empty() {
        return None;
    }

    let normalized_order: Vec<(String, usize)> = member_order
        .iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let normalized = normalize_person_token(name);
            (!normalized.is_empty()).then_some((normalized, index))
        })
        .collect();

    if normalized_order.is_empty() {
        return None;
    }

    let mut best_index: Option<usize> = None;
    for person in persons {
        let normalized_person = normalize_person_token(person);
        if normalized_person.is_empty() {
            continue;
        }
        for (normalized_name, order_index) in &normalized_order {
            if normalized_person == *normalized_name
                || normalized_name.contains(&normalized_person)
                || normalized_person.contains(normalized_name)
            {
                if best_index.is_none_or(|best| *order_index < best) {
                    best_index = Some(*order_index);
                }
                if best_index == Some(0) {
                    return best_index;
                }
                break;
            }
        }
    }

    best_index
}
