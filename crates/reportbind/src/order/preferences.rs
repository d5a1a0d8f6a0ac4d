//! The persisted team/member ordering document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::archive::team::{normalize_team_key, UNGROUPED_TEAM_KEY};

/// Operator-learned ordering of teams and of members within each team.
///
/// Serialized as `{"team_sequence": [...], "member_sequences": {...}}`.
/// The member map is an [`IndexMap`] so the on-disk key order is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPreferences {
    #[serde(default)]
    pub team_sequence: Vec<String>,
    #[serde(default)]
    pub member_sequences: IndexMap<String, Vec<String>>,
}

impl OrderPreferences {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses any JSON document into preferences, tolerantly.
    ///
    /// Accepts the current object shape, the legacy flat string list, and
    /// degrades to empty preferences for anything else. Never errors.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(_) => Self::from_object(value),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let names: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                Self::from_legacy_list(&names)
            }
            _ => Self::empty(),
        }
    }

    /// Field-by-field parse of the current object shape. Non-string and
    /// non-list values are dropped silently; keys are normalized and
    /// deduplicated first-occurrence-wins.
    fn from_object(value: &Value) -> Self {
        let mut team_sequence: Vec<String> = Vec::new();
        if let Some(raw_sequence) = value.get("team_sequence").and_then(Value::as_array) {
            for item in raw_sequence {
                let Some(name) = item.as_str() else { continue };
                let key = normalize_team_key(Some(name));
                if !team_sequence.contains(&key) {
                    team_sequence.push(key);
                }
            }
        }

        let mut member_sequences: IndexMap<String, Vec<String>> = IndexMap::new();
        if let Some(raw_members) = value.get("member_sequences").and_then(Value::as_object) {
            for (raw_key, raw_value) in raw_members {
                let Some(raw_list) = raw_value.as_array() else {
                    continue;
                };
                let members = normalize_member_names(
                    raw_list.iter().filter_map(Value::as_str),
                );
                if members.is_empty() {
                    continue;
                }
                let team_key = normalize_team_key(Some(raw_key));
                let existing = member_sequences.entry(team_key).or_default();
                for member in members {
                    if !existing.contains(&member) {
                        existing.push(member);
                    }
                }
            }
        }

        // The ungrouped bucket's membership is regenerated per batch; keep
        // it in the team sequence only while it actually has members.
        if !member_sequences.contains_key(UNGROUPED_TEAM_KEY) {
            team_sequence.retain(|key| key != UNGROUPED_TEAM_KEY);
        }

        Self {
            team_sequence,
            member_sequences,
        }
    }

    /// Upgrades the legacy flat list of `"Person"` / `"[Team] Person"`
    /// strings into the current shape, preserving first-seen team order.
    pub fn from_legacy_list(items: &[&str]) -> Self {
        let mut team_sequence: Vec<String> = Vec::new();
        let mut member_sequences: IndexMap<String, Vec<String>> = IndexMap::new();

        for name in items {
            let (team_key, member) = match name.strip_prefix('[') {
                Some(rest) if rest.contains(']') => {
                    let (team_name, remainder) = rest.split_once(']').unwrap();
                    let key = if team_name.is_empty() {
                        UNGROUPED_TEAM_KEY
                    } else {
                        team_name
                    };
                    (normalize_team_key(Some(key)), remainder.trim().to_string())
                }
                _ => (UNGROUPED_TEAM_KEY.to_string(), name.to_string()),
            };

            if !team_sequence.contains(&team_key) {
                team_sequence.push(team_key.clone());
            }
            let members = member_sequences.entry(team_key).or_default();
            if !member.is_empty() && !members.contains(&member) {
                members.push(member);
            }
        }

        Self {
            team_sequence,
            member_sequences,
        }
    }
}

/// Trims, drops empties, deduplicates preserving first occurrence.
pub fn normalize_member_names<'a, I>(members: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cleaned: Vec<String> = Vec::new();
    for member in members {
        let stripped = member.trim();
        if !stripped.is_empty() && !cleaned.iter().any(|m| m == stripped) {
            cleaned.push(stripped.to_string());
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_object_shape() {
        let value = json!({
            "team_sequence": ["R班", "N班", "R班"],
            "member_sequences": {
                "R班": ["Tanaka", "Suzuki", "Tanaka"],
                "N班": ["Yamada"],
            }
        });
        let prefs = OrderPreferences::from_value(&value);
        assert_eq!(prefs.team_sequence, vec!["R班", "N班"]);
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["Tanaka".to_string(), "Suzuki".to_string()]
        );
        assert_eq!(prefs.member_sequences["N班"], vec!["Yamada".to_string()]);
    }

    #[test]
    fn test_from_value_drops_malformed_fields() {
        let value = json!({
            "team_sequence": ["R班", 42, null],
            "member_sequences": {
                "R班": ["Tanaka", 3, ""],
                "N班": "not-a-list",
                "S班": [],
            }
        });
        let prefs = OrderPreferences::from_value(&value);
        assert_eq!(prefs.team_sequence, vec!["R班"]);
        assert_eq!(prefs.member_sequences.len(), 1);
        assert_eq!(prefs.member_sequences["R班"], vec!["Tanaka".to_string()]);
    }

    #[test]
    fn test_from_value_garbage_is_empty() {
        assert_eq!(OrderPreferences::from_value(&json!(42)), OrderPreferences::empty());
        assert_eq!(
            OrderPreferences::from_value(&json!(["a", 1])),
            OrderPreferences::empty()
        );
        assert_eq!(OrderPreferences::from_value(&json!(null)), OrderPreferences::empty());
    }

    #[test]
    fn test_ungrouped_pruned_without_members() {
        let value = json!({
            "team_sequence": ["R班", UNGROUPED_TEAM_KEY],
            "member_sequences": { "R班": ["Tanaka"] }
        });
        let prefs = OrderPreferences::from_value(&value);
        assert_eq!(prefs.team_sequence, vec!["R班"]);
    }

    #[test]
    fn test_ungrouped_kept_with_members() {
        let value = json!({
            "team_sequence": [UNGROUPED_TEAM_KEY],
            "member_sequences": { "__ungrouped__": ["Tanaka"] }
        });
        let prefs = OrderPreferences::from_value(&value);
        assert_eq!(prefs.team_sequence, vec![UNGROUPED_TEAM_KEY]);
    }

    #[test]
    fn test_from_legacy_list() {
        let prefs =
            OrderPreferences::from_legacy_list(&["[R班] Tanaka", "[R班] Suzuki", "Solo", "[N班] Yamada"]);
        assert_eq!(
            prefs.team_sequence,
            vec!["R班".to_string(), UNGROUPED_TEAM_KEY.to_string(), "N班".to_string()]
        );
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["Tanaka".to_string(), "Suzuki".to_string()]
        );
        assert_eq!(
            prefs.member_sequences[UNGROUPED_TEAM_KEY],
            vec!["Solo".to_string()]
        );
        assert_eq!(prefs.member_sequences["N班"], vec!["Yamada".to_string()]);
    }

    #[test]
    fn test_legacy_empty_team_brackets() {
        let prefs = OrderPreferences::from_legacy_list(&["[] Nameless"]);
        assert_eq!(prefs.team_sequence, vec![UNGROUPED_TEAM_KEY.to_string()]);
        assert_eq!(
            prefs.member_sequences[UNGROUPED_TEAM_KEY],
            vec!["Nameless".to_string()]
        );
    }

    #[test]
    fn test_normalize_member_names() {
        assert_eq!(
            normalize_member_names(vec![" Tanaka ", "", "Suzuki", "Tanaka"]),
            vec!["Tanaka".to_string(), "Suzuki".to_string()]
        );
    }
}
