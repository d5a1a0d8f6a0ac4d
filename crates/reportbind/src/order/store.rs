//! Mutex-serialized persistence for order preferences.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;

use crate::archive::team::normalize_team_key;
use crate::archive::Entry;
use crate::error::PreferenceStoreError;
use crate::order::preferences::{normalize_member_names, OrderPreferences};

/// Owns the single preference JSON file.
///
/// Loading is fail-soft (missing or malformed files become empty
/// preferences); saving and deleting are fail-loud, since silently losing
/// an operator's preference is worse than a visible error. Every
/// read-modify-write runs under one lock so concurrent saves cannot lose
/// updates; plain loads take an unlocked snapshot.
pub struct OrderStore {
    storage_file: PathBuf,
    lock: Mutex<()>,
}

impl OrderStore {
    pub fn new<P: Into<PathBuf>>(storage_file: P) -> Self {
        Self {
            storage_file: storage_file.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn storage_file(&self) -> &Path {
        &self.storage_file
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Order store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Reads the current preferences. Never errors: a missing file or
    /// malformed JSON yields empty preferences.
    pub fn load_preferences(&self) -> OrderPreferences {
        let Ok(content) = std::fs::read_to_string(&self.storage_file) else {
            return OrderPreferences::empty();
        };
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) => OrderPreferences::from_value(&value),
            Err(_) => OrderPreferences::empty(),
        }
    }

    fn write_preferences(&self, preferences: &OrderPreferences) -> Result<(), PreferenceStoreError> {
        if let Some(parent) = self.storage_file.parent() {
            std::fs::create_dir_all(parent).map_err(|source| {
                PreferenceStoreError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }
        let payload = serde_json::to_string_pretty(preferences)?;
        std::fs::write(&self.storage_file, payload).map_err(|source| {
            PreferenceStoreError::WriteFile {
                path: self.storage_file.clone(),
                source,
            }
        })
    }

    /// Upserts a team's member ordering. An empty member list removes the
    /// team from both structures.
    pub fn save_member_sequence(
        &self,
        team_key: &str,
        members: &[String],
    ) -> Result<(), PreferenceStoreError> {
        let normalized_team = normalize_team_key(Some(team_key));
        let cleaned_members = normalize_member_names(members.iter().map(String::as_str));

        let _guard = self.guard();
        let mut preferences = self.load_preferences();
        if cleaned_members.is_empty() {
            preferences.member_sequences.shift_remove(&normalized_team);
            preferences.team_sequence.retain(|key| key != &normalized_team);
        } else {
            if !preferences.team_sequence.contains(&normalized_team) {
                preferences.team_sequence.push(normalized_team.clone());
            }
            preferences
                .member_sequences
                .insert(normalized_team, cleaned_members);
        }
        self.write_preferences(&preferences)
    }

    /// Removes a team from both structures.
    pub fn delete_member_sequence(&self, team_key: &str) -> Result<(), PreferenceStoreError> {
        let normalized_team = normalize_team_key(Some(team_key));

        let _guard = self.guard();
        let mut preferences = self.load_preferences();
        preferences.member_sequences.shift_remove(&normalized_team);
        preferences.team_sequence.retain(|key| key != &normalized_team);
        self.write_preferences(&preferences)
    }

    /// Learns from a completed job's final order: teams and members observed
    /// in the chosen order come first, nothing previously known is dropped.
    ///
    /// Only entries carrying both a team and author tokens contribute, so a
    /// deleted ungrouped bucket is never resurrected by this merge.
    pub fn merge_from_final_order(
        &self,
        ordered_entries: &[Entry],
    ) -> Result<(), PreferenceStoreError> {
        let mut fresh_teams: Vec<String> = Vec::new();
        let mut fresh_members: IndexMap<String, Vec<String>> = IndexMap::new();

        for entry in ordered_entries {
            let Some(team_name) = entry.team_name.as_deref() else {
                continue;
            };
            if team_name.trim().is_empty() || entry.persons.is_empty() {
                continue;
            }
            let team_key = normalize_team_key(Some(team_name));
            if !fresh_teams.contains(&team_key) {
                fresh_teams.push(team_key.clone());
            }
            let members = fresh_members.entry(team_key).or_default();
            for person in &entry.persons {
                let person = person.trim();
                if !person.is_empty() && !members.iter().any(|m| m == person) {
                    members.push(person.to_string());
                }
            }
        }

        if fresh_teams.is_empty() {
            return Ok(());
        }

        let _guard = self.guard();
        let existing = self.load_preferences();

        let mut team_sequence = fresh_teams.clone();
        for key in &existing.team_sequence {
            if !team_sequence.contains(key) {
                team_sequence.push(key.clone());
            }
        }

        let mut member_sequences: IndexMap<String, Vec<String>> = IndexMap::new();
        for (team_key, new_members) in &fresh_members {
            let mut merged = new_members.clone();
            if let Some(old_members) = existing.member_sequences.get(team_key) {
                for member in old_members {
                    if !merged.contains(member) {
                        merged.push(member.clone());
                    }
                }
            }
            member_sequences.insert(team_key.clone(), merged);
        }
        for (team_key, old_members) in &existing.member_sequences {
            if !member_sequences.contains_key(team_key) {
                member_sequences.insert(team_key.clone(), old_members.clone());
            }
        }

        self.write_preferences(&OrderPreferences {
            team_sequence,
            member_sequences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::entries::test_entry;
    use crate::archive::UNGROUPED_TEAM_KEY;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> OrderStore {
        OrderStore::new(temp.path().join("order.json"))
    }

    fn members(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.load_preferences(), OrderPreferences::empty());
    }

    #[test]
    fn test_malformed_json_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        std::fs::write(store.storage_file(), "{not json").unwrap();
        assert_eq!(store.load_preferences(), OrderPreferences::empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store
            .save_member_sequence("R班", &members(&["Tanaka", "Suzuki"]))
            .unwrap();

        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["R班"]);
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["Tanaka".to_string(), "Suzuki".to_string()]
        );
    }

    #[test]
    fn test_save_empty_members_removes_team() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.save_member_sequence("R班", &members(&["Tanaka"])).unwrap();
        store.save_member_sequence("R班", &[]).unwrap();

        let prefs = store.load_preferences();
        assert!(prefs.team_sequence.is_empty());
        assert!(prefs.member_sequences.is_empty());
    }

    #[test]
    fn test_delete_member_sequence() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.save_member_sequence("R班", &members(&["Tanaka"])).unwrap();
        store.save_member_sequence("N班", &members(&["Yamada"])).unwrap();
        store.delete_member_sequence("R班").unwrap();

        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["N班"]);
        assert!(!prefs.member_sequences.contains_key("R班"));
    }

    #[test]
    fn test_legacy_list_upgraded_on_save() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        std::fs::write(
            store.storage_file(),
            r#"["[R班] Tanaka", "[N班] Yamada"]"#,
        )
        .unwrap();

        store.save_member_sequence("S班", &members(&["Sato"])).unwrap();

        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["R班", "N班", "S班"]);
        assert_eq!(prefs.member_sequences["R班"], vec!["Tanaka".to_string()]);
        assert_eq!(prefs.member_sequences["N班"], vec!["Yamada".to_string()]);
        assert_eq!(prefs.member_sequences["S班"], vec!["Sato".to_string()]);
    }

    #[test]
    fn test_merge_from_final_order_new_store() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let entries = vec![
            test_entry("第3回報告書 田中.docx", Some("R班")),
            test_entry("第3回報告書 鈴木.docx", Some("R班")),
            test_entry("第3回報告書 山田.docx", Some("N班")),
        ];
        store.merge_from_final_order(&entries).unwrap();

        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["R班", "N班"]);
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["田中".to_string(), "鈴木".to_string()]
        );
        assert_eq!(prefs.member_sequences["N班"], vec!["山田".to_string()]);
    }

    #[test]
    fn test_merge_is_additive_and_order_biasing() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store
            .save_member_sequence("R班", &members(&["Suzuki", "Tanaka"]))
            .unwrap();
        store.save_member_sequence("S班", &members(&["Sato"])).unwrap();

        // The operator put 田中 first this time and introduced N班.
        let entries = vec![
            test_entry("第3回報告書 田中.docx", Some("R班")),
            test_entry("第3回報告書 山田.docx", Some("N班")),
        ];
        store.merge_from_final_order(&entries).unwrap();

        let prefs = store.load_preferences();
        // New observation first, known teams retained.
        assert_eq!(prefs.team_sequence, vec!["R班", "N班", "S班"]);
        // 田中 promoted, Suzuki and Tanaka kept.
        assert_eq!(
            prefs.member_sequences["R班"],
            vec!["田中".to_string(), "Suzuki".to_string(), "Tanaka".to_string()]
        );
        assert_eq!(prefs.member_sequences["S班"], vec!["Sato".to_string()]);
    }

    #[test]
    fn test_merge_ignores_entries_without_team_or_persons() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        let entries = vec![
            test_entry("第3回報告書 田中.docx", None),
            test_entry("田中 報告書.docx", Some("R班")), // no persons after marker
        ];
        store.merge_from_final_order(&entries).unwrap();

        assert_eq!(store.load_preferences(), OrderPreferences::empty());
    }

    #[test]
    fn test_deleted_ungrouped_stays_deleted_after_merge() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store
            .save_member_sequence(UNGROUPED_TEAM_KEY, &members(&["Solo"]))
            .unwrap();
        store.delete_member_sequence(UNGROUPED_TEAM_KEY).unwrap();

        let entries = vec![test_entry("第3回報告書 田中.docx", Some("R班"))];
        store.merge_from_final_order(&entries).unwrap();

        let prefs = store.load_preferences();
        assert_eq!(prefs.team_sequence, vec!["R班"]);
        assert!(!prefs.member_sequences.contains_key(UNGROUPED_TEAM_KEY));
    }

    #[test]
    fn test_stable_key_order_on_disk() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save_member_sequence("Z班", &members(&["Zeta"])).unwrap();
        store.save_member_sequence("A班", &members(&["Alpha"])).unwrap();

        let content = std::fs::read_to_string(store.storage_file()).unwrap();
        let z_pos = content.find("Z班").unwrap();
        let a_pos = content.find("A班").unwrap();
        assert!(z_pos < a_pos, "insertion order should be preserved on disk");
    }
}
