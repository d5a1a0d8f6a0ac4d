//! Archive analysis: team inference and entry building.

pub mod entries;
pub mod team;

pub use entries::{apply_team_prefixes, extract_archive, extract_entries, Entry};
pub use team::{
    infer_team_level, normalize_team_key, team_display_label, UNGROUPED_TEAM_KEY,
    UNGROUPED_TEAM_LABEL,
};
