//! Team identity: key normalization and directory-level inference.

/// Reserved grouping key for entries without a team. Distinct from anything
/// a user would type as a team name.
pub const UNGROUPED_TEAM_KEY: &str = "__ungrouped__";

/// Human-facing label for the ungrouped key.
pub const UNGROUPED_TEAM_LABEL: &str = "班なし";

/// Returns a consistent key for grouping teams.
///
/// Missing, empty, and the display label of the ungrouped bucket all
/// collapse to the sentinel; anything else is trimmed with case preserved.
/// Idempotent.
pub fn normalize_team_key(value: Option<&str>) -> String {
    let Some(value) = value else {
        return UNGROUPED_TEAM_KEY.to_string();
    };
    let candidate = value.trim();
    if candidate.is_empty()
        || candidate == UNGROUPED_TEAM_KEY
        || candidate == UNGROUPED_TEAM_LABEL
    {
        return UNGROUPED_TEAM_KEY.to_string();
    }
    candidate.to_string()
}

/// Display label for a team key.
pub fn team_display_label(team_key: &str) -> String {
    if team_key == UNGROUPED_TEAM_KEY {
        UNGROUPED_TEAM_LABEL.to_string()
    } else {
        team_key.to_string()
    }
}

/// Finds the directory level that partitions the archive into teams.
///
/// `paths` are archive-internal POSIX paths of the Word-document members.
/// The first level where more than one distinct directory name appears is
/// assumed to be the team level; `None` means the archive has a uniform
/// (or flat) structure and the team must come from the archive's own name.
pub fn infer_team_level(paths: &[String]) -> Option<usize> {
    let directories: Vec<Vec<&str>> = paths
        .iter()
        .map(|path| {
            let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
            parts.pop();
            parts
        })
        .collect();

    let max_depth = directories.iter().map(Vec::len).max().unwrap_or(0);
    for level in 0..max_depth {
        let mut names: Vec<&str> = Vec::new();
        for parts in &directories {
            if let Some(name) = parts.get(level) {
                if !names.contains(name) {
                    names.push(name);
                }
            }
        }
        if names.len() > 1 {
            return Some(level);
        }
    }
    None
}

/// Directory component of `path` at `level`, if the path is deep enough.
pub fn team_component_at(path: &str, level: usize) -> Option<&str> {
    let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    parts.pop();
    parts.get(level).copied()
}
