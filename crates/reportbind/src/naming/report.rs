//! Report-number inference and progress formatting.

use std::sync::LazyLock;

use regex::Regex;

use crate::archive::Entry;
use crate::naming::split_stem_suffix;

static RE_REPORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"第\s*(\d{1,3})\s*回").unwrap());
static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Pulls a report number out of a filename stem: a `第N回` marker wins,
/// otherwise the first digit run.
pub fn extract_report_number(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let (stem, _) = split_stem_suffix(name);
    if let Some(captures) = RE_REPORT_NUMBER.captures(stem) {
        return Some(captures[1].to_string());
    }
    RE_DIGITS.find(stem).map(|m| m.as_str().to_string())
}

/// Determines the report number for a batch: the archive's own name wins,
/// otherwise a majority vote over the entries' names. Votes tie-break on
/// the larger numeric value; no candidate at all defaults to "1".
pub fn determine_report_number(zip_original_name: &str, entries: &[Entry]) -> String {
    if let Some(number) = extract_report_number(zip_original_name) {
        return number;
    }

    // Vec instead of a map keeps first-occurrence order for stable ties.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        let candidate = extract_report_number(&entry.sanitized_name)
            .or_else(|| extract_report_number(&entry.display_name));
        let Some(candidate) = candidate else {
            continue;
        };
        match counts.iter_mut().find(|(value, _)| *value == candidate) {
            Some((_, count)) => *count += 1,
            None => counts.push((candidate, 1)),
        }
    }

    if counts.is_empty() {
        return "1".to_string();
    }

    counts.sort_by_key(|(value, count)| {
        let numeric = value.parse::<i64>().unwrap_or(-1);
        (std::cmp::Reverse(*count), std::cmp::Reverse(numeric))
    });
    counts[0].0.clone()
}

/// Formats a duration as `X時間Y分Z秒`, omitting leading zero components.
pub fn format_elapsed(total_seconds: f64) -> String {
    let seconds = total_seconds.round() as i64;
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    let mut parts = String::new();
    if hours > 0 {
        parts.push_str(&format!("{hours}時間"));
    }
    if minutes > 0 || hours > 0 {
        parts.push_str(&format!("{minutes}分"));
    }
    parts.push_str(&format!("{seconds}秒"));
    parts
}
