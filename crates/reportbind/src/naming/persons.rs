//! Splits sanitized filenames into candidate author-name tokens.

use std::sync::LazyLock;

use regex::Regex;

use crate::naming::{split_stem_suffix, REPORT_WORD};

static RE_PERSON_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[・･.,，、．｡\s]+").unwrap());
static RE_PERSON_NORMALIZATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s・･.,，、．｡]+").unwrap());

/// Extracts author-name tokens from a sanitized filename.
///
/// The portion after the first 報告書 is assumed to be the member-name part;
/// if the marker is absent the whole stem is used. Token order is preserved,
/// it feeds the member-preference matching later.
pub fn extract_person_names(sanitized_name: &str) -> Vec<String> {
    let (stem, _) = split_stem_suffix(sanitized_name);
    let remainder = match stem.find(REPORT_WORD) {
        Some(idx) => &stem[idx + REPORT_WORD.len()..],
        None => stem,
    };
    let remainder = remainder.trim();
    if remainder.is_empty() {
        return Vec::new();
    }
    RE_PERSON_SEPARATORS
        .split(remainder)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapses a person token for matching: separator characters stripped,
/// lowercased. Matching against preference lists is done on this form.
pub fn normalize_person_token(value: &str) -> String {
    RE_PERSON_NORMALIZATION.replace_all(value, "").to_lowercase()
}
