//! Canonicalizes raw report filenames.
//!
//! The rules mirror what contributors actually upload: mixed full/half-width
//! punctuation, underscores instead of spaces, "報告会" instead of "報告書",
//! and round markers ("第3回") without the report word at all.

use std::sync::LazyLock;

use regex::Regex;

use crate::naming::{split_stem_suffix, REPORT_WORD};

const MEETING_WORD: &str = "報告会";
const COUNTER_MARKER: char = '回';

static RE_DOT_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[･.,，、．｡]+").unwrap());
static RE_SPACE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[₋_＿\s]+").unwrap());
static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Normalizes a raw filename into the canonical team-report form.
///
/// The extension is preserved verbatim; all rules apply to the stem only.
/// Idempotent: sanitizing an already-sanitized name is a no-op.
pub fn sanitize_report_filename(raw_filename: &str) -> String {
    let (raw_stem, suffix) = split_stem_suffix(raw_filename);

    let mut stem = RE_DOT_SEPARATORS.replace_all(raw_stem, "・").into_owned();
    stem = RE_SPACE_SEPARATORS.replace_all(&stem, " ").into_owned();
    stem = stem.replace(MEETING_WORD, REPORT_WORD);
    stem = ensure_space_after_report(&stem);
    stem = collapse_whitespace(&stem);

    // "第3回 田中" carries the round marker but dropped the report word.
    if stem.contains(COUNTER_MARKER) && !stem.contains(REPORT_WORD) {
        if let Some(pos) = stem.find(COUNTER_MARKER) {
            let insert_pos = pos + COUNTER_MARKER.len_utf8();
            stem.insert_str(insert_pos, REPORT_WORD);
            stem = ensure_space_after_report(&stem);
            stem = collapse_whitespace(&stem);
        }
    }

    format!("{stem}{suffix}")
}

fn collapse_whitespace(stem: &str) -> String {
    RE_WHITESPACE.replace_all(stem, " ").trim().to_string()
}

/// Inserts a space after every 報告書 occurrence that is not already
/// followed by whitespace or a separator. The regex crate has no lookahead,
/// so this is a plain scan over the literal.
fn ensure_space_after_report(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len() + 4);
    let mut rest = stem;
    while let Some(idx) = rest.find(REPORT_WORD) {
        let after = idx + REPORT_WORD.len();
        out.push_str(&rest[..after]);
        rest = &rest[after..];
        let needs_space = match rest.chars().next() {
            None => true,
            Some(c) => !(c.is_whitespace() || matches!(c, '・' | ',' | '，' | '、')),
        };
        if needs_space {
            out.push(' ');
        }
    }
    out.push_str(rest);
    out
}
