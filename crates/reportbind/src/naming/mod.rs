//! Filename normalization and identity extraction.
//!
//! Uploaded report filenames encode the report round and the author names,
//! with wildly inconsistent punctuation. These modules turn a raw filename
//! into a canonical "報告書" form and pull the author tokens out of it.

pub mod persons;
pub mod report;
pub mod sanitize;

pub use persons::{extract_person_names, normalize_person_token};
pub use report::{determine_report_number, extract_report_number, format_elapsed};
pub use sanitize::sanitize_report_filename;

/// The canonical report marker inserted/normalized by the sanitizer.
pub const REPORT_WORD: &str = "報告書";

/// Splits a filename into stem and suffix (suffix includes the leading dot).
///
/// A dot at position 0 or at the very end does not start a suffix, matching
/// `Path::file_stem` semantics for dotfiles.
pub(crate) fn split_stem_suffix(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}
