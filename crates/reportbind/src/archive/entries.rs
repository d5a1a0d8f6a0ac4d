//! Builds structured entries from the Word documents inside a ZIP archive.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use uuid::Uuid;

use crate::archive::team::{infer_team_level, team_component_at};
use crate::error::ArchiveError;
use crate::naming::{extract_person_names, sanitize_report_filename, split_stem_suffix};

const WORD_EXTENSIONS: [&str; 2] = ["doc", "docx"];

/// One source document discovered in the archive.
///
/// Created once per qualifying archive member; never mutated afterwards
/// except for the `archive_path` update when the extracted file is
/// physically renamed to its display name.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Process-unique id, used for stable tie-breaking.
    pub identifier: Uuid,
    /// Team-prefixed, duplicate-disambiguated name; unique within a batch
    /// and used as the external ordering key.
    pub display_name: String,
    /// POSIX path of the source file inside the archive.
    pub archive_path: String,
    /// Inferred team, `None` when nothing could be inferred.
    pub team_name: Option<String>,
    /// Candidate author tokens from the filename, in original order.
    pub persons: Vec<String>,
    /// Normalized filename prior to team-prefixing.
    pub sanitized_name: String,
}

fn is_word_document(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => WORD_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate)),
        _ => false,
    }
}

fn stem_of(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    split_stem_suffix(basename).0.to_string()
}

/// Appends a numbered suffix before the extension: `a.docx` → `a (2).docx`.
fn append_duplicate_suffix(base_name: &str, counter: u32) -> String {
    let (stem, suffix) = split_stem_suffix(base_name);
    format!("{stem} ({counter}){suffix}")
}

/// Builds the display name for an entry: team prefix unless already present,
/// then case-insensitive duplicate disambiguation within the batch.
fn build_display_name(
    sanitized_name: &str,
    team_name: Option<&str>,
    duplicate_counter: &mut HashMap<String, u32>,
) -> String {
    let prefixed_name = match team_name {
        Some(team) => {
            let prefix = format!("[{team}] ");
            if sanitized_name.starts_with(&prefix) {
                sanitized_name.to_string()
            } else {
                format!("{prefix}{sanitized_name}")
            }
        }
        None => sanitized_name.to_string(),
    };

    let key = prefixed_name.to_lowercase();
    let occurrence = duplicate_counter
        .entry(key)
        .and_modify(|count| *count += 1)
        .or_insert(1);
    if *occurrence == 1 {
        prefixed_name
    } else {
        append_duplicate_suffix(&prefixed_name, *occurrence)
    }
}

/// Enumerates the Word documents in `zip_path` and builds one [`Entry`] per
/// member, in archive enumeration order.
///
/// An archive with no Word documents yields an empty list, which callers
/// treat as a user-facing empty state rather than a failure. A structurally
/// unreadable archive is an [`ArchiveError`].
pub fn extract_entries(
    zip_path: &Path,
    original_name: Option<&str>,
) -> Result<Vec<Entry>, ArchiveError> {
    let file = File::open(zip_path).map_err(|source| ArchiveError::Open {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Unreadable {
        path: zip_path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut word_paths: Vec<String> = Vec::new();
    for index in 0..archive.len() {
        let member = archive.by_index(index).map_err(|e| ArchiveError::Unreadable {
            path: zip_path.to_path_buf(),
            message: e.to_string(),
        })?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        if is_word_document(&name) {
            word_paths.push(name);
        }
    }

    if word_paths.is_empty() {
        return Ok(Vec::new());
    }

    let team_level = infer_team_level(&word_paths);
    let default_team_name: Option<String> = if team_level.is_none() {
        match original_name {
            Some(name) => Some(stem_of(name)),
            None => zip_path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned()),
        }
    } else {
        None
    };

    let mut duplicate_counter: HashMap<String, u32> = HashMap::new();
    let mut entries = Vec::with_capacity(word_paths.len());

    for path in &word_paths {
        let team_name: Option<String> = match team_level {
            Some(level) => team_component_at(path, level).map(str::to_string),
            None => default_team_name.clone(),
        };

        let basename = path.rsplit('/').next().unwrap_or(path);
        let sanitized_name = sanitize_report_filename(basename);
        let display_name =
            build_display_name(&sanitized_name, team_name.as_deref(), &mut duplicate_counter);
        let persons = extract_person_names(&sanitized_name);

        entries.push(Entry {
            identifier: Uuid::new_v4(),
            display_name,
            archive_path: path.clone(),
            team_name,
            persons,
            sanitized_name,
        });
    }

    Ok(entries)
}

/// Extracts the whole archive into `destination`.
pub fn extract_archive(zip_path: &Path, destination: &Path) -> Result<(), ArchiveError> {
    let file = File::open(zip_path).map_err(|source| ArchiveError::Open {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Unreadable {
        path: zip_path.to_path_buf(),
        message: e.to_string(),
    })?;
    archive.extract(destination).map_err(|e| ArchiveError::Extract {
        path: destination.to_path_buf(),
        message: e.to_string(),
    })
}

/// Renames each teamed entry's extracted file to its display name so the
/// merged output and any repackaged archive carry the team prefix.
/// Updates `archive_path` accordingly; entries whose file is missing on
/// disk are skipped.
pub fn apply_team_prefixes<'a, I>(extract_dir: &Path, entries: I) -> Result<(), ArchiveError>
where
    I: IntoIterator<Item = &'a mut Entry>,
{
    for entry in entries {
        if entry.team_name.is_none() {
            continue;
        }

        let source_path = extract_dir.join(&entry.archive_path);
        if !source_path.exists() {
            continue;
        }

        let new_relative = match entry.archive_path.rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/{}", entry.display_name),
            None => entry.display_name.clone(),
        };
        let target_path = extract_dir.join(&new_relative);

        if target_path != source_path {
            if let Some(parent) = target_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Extract {
                    path: parent.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            std::fs::rename(&source_path, &target_path).map_err(|e| ArchiveError::Extract {
                path: target_path.clone(),
                message: e.to_string(),
            })?;
        }

        entry.archive_path = new_relative;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_entry(filename: &str, team: Option<&str>) -> Entry {
    let sanitized_name = sanitize_report_filename(filename);
    Entry {
        identifier: Uuid::new_v4(),
        display_name: match team {
            Some(team) => format!("[{team}] {sanitized_name}"),
            None => sanitized_name.clone(),
        },
        archive_path: filename.to_string(),
        team_name: team.map(str::to_string),
        persons: extract_person_names(&sanitized_name),
        sanitized_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(dir: &Path, members: &[&str]) -> std::path::PathBuf {
        let zip_path = dir.join("upload.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for member in members {
            writer.start_file(member.to_string(), options).unwrap();
            writer.write_all(b"dummy").unwrap();
        }
        writer.finish().unwrap();
        zip_path
    }

    #[test]
    fn test_is_word_document() {
        assert!(is_word_document("R/a.docx"));
        assert!(is_word_document("b.DOC"));
        assert!(!is_word_document("c.pdf"));
        assert!(!is_word_document("noext"));
        assert!(!is_word_document(".docx"));
    }

    #[test]
    fn test_entries_from_teamed_archive() {
        let temp = TempDir::new().unwrap();
        let zip_path = write_zip(
            temp.path(),
            &[
                "R班/田中 報告書.docx",
                "R班/鈴木 報告書.docx",
                "N班/山田 報告会.docx",
                "R班/notes.txt",
            ],
        );

        let entries = extract_entries(&zip_path, Some("upload.zip")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "[R班] 田中 報告書.docx",
                "[R班] 鈴木 報告書.docx",
                "[N班] 山田 報告書.docx",
            ]
        );
        assert_eq!(entries[0].team_name.as_deref(), Some("R班"));
        assert_eq!(entries[2].team_name.as_deref(), Some("N班"));
        // The name precedes the report word here, so no author tokens follow it.
        assert!(entries[0].persons.is_empty());
    }

    #[test]
    fn test_uniform_archive_uses_archive_name_as_team() {
        let temp = TempDir::new().unwrap();
        let zip_path = write_zip(temp.path(), &["X/a 報告書.docx", "X/b 報告書.docx"]);

        let entries = extract_entries(&zip_path, Some("第3回R班.zip")).unwrap();
        assert_eq!(entries[0].team_name.as_deref(), Some("第3回R班"));
        assert!(entries[0].display_name.starts_with("[第3回R班] "));
    }

    #[test]
    fn test_zero_word_members_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let zip_path = write_zip(temp.path(), &["readme.txt", "images/logo.png"]);
        let entries = extract_entries(&zip_path, None).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.zip");
        std::fs::write(&bogus, b"this is not a zip file").unwrap();
        assert!(extract_entries(&bogus, None).is_err());
    }

    #[test]
    fn test_duplicate_display_names_disambiguated() {
        let temp = TempDir::new().unwrap();
        let zip_path = write_zip(
            temp.path(),
            &["R班/田中 報告書.docx", "N班/dummy.docx", "R班/sub/田中 報告書.docx"],
        );

        let entries = extract_entries(&zip_path, None).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert!(names.contains(&"[R班] 田中 報告書.docx"));
        assert!(names.contains(&"[R班] 田中 報告書 (2).docx"));
    }

    #[test]
    fn test_display_names_unique_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let zip_path = write_zip(temp.path(), &["R/Report.docx", "N/x.docx", "R/report.docx"]);

        let entries = extract_entries(&zip_path, None).unwrap();
        let mut lowered: Vec<String> = entries
            .iter()
            .map(|e| e.display_name.to_lowercase())
            .collect();
        lowered.sort();
        lowered.dedup();
        assert_eq!(lowered.len(), entries.len());
    }

    #[test]
    fn test_apply_team_prefixes_renames_files() {
        let temp = TempDir::new().unwrap();
        let extract_dir = temp.path();
        std::fs::create_dir_all(extract_dir.join("R班")).unwrap();
        std::fs::write(extract_dir.join("R班/田中 報告書.docx"), b"doc").unwrap();

        let mut entry = test_entry("田中 報告書.docx", Some("R班"));
        entry.archive_path = "R班/田中 報告書.docx".to_string();
        entry.display_name = "[R班] 田中 報告書.docx".to_string();

        apply_team_prefixes(extract_dir, std::iter::once(&mut entry)).unwrap();

        assert_eq!(entry.archive_path, "R班/[R班] 田中 報告書.docx");
        assert!(extract_dir.join("R班/[R班] 田中 報告書.docx").exists());
        assert!(!extract_dir.join("R班/田中 報告書.docx").exists());
    }

    #[test]
    fn test_apply_team_prefixes_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let mut entry = test_entry("田中 報告書.docx", Some("R班"));
        entry.archive_path = "R班/田中 報告書.docx".to_string();

        apply_team_prefixes(temp.path(), std::iter::once(&mut entry)).unwrap();
        assert_eq!(entry.archive_path, "R班/田中 報告書.docx");
    }
}
