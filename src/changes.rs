//! Records for changes between two repository states.
//!
//! Changes arrive already materialized as [`FileChange`] values, typically
//! read from a JSON file produced by a git front end. They go through the
//! same matcher and classifier as a directory scan, minus the traversal.

use std::fmt;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::FileClassifier;
use crate::filter::{normalize_path, PatternMatcher};
use crate::record::FileRecord;

/// How a path changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Unmodified,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
            ChangeStatus::Unmodified => "unmodified",
        };
        f.write_str(name)
    }
}

/// One changed path and its new content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    /// Content after the change; empty for deletions.
    #[serde(default)]
    pub content: String,
    pub status: ChangeStatus,
}

/// A classified change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub record: FileRecord,
    pub status: ChangeStatus,
    pub old_path: Option<String>,
    /// Language label derived from the extension.
    pub language: Option<&'static str>,
}

/// Parse a JSON array of changes.
pub fn parse_changes(json: &str) -> Result<Vec<FileChange>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Filter, classify, and sort changes.
///
/// Paths are normalized to forward slashes, then checked with
/// [`PatternMatcher::should_include`] only, since there are no directories
/// to prune. Content over `max_file_size` is not classified.
pub fn records_from_changes(
    changes: Vec<FileChange>,
    matcher: &PatternMatcher,
    classifier: &FileClassifier,
    max_file_size: u64,
) -> Vec<ChangeRecord> {
    let mut records: Vec<ChangeRecord> = changes
        .into_par_iter()
        .map(|mut change| {
            change.path = normalize_path(&change.path);
            change.old_path = change.old_path.map(|old| normalize_path(&old));
            change
        })
        .filter(|change| {
            let keep = matcher.should_include(&change.path);
            if !keep {
                debug!(path = %change.path, "change filtered out");
            }
            keep
        })
        .map(|change| {
            let size = change.content.len() as u64;
            let language = detect_language(&change.path);
            let record = if size > max_file_size {
                FileRecord::unread(change.path, size)
            } else {
                FileRecord::from_bytes(change.path, change.content.into_bytes(), classifier, false)
            };
            ChangeRecord {
                record,
                status: change.status,
                old_path: change.old_path,
                language,
            }
        })
        .collect();

    records.sort_by(|a, b| a.record.path.cmp(&b.record.path));
    records
}

/// Human-readable language name for a path's extension.
pub fn detect_language(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_lowercase();
    let name = match ext.as_str() {
        "go" => "Go",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "py" | "pyi" => "Python",
        "java" => "Java",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "rs" => "Rust",
        "kt" => "Kotlin",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PatternSet;

    fn change(path: &str, content: &str, status: ChangeStatus) -> FileChange {
        FileChange {
            path: path.into(),
            old_path: None,
            content: content.into(),
            status,
        }
    }

    #[test]
    fn test_parse_changes() {
        let json = r#"[
            {"path": "src/new.rs", "oldPath": "src/old.rs", "content": "fn a() {}\n", "status": "renamed"},
            {"path": "gone.txt", "status": "deleted"}
        ]"#;

        let changes = parse_changes(json).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].status, ChangeStatus::Renamed);
        assert_eq!(changes[0].old_path.as_deref(), Some("src/old.rs"));
        assert_eq!(changes[1].content, "");
    }

    #[test]
    fn test_parse_changes_rejects_unknown_status() {
        let json = r#"[{"path": "a", "status": "copied"}]"#;
        assert!(parse_changes(json).is_err());
    }

    #[test]
    fn test_records_filtered_and_sorted() {
        let set = PatternSet::new(vec![], vec!["*.log".into()], true);
        let matcher = PatternMatcher::new(&set);

        let records = records_from_changes(
            vec![
                change("z.go", "package z\n", ChangeStatus::Added),
                change("debug.log", "noise\n", ChangeStatus::Modified),
                change("a.py", "x = 1\ny = 2\n", ChangeStatus::Modified),
            ],
            &matcher,
            &FileClassifier::new(),
            1024,
        );

        let paths: Vec<_> = records.iter().map(|r| r.record.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "z.go"]);
        assert_eq!(records[0].record.line_count(), Some(2));
        assert_eq!(records[0].language, Some("Python"));
        assert_eq!(records[1].status, ChangeStatus::Added);
    }

    #[test]
    fn test_paths_are_normalized() {
        let set = PatternSet::new(vec!["src/**".into()], vec![], true);
        let matcher = PatternMatcher::new(&set);

        let renamed = FileChange {
            path: "src\\b.rs".into(),
            old_path: Some(".\\src\\old.rs".into()),
            content: "fn b() {}\n".into(),
            status: ChangeStatus::Renamed,
        };
        let records = records_from_changes(
            vec![renamed, change("./src/a.rs", "fn a() {}\n", ChangeStatus::Added)],
            &matcher,
            &FileClassifier::new(),
            1024,
        );

        let paths: Vec<_> = records.iter().map(|r| r.record.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs"]);
        assert_eq!(records[1].old_path.as_deref(), Some("src/old.rs"));
    }

    #[test]
    fn test_size_ceiling_applies() {
        let matcher = PatternMatcher::new(&PatternSet::default());
        let records = records_from_changes(
            vec![change("big.txt", "0123456789", ChangeStatus::Added)],
            &matcher,
            &FileClassifier::new(),
            5,
        );
        assert_eq!(records[0].record.size, 10);
        assert!(!records[0].record.was_read());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("main.go"), Some("Go"));
        assert_eq!(detect_language("lib/Mod.RS"), Some("Rust"));
        assert_eq!(detect_language("README"), None);
        assert_eq!(detect_language("notes.txt"), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ChangeStatus::Renamed.to_string(), "renamed");
    }
}
