//! Multi-root scanning.
//!
//! Provides both a builder-style API ([`ScanOptions`] + [`Scanner`]) and a
//! functional entry point ([`scan_paths`]).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::classify::FileClassifier;
use crate::filter::{PatternMatcher, PatternSet, DEFAULT_IGNORE_PATTERNS};
use crate::record::FileRecord;
use crate::tree::build_tree;
use crate::walker::{ConcurrentWalker, WalkError, WalkOptions};

/// Everything a scan needs, fixed before it starts.
///
/// # Examples
///
/// ```no_run
/// use diffdeck::scanner::{ScanOptions, Scanner};
///
/// let options = ScanOptions::default()
///     .include(["**/*.rs"])
///     .ignore(["target/**"])
///     .workers(4);
///
/// let records = Scanner::new(options).scan(&["."]).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub patterns: PatternSet,
    pub walk: WalkOptions,
    /// Nest records under their parents instead of returning a flat list.
    pub tree_view: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        let patterns = PatternSet {
            ignore: DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        };
        Self {
            patterns,
            walk: WalkOptions::default(),
            tree_view: false,
        }
    }
}

impl ScanOptions {
    /// Replace the include patterns.
    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.include = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the ignore patterns, defaults included.
    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.ignore = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.patterns.case_sensitive = case_sensitive;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.walk.max_file_size = bytes;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.walk = self.walk.workers(workers);
        self
    }

    /// Keep raw bytes of non-text files.
    pub fn read_binary(mut self, read_binary: bool) -> Self {
        self.walk.read_binary = read_binary;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk = self.walk.max_depth(depth);
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.walk.follow_symlinks = follow;
        self
    }

    pub fn tree_view(mut self, tree_view: bool) -> Self {
        self.tree_view = tree_view;
        self
    }
}

/// Scans one or more roots with a shared matcher.
#[derive(Debug)]
pub struct Scanner {
    walker: ConcurrentWalker,
    tree_view: bool,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        let matcher = Arc::new(PatternMatcher::new(&options.patterns));
        Self {
            walker: ConcurrentWalker::new(matcher, FileClassifier::new(), options.walk),
            tree_view: options.tree_view,
        }
    }

    /// Walk every root and return the records sorted by path.
    ///
    /// No roots means the current directory. A failing root aborts the scan.
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<FileRecord>, WalkError> {
        let roots: Vec<PathBuf> = if roots.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            roots.iter().map(|r| r.as_ref().to_path_buf()).collect()
        };

        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for root in &roots {
            for record in self.walker.walk(root)? {
                if seen.insert(record.path.clone()) {
                    records.push(record);
                } else {
                    warn!(path = %record.path, root = %root.display(), "duplicate path, keeping first");
                }
            }
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        info!(roots = roots.len(), records = records.len(), "scan finished");

        if self.tree_view {
            Ok(build_tree(records))
        } else {
            Ok(records)
        }
    }
}

/// Scan `roots` with `options`.
///
/// # Examples
///
/// ```no_run
/// use diffdeck::scanner::{scan_paths, ScanOptions};
///
/// let records = scan_paths(&["src", "tests"], &ScanOptions::default()).unwrap();
/// for record in &records {
///     println!("{} ({} bytes)", record.path, record.size);
/// }
/// ```
pub fn scan_paths<P: AsRef<Path>>(
    roots: &[P],
    options: &ScanOptions,
) -> Result<Vec<FileRecord>, WalkError> {
    Scanner::new(options.clone()).scan(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub struct Config;\n").unwrap();
        fs::write(dir.path().join(".git/config"), "[core]\n").unwrap();
        fs::write(dir.path().join("build.log"), "ok\n").unwrap();

        dir
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_scan_sorted_with_default_ignores() {
        let dir = create_test_project();

        let records = Scanner::new(ScanOptions::default()).scan(&[dir.path()]).unwrap();

        assert_eq!(paths(&records), vec!["src", "src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_include_filters_files_only() {
        let dir = create_test_project();

        let options = ScanOptions::default().include(["main.rs"]);
        let records = scan_paths(&[dir.path()], &options).unwrap();

        assert_eq!(paths(&records), vec!["src/main.rs"]);
    }

    #[test]
    fn test_case_insensitive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README.MD"), "# hi\n").unwrap();

        let sensitive = scan_paths(&[dir.path()], &ScanOptions::default().include(["*.md"])).unwrap();
        assert!(sensitive.is_empty());

        let options = ScanOptions::default().include(["*.md"]).case_sensitive(false);
        let insensitive = scan_paths(&[dir.path()], &options).unwrap();
        assert_eq!(paths(&insensitive), vec!["README.MD"]);
    }

    #[test]
    fn test_multiple_roots_deduplicate() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("shared.txt"), "first\n").unwrap();
        fs::write(second.path().join("shared.txt"), "second\n").unwrap();
        fs::write(second.path().join("only.txt"), "x\n").unwrap();

        let records = Scanner::new(ScanOptions::default())
            .scan(&[first.path(), second.path()])
            .unwrap();

        assert_eq!(paths(&records), vec!["only.txt", "shared.txt"]);
        assert_eq!(records[1].text(), Some("first\n"));
    }

    #[test]
    fn test_missing_root_aborts() {
        let dir = create_test_project();
        let missing = dir.path().join("missing");

        let result = Scanner::new(ScanOptions::default()).scan(&[dir.path(), missing.as_path()]);
        assert!(matches!(result, Err(WalkError::NotFound { .. })));
    }

    #[test]
    fn test_tree_view() {
        let dir = create_test_project();

        let forest = scan_paths(&[dir.path()], &ScanOptions::default().tree_view(true)).unwrap();

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].path, "src");
        assert_eq!(paths(&forest[0].children), vec!["src/lib.rs", "src/main.rs"]);
    }

    #[test]
    fn test_flat_scan_has_no_children() {
        let dir = create_test_project();
        let records = scan_paths(&[dir.path()], &ScanOptions::default()).unwrap();
        assert!(records.iter().all(|r| r.children.is_empty()));
    }

    #[test]
    fn test_rescan_is_identical() {
        let dir = create_test_project();
        let scanner = Scanner::new(ScanOptions::default().workers(2));

        let first = scanner.scan(&[dir.path()]).unwrap();
        let second = scanner.scan(&[dir.path()]).unwrap();
        assert_eq!(first, second);
    }
}
