//! Include/ignore glob matching.
//!
//! A [`PatternMatcher`] evaluates slash-normalized relative paths against two
//! ordered pattern sets. Ignore patterns always win over include patterns, and
//! an empty include set admits everything that is not ignored.
//!
//! Patterns use recursive glob syntax: `**` crosses directory boundaries, `*`
//! and `?` stay within one path component, and `[...]` classes are supported.
//! Bare patterns are anchored anywhere in the tree (`*.log` becomes
//! `**/*.log`), a leading `/` anchors to the scan root, and a trailing `/**`
//! also matches the directory itself so that ignored directories can be pruned.

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;
use tracing::warn;

/// Patterns ignored when the configuration enables the built-in defaults.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/**",
    "node_modules/**",
    "*.log",
    "*.tmp",
    "*.temp",
    ".DS_Store",
    "Thumbs.db",
];

/// Errors reported when validating a pattern set.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Ordered include and ignore patterns plus case sensitivity.
///
/// Treated as immutable configuration for the duration of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSet {
    pub include: Vec<String>,
    pub ignore: Vec<String>,
    pub case_sensitive: bool,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            ignore: Vec::new(),
            case_sensitive: true,
        }
    }
}

impl PatternSet {
    /// Create a pattern set from include and ignore lists.
    pub fn new(include: Vec<String>, ignore: Vec<String>, case_sensitive: bool) -> Self {
        Self {
            include,
            ignore,
            case_sensitive,
        }
    }

    /// Check that every pattern compiles.
    ///
    /// The matcher itself tolerates malformed patterns; this is for callers
    /// that want to reject bad configuration before a scan starts.
    pub fn validate(&self) -> Result<(), FilterError> {
        for pattern in self.include.iter().chain(&self.ignore) {
            compile_glob(&normalize_pattern(pattern)).map_err(|source| {
                FilterError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

/// Compiled matcher for one [`PatternSet`].
#[derive(Debug)]
pub struct PatternMatcher {
    include: GlobSet,
    ignore: GlobSet,
    has_include: bool,
    case_sensitive: bool,
}

impl PatternMatcher {
    /// Compile a pattern set. Malformed patterns are logged and never match.
    pub fn new(patterns: &PatternSet) -> Self {
        Self {
            include: build_set(&patterns.include, patterns.case_sensitive),
            ignore: build_set(&patterns.ignore, patterns.case_sensitive),
            has_include: !patterns.include.is_empty(),
            case_sensitive: patterns.case_sensitive,
        }
    }

    /// Whether `path` matches any ignore pattern.
    pub fn should_ignore(&self, path: &str) -> bool {
        let path = self.prepare_path(path);
        self.ignore.is_match(path.as_str())
    }

    /// Whether `path` is admitted: not ignored, and matching the include set
    /// when one is configured.
    pub fn should_include(&self, path: &str) -> bool {
        let path = self.prepare_path(path);
        if self.ignore.is_match(path.as_str()) {
            return false;
        }
        if !self.has_include {
            return true;
        }
        self.include.is_match(path.as_str())
    }

    fn prepare_path(&self, path: &str) -> String {
        let path = normalize_path(path);
        if self.case_sensitive {
            path
        } else {
            path.to_lowercase()
        }
    }
}

/// Convert a path to forward slashes and drop any leading `./`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// Normalize one pattern into its anchored-anywhere form.
///
/// ```
/// use diffdeck::filter::normalize_pattern;
///
/// assert_eq!(normalize_pattern("*.log"), "**/*.log");
/// assert_eq!(normalize_pattern("/build"), "build");
/// assert_eq!(normalize_pattern("dist/"), "**/dist/**");
/// assert_eq!(normalize_pattern("**/tmp"), "**/tmp");
/// ```
pub fn normalize_pattern(pattern: &str) -> String {
    let mut pattern = pattern.trim().replace('\\', "/");

    if pattern.ends_with('/') {
        pattern.push_str("**");
    }

    if let Some(anchored) = pattern.strip_prefix('/') {
        return anchored.trim_start_matches('/').to_string();
    }

    if pattern == "**" || pattern.starts_with("**/") {
        pattern
    } else {
        format!("**/{}", pattern)
    }
}

/// Normalize a list of patterns.
pub fn normalize_patterns(patterns: &[String]) -> Vec<String> {
    patterns.iter().map(|p| normalize_pattern(p)).collect()
}

/// Split a comma-separated pattern list, trimming blanks.
///
/// ```
/// use diffdeck::filter::parse_pattern_list;
///
/// assert_eq!(parse_pattern_list(" *.go, ,src/** "), vec!["*.go", "src/**"]);
/// assert!(parse_pattern_list("").is_empty());
/// ```
pub fn parse_pattern_list(patterns: &str) -> Vec<String> {
    patterns
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn compile_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .backslash_escape(false)
        .build()
}

fn build_set(patterns: &[String], case_sensitive: bool) -> GlobSet {
    let mut builder = GlobSetBuilder::new();

    for raw in patterns {
        let mut normalized = normalize_pattern(raw);
        if !case_sensitive {
            normalized = normalized.to_lowercase();
        }

        match compile_glob(&normalized) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                warn!(pattern = %raw, error = %e, "ignoring malformed pattern");
                continue;
            }
        }

        // `dir/**` should also match `dir` itself
        if let Some(dir) = normalized.strip_suffix("/**") {
            if let Ok(glob) = compile_glob(dir) {
                builder.add(glob);
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "failed to build pattern set, nothing will match");
        GlobSet::empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matcher(include: &[&str], ignore: &[&str], case_sensitive: bool) -> PatternMatcher {
        PatternMatcher::new(&PatternSet::new(
            include.iter().map(|s| s.to_string()).collect(),
            ignore.iter().map(|s| s.to_string()).collect(),
            case_sensitive,
        ))
    }

    #[test]
    fn test_empty_include_allows_everything() {
        let m = matcher(&[], &[], true);
        assert!(m.should_include("a.go"));
        assert!(m.should_include("deep/nested/file.txt"));
    }

    #[test]
    fn test_ignore_wins_over_include() {
        let m = matcher(&["**/*.go"], &["vendor/**"], true);
        assert!(m.should_include("main.go"));
        assert!(!m.should_include("vendor/lib/x.go"));
        assert!(m.should_ignore("vendor/lib/x.go"));
    }

    #[test]
    fn test_include_is_union() {
        let m = matcher(&["*.go", "*.md"], &[], true);
        assert!(m.should_include("main.go"));
        assert!(m.should_include("docs/readme.md"));
        assert!(!m.should_include("image.png"));
    }

    #[test]
    fn test_bare_pattern_matches_at_any_depth() {
        let m = matcher(&[], &["*.log"], true);
        assert!(m.should_ignore("app.log"));
        assert!(m.should_ignore("logs/2024/app.log"));
        assert!(!m.should_ignore("app.log.txt"));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let m = matcher(&["/src/*.go"], &[], true);
        assert!(m.should_include("src/main.go"));
        assert!(!m.should_include("src/inner/main.go"));
        assert!(!m.should_include("other/src/main.go"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        let m = matcher(&["file?.[ch]"], &[], true);
        assert!(m.should_include("file1.c"));
        assert!(m.should_include("dir/fileX.h"));
        assert!(!m.should_include("file10.c"));
        assert!(!m.should_include("file1.o"));
    }

    #[test]
    fn test_trailing_double_star_matches_directory_itself() {
        let m = matcher(&[], &[".git/**"], true);
        assert!(m.should_ignore(".git"));
        assert!(m.should_ignore(".git/config"));
        assert!(m.should_ignore("sub/.git/objects/ab"));
        assert!(!m.should_ignore(".gitignore"));
    }

    #[test]
    fn test_trailing_slash_pattern() {
        let m = matcher(&[], &["target/"], true);
        assert!(m.should_ignore("target"));
        assert!(m.should_ignore("target/debug/app"));
        assert!(!m.should_ignore("targets.txt"));
    }

    #[test]
    fn test_case_insensitive_mode() {
        let insensitive = matcher(&["src/*.go"], &[], false);
        assert!(insensitive.should_include("SRC/Main.GO"));

        let sensitive = matcher(&["src/*.go"], &[], true);
        assert!(!sensitive.should_include("SRC/Main.GO"));
    }

    #[test]
    fn test_case_insensitive_mixed_case_pattern() {
        let m = matcher(&[], &["*.LOG", "Build/**"], false);
        assert!(m.should_ignore("debug.log"));
        assert!(m.should_ignore("build/out.o"));
    }

    #[test]
    fn test_backslash_paths_are_normalized() {
        let m = matcher(&["src/**/*.rs"], &[], true);
        assert!(m.should_include("src\\util\\mod.rs"));
        assert!(m.should_include(".\\src\\lib.rs"));
    }

    #[test]
    fn test_malformed_pattern_is_non_matching() {
        let m = matcher(&["[unclosed", "*.rs"], &["{broken"], true);
        assert!(m.should_include("lib.rs"));
        assert!(!m.should_include("[unclosed"));
        assert!(!m.should_ignore("{broken"));
    }

    #[test]
    fn test_validate_reports_malformed_pattern() {
        let set = PatternSet::new(vec!["ok/**".into()], vec!["[bad".into()], true);
        let err = set.validate().unwrap_err();
        assert!(matches!(err, FilterError::InvalidPattern { ref pattern, .. } if pattern == "[bad"));

        assert!(PatternSet::default().validate().is_ok());
    }

    #[test]
    fn test_default_ignore_patterns() {
        let set = PatternSet::new(
            Vec::new(),
            DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            true,
        );
        let m = PatternMatcher::new(&set);
        assert!(m.should_ignore(".git"));
        assert!(m.should_ignore("web/node_modules"));
        assert!(m.should_ignore("tmp/x.tmp"));
        assert!(m.should_ignore(".DS_Store"));
        assert!(!m.should_ignore("src/main.rs"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("a\\b\\c.txt"), "a/b/c.txt");
        assert_eq!(normalize_path("./a/b"), "a/b");
        assert_eq!(normalize_path("a/b"), "a/b");
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z]{1,6}(\\.[a-z]{1,3})?", 1..4).prop_map(|parts| parts.join("/"))
    }

    fn pattern_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("*.log".to_string()),
            Just("**/*.md".to_string()),
            Just("src/**".to_string()),
            "[a-z]{1,4}".prop_map(|s| format!("{}*", s)),
            "[a-z]{1,4}".prop_map(|s| format!("*.{}", s)),
        ]
    }

    proptest! {
        #[test]
        fn prop_ignored_paths_are_never_included(
            path in path_strategy(),
            include in prop::collection::vec(pattern_strategy(), 0..4),
            ignore in prop::collection::vec(pattern_strategy(), 0..4),
        ) {
            let set = PatternSet::new(include, ignore, true);
            let m = PatternMatcher::new(&set);
            if m.should_ignore(&path) {
                prop_assert!(!m.should_include(&path));
            }
        }

        #[test]
        fn prop_empty_include_is_complement_of_ignore(
            path in path_strategy(),
            ignore in prop::collection::vec(pattern_strategy(), 0..4),
        ) {
            let set = PatternSet::new(Vec::new(), ignore, true);
            let m = PatternMatcher::new(&set);
            prop_assert_eq!(m.should_include(&path), !m.should_ignore(&path));
        }

        #[test]
        fn prop_ignore_order_does_not_matter(
            path in path_strategy(),
            ignore in prop::collection::vec(pattern_strategy(), 0..5),
        ) {
            let forward = PatternMatcher::new(&PatternSet::new(Vec::new(), ignore.clone(), true));
            let mut reversed_patterns = ignore;
            reversed_patterns.reverse();
            let reversed = PatternMatcher::new(&PatternSet::new(Vec::new(), reversed_patterns, true));
            prop_assert_eq!(forward.should_ignore(&path), reversed.should_ignore(&path));
        }
    }
}
