//! Configuration file handling.
//!
//! The configuration lives in `diffdeck.config.json` (camelCase keys). Every
//! field has a default, so a partial file only overrides what it names.
//! A [`Config`] is folded once into the immutable [`ScanOptions`] and
//! [`FormatOptions`] consumed by the scanner and the formatter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::content::Transforms;
use crate::filter::{FilterError, PatternSet, DEFAULT_IGNORE_PATTERNS};
use crate::output::{FormatOptions, OutputStyle};
use crate::scanner::ScanOptions;
use crate::walker::{WalkOptions, DEFAULT_MAX_FILE_SIZE, DEFAULT_WORKERS};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "diffdeck.config.json";

/// Default output file.
pub const DEFAULT_OUTPUT_PATH: &str = "diffdeck-output.txt";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("instruction file not found: {0}")]
    MissingInstructionFile(PathBuf),

    #[error(transparent)]
    Pattern(#[from] FilterError),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub output: OutputConfig,
    /// Include patterns; empty means everything.
    pub include: Vec<String>,
    pub ignore: IgnoreConfig,
    pub security: SecurityConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    /// Output file, `-` for stdout.
    pub file_path: PathBuf,
    pub style: OutputStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction_file_path: Option<PathBuf>,
    pub file_summary: bool,
    pub directory_structure: bool,
    pub remove_comments: bool,
    pub remove_empty_lines: bool,
    pub show_line_numbers: bool,
    pub top_files_length: usize,
    pub include_empty_directories: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            style: OutputStyle::Plain,
            header_text: None,
            instruction_file_path: None,
            file_summary: true,
            directory_structure: true,
            remove_comments: false,
            remove_empty_lines: false,
            show_line_numbers: false,
            top_files_length: 5,
            include_empty_directories: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IgnoreConfig {
    /// Import patterns from the scan base's `.gitignore`.
    pub use_gitignore: bool,
    pub use_default_patterns: bool,
    pub custom_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_default_patterns: true,
            custom_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecurityConfig {
    pub enable_security_check: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_security_check: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Files above this many bytes are listed but not read.
    pub max_file_size: u64,
    pub case_sensitive: bool,
    pub workers: usize,
    /// Keep raw bytes of binary files.
    pub read_binary: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            case_sensitive: true,
            workers: DEFAULT_WORKERS,
            read_binary: false,
        }
    }
}

impl Config {
    /// Load and validate `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "loading configuration");
                serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reject settings a scan cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }

        if let Some(instructions) = &self.output.instruction_file_path {
            if !instructions.is_file() {
                return Err(ConfigError::MissingInstructionFile(instructions.clone()));
            }
        }

        let patterns = PatternSet::new(
            self.include.clone(),
            self.ignore.custom_patterns.clone(),
            self.scan.case_sensitive,
        );
        patterns.validate()?;
        Ok(())
    }

    /// All ignore patterns: defaults, custom patterns, then `base/.gitignore`.
    ///
    /// When `base` is a file its directory's `.gitignore` is used.
    pub fn ignore_patterns(&self, base: &Path) -> Result<Vec<String>, ConfigError> {
        let mut patterns = Vec::new();

        if self.ignore.use_default_patterns {
            patterns.extend(DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()));
        }
        patterns.extend(self.ignore.custom_patterns.iter().cloned());

        if self.ignore.use_gitignore {
            patterns.extend(load_gitignore_patterns(&gitignore_dir(base).join(".gitignore"))?);
        }

        Ok(patterns)
    }

    /// Scan options for a scan rooted at `base`.
    pub fn scan_options(&self, base: &Path) -> Result<ScanOptions, ConfigError> {
        let patterns = PatternSet::new(
            self.include.clone(),
            self.ignore_patterns(base)?,
            self.scan.case_sensitive,
        );

        Ok(ScanOptions {
            patterns,
            walk: WalkOptions {
                max_file_size: self.scan.max_file_size,
                read_binary: self.scan.read_binary,
                ..WalkOptions::default()
            }
            .workers(self.scan.workers),
            tree_view: false,
        })
    }

    /// Formatter options; reads the instruction file if one is configured.
    pub fn format_options(&self) -> Result<FormatOptions, ConfigError> {
        let instructions = match &self.output.instruction_file_path {
            Some(path) => Some(fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                path: path.clone(),
                source,
            })?),
            None => None,
        };

        Ok(FormatOptions {
            style: self.output.style,
            header_text: self.output.header_text.clone(),
            instructions,
            file_summary: self.output.file_summary,
            directory_structure: self.output.directory_structure,
            transforms: Transforms {
                remove_comments: self.output.remove_comments,
                remove_empty_lines: self.output.remove_empty_lines,
                show_line_numbers: self.output.show_line_numbers,
            },
            top_files_length: self.output.top_files_length,
            include_empty_directories: self.output.include_empty_directories,
        })
    }
}

fn gitignore_dir(base: &Path) -> &Path {
    if !base.is_file() {
        return base;
    }
    match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Non-comment lines of a `.gitignore`, as glob patterns.
///
/// Negations are skipped and a trailing `/` is dropped. A line with a `/`
/// before its end is anchored to the root, as git does. A missing file
/// yields no patterns.
pub fn load_gitignore_patterns(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(|line| {
            let trimmed = line.trim_end_matches('/');
            let pattern = if trimmed.is_empty() { line } else { trimmed };
            if pattern.contains('/') && !pattern.starts_with('/') && !pattern.starts_with("**/") {
                format!("/{pattern}")
            } else {
                pattern.to_string()
            }
        })
        .collect())
}
