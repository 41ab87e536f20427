//! Diffdeck - Pack a repository, or a set of changes, into one document for LLMs.
//!
//! Diffdeck walks one or more directory trees with a bounded pool of reader
//! threads, filters paths with include/ignore globs, classifies every file
//! (MIME type, text or binary, encoding, line count) and returns a
//! deterministic, path-sorted record set. Formatters turn that set into a
//! plain-text, Markdown or XML document.
//!
//! # Quick Start
//!
//! ```no_run
//! use diffdeck::output::{format_output, FormatOptions};
//! use diffdeck::scanner::{ScanOptions, Scanner};
//!
//! let options = ScanOptions::default()
//!     .include(["**/*.rs", "Cargo.toml"])
//!     .workers(8);
//!
//! let records = Scanner::new(options).scan(&["./my-project"]).unwrap();
//! println!("{}", format_output(&records, &[], &FormatOptions::default()));
//! ```
//!
//! # Modules
//!
//! - [`filter`] - Include/ignore glob matching
//! - [`classify`] - MIME, text/binary, encoding and line detection
//! - [`record`] - Scan records
//! - [`walker`] - Concurrent directory traversal
//! - [`scanner`] - Multi-root scans and the tree view
//! - [`tree`] - Hierarchy building and rendering
//! - [`changes`] - Records for pre-materialized changes
//! - [`content`] - Comment/empty-line removal and line numbers
//! - [`security`] - Secret detection
//! - [`output`] - Document formatting
//! - [`config`] - Configuration file

pub mod filter;
pub mod classify;
pub mod record;
pub mod errors;
pub mod tree;
pub mod walker;
pub mod scanner;
pub mod changes;
pub mod content;
pub mod security;
pub mod output;
pub mod config;

// Re-export key types at crate root for convenience
pub use changes::{ChangeRecord, ChangeStatus, FileChange};
pub use classify::{Classification, ClassifyError, FileClassifier};
pub use config::{Config, ConfigError};
pub use errors::DiffdeckError;
pub use filter::{FilterError, PatternMatcher, PatternSet};
pub use output::{FormatOptions, OutputError, OutputStyle};
pub use record::{Content, FileRecord};
pub use scanner::{scan_paths, ScanOptions, Scanner};
pub use security::{Issue, SecurityChecker, SecurityError};
pub use walker::{ConcurrentWalker, WalkError, WalkOptions};
