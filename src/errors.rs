//! Error types for diffdeck.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::output::OutputError;
use crate::security::SecurityError;
use crate::walker::WalkError;

/// Top-level error type for diffdeck operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffdeckError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("no files found in {0}")]
    NoFilesFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk error: {0}")]
    Walk(WalkError),

    #[error("filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("security check error: {0}")]
    Security(#[from] SecurityError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("invalid changes file {path}: {source}")]
    Changes {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<WalkError> for DiffdeckError {
    fn from(error: WalkError) -> Self {
        match error {
            WalkError::NotFound { path } => DiffdeckError::PathNotFound(path),
            WalkError::PermissionDenied { path } => DiffdeckError::PermissionDenied(path),
            other => DiffdeckError::Walk(other),
        }
    }
}

/// Map an error to its exit code.
pub fn exit_code(error: &DiffdeckError) -> i32 {
    match error {
        DiffdeckError::PathNotFound(_) => 3,
        DiffdeckError::PermissionDenied(_) => 4,
        DiffdeckError::NoFilesFound(_) => 5,
        DiffdeckError::Walk(_) => 2,
        DiffdeckError::Io(_)
        | DiffdeckError::Filter(_)
        | DiffdeckError::Config(_)
        | DiffdeckError::Security(_)
        | DiffdeckError::Output(_)
        | DiffdeckError::Changes { .. } => 1,
    }
}
