//! Error types for the placer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during file placement or transfer cleanup.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy file.
    #[error("Failed to copy file from {source} to {destination}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {source} to {destination}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to delete a transfer artifact.
    #[error("Failed to remove {path}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cleanup needs a download directory and none is known.
    #[error("No download directory known for transfer cleanup")]
    NoDownloadDir,
}

impl PlacerError {
    pub(crate) fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        PlacerError::CopyFailed {
            source,
            destination,
            error,
        }
    }
}

/// Errors in a destination template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("destination template is empty")]
    Empty,

    #[error("unknown placeholder {{{0}}} in destination template")]
    UnknownPlaceholder(String),

    #[error("unbalanced braces in destination template")]
    UnbalancedBraces,
}
