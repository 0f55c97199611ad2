//! Centralized error types for maildetach.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the maildetach library.
#[derive(Error, Debug)]
pub enum DetachError {
    /// An email file could not be opened for reading.
    #[error("Cannot open email file '{path}': {source}")]
    CannotOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An attachment body is not valid base64.
    #[error("Invalid base64 in attachment '{id}' ({filename}): {reason}")]
    InvalidBase64 {
        id: String,
        filename: String,
        reason: String,
    },

    /// The destination file for an attachment could not be created.
    #[error("Cannot create output file '{path}': {source}")]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing decoded data to an output file failed.
    #[error("Failed writing output file '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The output directory itself could not be created.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A decode worker thread could not be started.
    #[error("Failed to start decode worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// A record was submitted after the decode pool shut down.
    #[error("Decode pool is closed")]
    PoolClosed,
}

/// Convenience alias for `Result<T, DetachError>`.
pub type Result<T> = std::result::Result<T, DetachError>;

impl DetachError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the whole run cannot make progress.
    ///
    /// Everything else is scoped to a single file or attachment.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::OutputDir { .. }
                | Self::InvalidBase64 { .. }
                | Self::Spawn(_)
                | Self::PoolClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let open = DetachError::CannotOpen {
            path: PathBuf::from("x"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(!open.is_fatal());
        assert!(!DetachError::io("x", std::io::Error::other("boom")).is_fatal());
        assert!(DetachError::PoolClosed.is_fatal());
    }

    #[test]
    fn test_display_includes_path() {
        let err = DetachError::CannotOpen {
            path: PathBuf::from("/mail/a.eml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/mail/a.eml"));
    }
}
