//! Non-fatal failures recorded during a run.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::DetachError;

/// A failure scoped to one email file or one attachment.
///
/// Faults are collected instead of aborting so that the caller gets the
/// full list once the run is over.
#[derive(Debug, Clone, Serialize)]
pub struct Fault {
    /// Email file (scanner faults) or output file (decode faults).
    pub path: PathBuf,

    /// Attachment id, when the fault concerns a single attachment.
    pub attachment: Option<String>,

    /// Human-readable description.
    pub message: String,
}

impl Fault {
    /// Fault affecting a whole file.
    pub fn file(path: impl Into<PathBuf>, error: &DetachError) -> Self {
        Self {
            path: path.into(),
            attachment: None,
            message: error.to_string(),
        }
    }

    /// Fault affecting a single attachment.
    pub fn attachment(path: impl Into<PathBuf>, id: impl Into<String>, error: &DetachError) -> Self {
        Self {
            path: path.into(),
            attachment: Some(id.into()),
            message: error.to_string(),
        }
    }
}
