//! Attachment records.
//!
//! A record holds the still-encoded body of one attachment between the
//! moment the scanner recognizes it and the moment a decode worker has
//! written it out.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{DetachError, Result};

/// One extracted attachment, not yet decoded.
///
/// Records are moved through the queue and never cloned, so the output
/// handle is owned by whichever worker received the record.
#[derive(Debug)]
pub struct AttachmentRecord {
    /// Value of the `X-Attachment-Id` header.
    pub id: String,

    /// Declared filename, quotes stripped.
    pub filename: String,

    /// Base64 text found between the boundary markers, line endings removed.
    pub body: Vec<u8>,

    /// Lazily created output handle.
    output: Option<File>,
}

impl AttachmentRecord {
    /// Create a record with no output handle yet.
    pub fn new(id: impl Into<String>, filename: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            body,
            output: None,
        }
    }

    /// Attach an already-open output handle.
    ///
    /// [`output_writer`](Self::output_writer) will hand this file back
    /// instead of creating one in the output directory.
    pub fn with_output(mut self, file: File) -> Self {
        self.output = Some(file);
        self
    }

    /// Name of the output file: `<id>_<filename>`.
    pub fn output_name(&self) -> String {
        format!(
            "{}_{}",
            sanitize_name_part(&self.id),
            sanitize_name_part(&self.filename)
        )
    }

    /// Full output path inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_name())
    }

    /// Return the output handle, creating the file on first use.
    pub fn output_writer(&mut self, output_dir: &Path) -> Result<&mut File> {
        match self.output {
            Some(ref mut file) => Ok(file),
            None => {
                let path = self.output_path(output_dir);
                let file = File::create(&path)
                    .map_err(|source| DetachError::CreateOutput { path, source })?;
                Ok(self.output.insert(file))
            }
        }
    }

    /// Whether an output handle is currently open.
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Close the output handle, if any. Safe to call more than once.
    pub fn close_output(&mut self) {
        drop(self.output.take());
    }
}

/// Make one half of an output name safe to use as a single path component.
///
/// Path separators and control characters become `_`; a part that is empty
/// or made only of dots becomes `unknown`.
pub fn sanitize_name_part(s: &str) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == ':' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}
