//! Extraction over a whole directory tree.
//!
//! Walks the base directory, scans every file, and collects a summary once
//! all attachments have been decoded and written.

pub mod walk;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::DetachError;
use crate::model::fault::Fault;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Name of the default output directory, created next to the base directory.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "detached";

/// Totals for one extraction run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractSummary {
    pub output_dir: PathBuf,
    pub files_scanned: usize,
    pub files_failed: usize,
    pub attachments_found: usize,
    pub attachments_written: usize,
    pub bytes_written: u64,
    pub written: Vec<PathBuf>,
    pub faults: Vec<Fault>,
}

impl ExtractSummary {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            files_scanned: 0,
            files_failed: 0,
            attachments_found: 0,
            attachments_written: 0,
            bytes_written: 0,
            written: Vec::new(),
            faults: Vec::new(),
        }
    }
}

/// Default output directory for `base`: a `detached` directory beside it.
pub fn default_output_dir(base: &Path) -> PathBuf {
    match (base.file_name(), base.parent()) {
        (Some(_), Some(parent)) => parent.join(DEFAULT_OUTPUT_DIR_NAME),
        _ => base.join("..").join(DEFAULT_OUTPUT_DIR_NAME),
    }
}

/// Extract every attachment found under `base`.
///
/// `progress` is called with each file path before it is scanned.
///
/// Files that cannot be opened or read are recorded as faults and skipped.
/// The run stops early only for faults that affect everything (the output
/// directory cannot be created, or a malformed attachment under the
/// `abort` policy); queued attachments are still written before returning.
pub fn extract_tree(
    base: &Path,
    options: &PipelineOptions,
    progress: &dyn Fn(&Path),
) -> anyhow::Result<ExtractSummary> {
    if !base.is_dir() {
        anyhow::bail!("Base directory not found: {}", base.display());
    }

    std::fs::create_dir_all(&options.output_dir).map_err(|source| DetachError::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;

    info!(
        base = %base.display(),
        output_dir = %options.output_dir.display(),
        workers = options.worker_count,
        "Scanning for attachments"
    );

    let exclude = walk::nested_dir(base, &options.output_dir);
    let pipeline = Pipeline::start(options)?;
    let mut summary = ExtractSummary::new(options.output_dir.clone());
    let mut fatal: Option<DetachError> = None;

    for item in walk::email_files(base, exclude.as_deref()) {
        let path = match item {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                summary.faults.push(Fault {
                    path: e.path().map(Path::to_path_buf).unwrap_or_default(),
                    attachment: None,
                    message: e.to_string(),
                });
                continue;
            }
        };

        progress(&path);
        summary.files_scanned += 1;

        match pipeline.scan_file(&path) {
            Ok(report) => {
                summary.attachments_found += report.emitted;
                summary.faults.extend(report.faults);
            }
            Err(e) if e.is_fatal() => {
                error!(path = %path.display(), error = %e, "Stopping extraction");
                fatal = Some(e);
                break;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unable to find attachments");
                summary.files_failed += 1;
                summary.faults.push(Fault::file(&path, &e));
            }
        }
    }

    let report = pipeline.finish();
    summary.attachments_written = report.written.len();
    summary.bytes_written = report.bytes_written;
    summary.written = report.written;
    summary.faults.extend(report.faults);

    if let Some(e) = fatal {
        return Err(e.into());
    }

    info!(
        files = summary.files_scanned,
        attachments = summary.attachments_written,
        faults = summary.faults.len(),
        "Extraction complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir_is_sibling() {
        assert_eq!(
            default_output_dir(Path::new("/data/mail")),
            PathBuf::from("/data/detached")
        );
        assert_eq!(
            default_output_dir(Path::new("mail")),
            PathBuf::from("detached")
        );
        assert_eq!(
            default_output_dir(Path::new("/data/mail/..")),
            PathBuf::from("/data/mail/../../detached")
        );
    }

    #[test]
    fn test_missing_base_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let options = PipelineOptions::new(tmp.path().join("out"));
        let result = extract_tree(&tmp.path().join("nope"), &options, &|_| {});
        assert!(result.is_err());
    }
}
