//! Attachment extraction pipeline: scanner → bounded queue → decode pool.

pub mod pool;
pub mod tracker;

use std::path::{Path, PathBuf};

use crate::config::{Config, FaultPolicy, DEFAULT_WORKER_COUNT};
use crate::error::Result;
use crate::parser::scanner::{AttachmentScanner, ScanReport};
use pool::{DecodePool, PoolReport};

/// Settings for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    pub worker_count: usize,
    pub on_malformed: FaultPolicy,
    pub read_buffer_size: usize,
}

impl PipelineOptions {
    /// Options with default tuning for the given output directory.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let defaults = Config::default();
        Self {
            output_dir: output_dir.into(),
            worker_count: DEFAULT_WORKER_COUNT,
            on_malformed: defaults.extract.on_malformed,
            read_buffer_size: defaults.performance.read_buffer_size,
        }
    }

    /// Options taken from a loaded configuration.
    pub fn from_config(config: &Config, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            worker_count: config.extract.worker_count,
            on_malformed: config.extract.on_malformed,
            read_buffer_size: config.performance.read_buffer_size,
        }
    }
}

/// A scanner wired to a running decode pool.
///
/// Every record the scanner finds is submitted to the pool. Independent
/// pipelines share nothing, so several can run in one process.
pub struct Pipeline {
    scanner: AttachmentScanner,
    pool: DecodePool,
}

impl Pipeline {
    /// Start the decode workers. The output directory must exist.
    pub fn start(options: &PipelineOptions) -> Result<Self> {
        let scanner = AttachmentScanner::new(options.on_malformed)
            .with_buffer_size(options.read_buffer_size);
        let pool = DecodePool::start(&options.output_dir, options.worker_count)?;
        Ok(Self { scanner, pool })
    }

    /// Scan one email file, queueing its attachments.
    pub fn scan_file(&self, path: &Path) -> Result<ScanReport> {
        self.scanner
            .scan_file(path, &mut |record| self.pool.submit(record))
    }

    /// Wait for all queued attachments, then stop the workers.
    pub fn finish(self) -> PoolReport {
        self.pool.wait();
        self.pool.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.extract.worker_count = 9;
        config.extract.on_malformed = FaultPolicy::Abort;
        let options = PipelineOptions::from_config(&config, "/tmp/out");
        assert_eq!(options.worker_count, 9);
        assert_eq!(options.on_malformed, FaultPolicy::Abort);
        assert_eq!(options.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_independent_pipelines() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let mail = a.path().join("m.eml");
        std::fs::write(
            &mail,
            "Content-Type: multipart/mixed; boundary=B\n\
             Content-Disposition: attachment; filename=t.txt\n\
             X-Attachment-Id: one\n\naGk=\n--B--\n",
        )
        .unwrap();

        let first = Pipeline::start(&PipelineOptions::new(a.path())).unwrap();
        let second = Pipeline::start(&PipelineOptions::new(b.path())).unwrap();
        first.scan_file(&mail).unwrap();
        second.scan_file(&mail).unwrap();

        assert_eq!(first.finish().written.len(), 1);
        assert_eq!(second.finish().written.len(), 1);
        assert_eq!(std::fs::read(a.path().join("one_t.txt")).unwrap(), b"hi");
        assert_eq!(std::fs::read(b.path().join("one_t.txt")).unwrap(), b"hi");
    }
}
