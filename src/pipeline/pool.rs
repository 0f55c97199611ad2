//! Decode worker pool.
//!
//! A fixed number of threads pull [`AttachmentRecord`]s from a bounded
//! queue, decode them, and write each one to its own file. The queue
//! capacity equals the worker count, so a producer blocks once that many
//! records are waiting.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{DetachError, Result};
use crate::model::attachment::AttachmentRecord;
use crate::model::fault::Fault;
use crate::pipeline::tracker::CompletionTracker;

/// A decoded attachment that made it to disk.
#[derive(Debug, Clone)]
pub struct WrittenAttachment {
    pub path: PathBuf,
    pub bytes: u64,
}

/// What the workers did, merged once the pool is shut down.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PoolReport {
    pub written: Vec<PathBuf>,
    pub bytes_written: u64,
    pub faults: Vec<Fault>,
}

impl PoolReport {
    fn merge(&mut self, other: PoolReport) {
        self.written.extend(other.written);
        self.bytes_written += other.bytes_written;
        self.faults.extend(other.faults);
    }
}

/// Fixed-size pool of decode workers fed by a bounded queue.
///
/// Dropping the pool closes the queue and joins the workers; use
/// [`shutdown`](Self::shutdown) to get their reports back.
pub struct DecodePool {
    sender: Option<Sender<AttachmentRecord>>,
    workers: Vec<JoinHandle<PoolReport>>,
    tracker: CompletionTracker,
    output_dir: PathBuf,
}

impl DecodePool {
    /// Start `worker_count` workers writing into `output_dir`.
    ///
    /// The directory must already exist. A count of zero is treated as one.
    pub fn start(output_dir: impl Into<PathBuf>, worker_count: usize) -> Result<Self> {
        let output_dir = output_dir.into();
        let worker_count = worker_count.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(worker_count);
        let tracker = CompletionTracker::new();

        let mut pool = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(worker_count),
            tracker,
            output_dir,
        };

        for i in 0..worker_count {
            let receiver = receiver.clone();
            let tracker = pool.tracker.clone();
            let dir = pool.output_dir.clone();
            let handle = thread::Builder::new()
                .name(format!("decode-{i}"))
                .spawn(move || run_worker(receiver, tracker, dir))
                .map_err(DetachError::Spawn)?;
            pool.workers.push(handle);
        }

        debug!(
            workers = worker_count,
            output_dir = %pool.output_dir.display(),
            "Decode pool started"
        );
        Ok(pool)
    }

    /// Queue a record for decoding, blocking while the queue is full.
    ///
    /// The record is counted as pending before it is queued.
    pub fn submit(&self, record: AttachmentRecord) -> Result<()> {
        let sender = self.sender.as_ref().ok_or(DetachError::PoolClosed)?;
        self.tracker.add();
        if sender.send(record).is_err() {
            self.tracker.done();
            return Err(DetachError::PoolClosed);
        }
        Ok(())
    }

    /// Handle on the pending-work counter.
    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Block until every submitted record has been handled.
    pub fn wait(&self) {
        self.tracker.wait();
    }

    /// Close the queue, let the workers drain it, and collect their reports.
    pub fn shutdown(mut self) -> PoolReport {
        self.close()
    }

    fn close(&mut self) -> PoolReport {
        // Workers leave their receive loop once the last sender is gone.
        drop(self.sender.take());

        let mut report = PoolReport::default();
        for handle in self.workers.drain(..) {
            match handle.join() {
                Ok(worker_report) => report.merge(worker_report),
                Err(_) => warn!("Decode worker panicked"),
            }
        }
        report
    }
}

impl Drop for DecodePool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.close();
        }
    }
}

fn run_worker(
    receiver: Receiver<AttachmentRecord>,
    tracker: CompletionTracker,
    output_dir: PathBuf,
) -> PoolReport {
    let mut report = PoolReport::default();

    for mut record in receiver.iter() {
        let _done = tracker.guard();

        match decode_record(&mut record, &output_dir) {
            Ok(written) => {
                debug!(
                    id = %record.id,
                    path = %written.path.display(),
                    bytes = written.bytes,
                    "Wrote attachment"
                );
                report.bytes_written += written.bytes;
                report.written.push(written.path);
            }
            Err(e) => {
                warn!(
                    id = %record.id,
                    filename = %record.filename,
                    error = %e,
                    "Failed to extract attachment"
                );
                report.faults.push(Fault::attachment(
                    record.output_path(&output_dir),
                    record.id.as_str(),
                    &e,
                ));
            }
        }
    }

    report
}

/// Decode one record and write it to its output file.
///
/// The output handle is closed on every path. If the write fails, a file
/// created here is removed rather than left truncated.
pub fn decode_record(record: &mut AttachmentRecord, output_dir: &Path) -> Result<WrittenAttachment> {
    let data = BASE64_STANDARD
        .decode(&record.body)
        .map_err(|e| DetachError::InvalidBase64 {
            id: record.id.clone(),
            filename: record.filename.clone(),
            reason: e.to_string(),
        })?;

    let path = record.output_path(output_dir);
    let created_here = !record.has_output();
    let result = record.output_writer(output_dir)?.write_all(&data);
    record.close_output();

    if let Err(source) = result {
        if created_here {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove partial output");
            }
        }
        return Err(DetachError::WriteOutput { path, source });
    }

    Ok(WrittenAttachment {
        path,
        bytes: data.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    #[test]
    fn test_decode_record_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let data = payload(174);
        let encoded = BASE64_STANDARD.encode(&data);
        assert_eq!(encoded.len(), 232);

        let mut record = AttachmentRecord::new("abc123", "name.zip", encoded.into_bytes());
        let written = decode_record(&mut record, tmp.path()).unwrap();

        assert_eq!(written.bytes, 174);
        assert_eq!(written.path, tmp.path().join("abc123_name.zip"));
        assert!(!record.has_output());
        assert_eq!(std::fs::read(&written.path).unwrap(), data);
    }

    #[test]
    fn test_decode_record_into_supplied_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("dec_out");
        let file = std::fs::File::create(&target).unwrap();
        let encoded = BASE64_STANDARD.encode(payload(174));

        let mut record =
            AttachmentRecord::new("abc123", "name.zip", encoded.into_bytes()).with_output(file);
        decode_record(&mut record, tmp.path()).unwrap();

        assert_eq!(std::fs::read(&target).unwrap().len(), 174);
        assert!(!tmp.path().join("abc123_name.zip").exists());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let encoded = BASE64_STANDARD.encode(payload(1000)).into_bytes();

        let mut first = AttachmentRecord::new("a", "x", encoded.clone());
        let mut second = AttachmentRecord::new("b", "x", encoded);
        let a = decode_record(&mut first, tmp.path()).unwrap();
        let b = decode_record(&mut second, tmp.path()).unwrap();

        assert_eq!(
            std::fs::read(a.path).unwrap(),
            std::fs::read(b.path).unwrap()
        );
    }

    #[test]
    fn test_decode_record_invalid_base64() {
        let tmp = tempfile::tempdir().unwrap();
        let mut record = AttachmentRecord::new("bad", "x.bin", b"@@@@".to_vec());
        let err = decode_record(&mut record, tmp.path()).unwrap_err();
        assert!(matches!(err, DetachError::InvalidBase64 { .. }));
        assert!(!tmp.path().join("bad_x.bin").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_fault_closes_supplied_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let full = std::fs::File::options()
            .write(true)
            .open("/dev/full")
            .unwrap();
        let encoded = BASE64_STANDARD.encode(payload(174));

        let mut record =
            AttachmentRecord::new("full", "x.bin", encoded.into_bytes()).with_output(full);
        let err = decode_record(&mut record, tmp.path()).unwrap_err();

        assert!(matches!(err, DetachError::WriteOutput { .. }));
        assert!(!err.is_fatal());
        assert!(!record.has_output());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_fault_removes_created_output() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("full_x.bin");
        std::os::unix::fs::symlink("/dev/full", &target).unwrap();
        let encoded = BASE64_STANDARD.encode(payload(174));

        let mut record = AttachmentRecord::new("full", "x.bin", encoded.into_bytes());
        let err = decode_record(&mut record, tmp.path()).unwrap_err();

        assert!(matches!(err, DetachError::WriteOutput { ref path, .. } if *path == target));
        assert!(!record.has_output());
        assert!(std::fs::symlink_metadata(&target).is_err());
        assert!(Path::new("/dev/full").exists());
    }

    #[test]
    fn test_pool_processes_many_records_under_backpressure() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DecodePool::start(tmp.path(), 2).unwrap();
        assert_eq!(pool.worker_count(), 2);

        for i in 0..50 {
            let body = BASE64_STANDARD.encode(payload(i + 1)).into_bytes();
            pool.submit(AttachmentRecord::new(format!("id{i}"), "p.bin", body))
                .unwrap();
        }
        pool.wait();
        assert_eq!(pool.tracker().pending(), 0);

        let report = pool.shutdown();
        assert_eq!(report.written.len(), 50);
        assert!(report.faults.is_empty());
        assert_eq!(report.bytes_written, (1..=50).sum::<usize>() as u64);
        assert_eq!(std::fs::read(tmp.path().join("id9_p.bin")).unwrap(), payload(10));
    }

    #[test]
    fn test_pool_counts_failures_as_done() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing");
        let pool = DecodePool::start(&missing, 3).unwrap();

        pool.submit(AttachmentRecord::new("a", "x", b"AAAA".to_vec()))
            .unwrap();
        pool.submit(AttachmentRecord::new("b", "y", b"not base64!".to_vec()))
            .unwrap();
        pool.wait();

        let report = pool.shutdown();
        assert!(report.written.is_empty());
        assert_eq!(report.faults.len(), 2);
    }

    #[test]
    fn test_pool_with_no_work_shuts_down() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = DecodePool::start(tmp.path(), 0).unwrap();
        assert_eq!(pool.worker_count(), 1);
        pool.wait();
        let report = pool.shutdown();
        assert!(report.written.is_empty());
    }
}
