//! Line-oriented attachment scanner.
//!
//! Reads one email file sequentially with a reusable line buffer and emits
//! an [`AttachmentRecord`] for every base64 attachment block it recognizes.
//! Only the body of the attachment currently being collected is held in
//! memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use tracing::{debug, warn};

use crate::config::FaultPolicy;
use crate::error::{DetachError, Result};
use crate::model::attachment::AttachmentRecord;
use crate::model::fault::Fault;
use crate::parser::headers::{AttachmentHeader, HeaderState};

/// Default size of the internal read buffer.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of scanning one file.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Number of records handed to the emit callback.
    pub emitted: usize,
    /// Attachments dropped under [`FaultPolicy::Skip`].
    pub faults: Vec<Fault>,
}

/// Finds attachment blocks in raw email files.
#[derive(Debug, Clone)]
pub struct AttachmentScanner {
    policy: FaultPolicy,
    buffer_size: usize,
}

impl Default for AttachmentScanner {
    fn default() -> Self {
        Self::new(FaultPolicy::default())
    }
}

impl AttachmentScanner {
    /// Create a scanner with the given malformed-body policy.
    pub fn new(policy: FaultPolicy) -> Self {
        Self {
            policy,
            buffer_size: READ_BUFFER_SIZE,
        }
    }

    /// Override the read buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Scan the file at `path`, calling `emit` for every attachment found.
    ///
    /// `emit` may block (a full work queue does); an error it returns stops
    /// the scan and is passed through.
    ///
    /// A file that cannot be opened yields [`DetachError::CannotOpen`] and
    /// nothing is emitted.
    pub fn scan_file(
        &self,
        path: impl AsRef<Path>,
        emit: &mut dyn FnMut(AttachmentRecord) -> Result<()>,
    ) -> Result<ScanReport> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DetachError::CannotOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::with_capacity(self.buffer_size, file);
        self.scan_reader(path, reader, emit)
    }

    /// Scan an already-open reader. `origin` is only used for diagnostics.
    pub fn scan_reader<R: BufRead>(
        &self,
        origin: &Path,
        mut reader: R,
        emit: &mut dyn FnMut(AttachmentRecord) -> Result<()>,
    ) -> Result<ScanReport> {
        let mut report = ScanReport::default();
        let mut state = HeaderState::default();
        let mut line: Vec<u8> = Vec::with_capacity(4096);

        while next_line(&mut reader, &mut line).map_err(|e| DetachError::io(origin, e))? {
            state = state.advance(&String::from_utf8_lossy(&line));

            let Some(header) = state.complete() else {
                continue;
            };

            let body = collect_body(&mut reader, &mut line, &header)
                .map_err(|e| DetachError::io(origin, e))?;

            if !body.terminated {
                warn!(
                    path = %origin.display(),
                    id = %header.id,
                    "Attachment body reached end of file without a closing boundary"
                );
            }

            if let Err(e) = BASE64_STANDARD.decode(&body.data) {
                let err = DetachError::InvalidBase64 {
                    id: header.id.clone(),
                    filename: header.filename.clone(),
                    reason: e.to_string(),
                };
                match self.policy {
                    FaultPolicy::Abort => return Err(err),
                    FaultPolicy::Skip => {
                        warn!(
                            path = %origin.display(),
                            id = %header.id,
                            error = %err,
                            "Skipping malformed attachment"
                        );
                        report
                            .faults
                            .push(Fault::attachment(origin, header.id, &err));
                        continue;
                    }
                }
            }

            debug!(
                path = %origin.display(),
                id = %header.id,
                filename = %header.filename,
                encoded_len = body.data.len(),
                "Found attachment"
            );

            emit(AttachmentRecord::new(header.id, header.filename, body.data))?;
            report.emitted += 1;
        }

        Ok(report)
    }
}

/// Encoded body of one attachment.
struct Body {
    data: Vec<u8>,
    /// `false` when end of file came before the closing delimiter.
    terminated: bool,
}

/// Skip the blank separator line, then gather lines up to the delimiter.
fn collect_body<R: BufRead>(
    reader: &mut R,
    line: &mut Vec<u8>,
    header: &AttachmentHeader,
) -> std::io::Result<Body> {
    let mut data = Vec::new();

    if !next_line(reader, line)? {
        return Ok(Body {
            data,
            terminated: false,
        });
    }

    let delimiter = header.delimiter.as_bytes();
    while next_line(reader, line)? {
        if line.starts_with(delimiter) {
            return Ok(Body {
                data,
                terminated: true,
            });
        }
        data.extend_from_slice(line.trim_ascii());
    }

    Ok(Body {
        data,
        terminated: false,
    })
}

/// Read one line into `buf` without its line ending. Returns `false` at EOF.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(true)
}
