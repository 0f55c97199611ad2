//! Attachment header recognition.
//!
//! Header lines are matched by exact, case-sensitive prefix. This is not a
//! MIME parser: it only knows the handful of headers needed to find a
//! base64 attachment inside a `multipart/mixed` message.

/// Inline boundary declaration.
pub const HEADER_MULTIPART_BOUNDARY: &str = "Content-Type: multipart/mixed; boundary=";
/// Multipart declaration whose boundary may follow on its own line.
pub const HEADER_MULTIPART: &str = "Content-Type: multipart/mixed;";
/// Standalone boundary line (folded continuation of the content type).
pub const HEADER_BOUNDARY: &str = "boundary=";
/// Attachment filename.
pub const HEADER_DISPOSITION: &str = "Content-Disposition: attachment; filename=";
/// Attachment id.
pub const HEADER_ATTACHMENT_ID: &str = "X-Attachment-Id:";

/// Scanner state carried from one line to the next.
///
/// A value is threaded through [`advance`](Self::advance) for every line.
/// Once [`is_complete`](Self::is_complete) holds, [`complete`](Self::complete)
/// hands out the attachment header and clears the per-attachment fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderState {
    boundary: String,
    multipart: bool,
    attach_id: String,
    attach_name: String,
}

/// Header block of one attachment, ready for body collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentHeader {
    pub id: String,
    pub filename: String,
    /// Delimiter line prefix, `--<boundary>`.
    pub delimiter: String,
}

impl HeaderState {
    /// Fold one line into the state.
    pub fn advance(mut self, line: &str) -> Self {
        let line = line.trim();

        if let Some(value) = line.strip_prefix(HEADER_MULTIPART_BOUNDARY) {
            self.boundary = parameter_value(value);
        }

        if line.starts_with(HEADER_MULTIPART) {
            self.multipart = true;
        }

        if self.multipart {
            if let Some(value) = line.strip_prefix(HEADER_BOUNDARY) {
                self.boundary = parameter_value(value);
            }
        }

        if let Some(value) = line.strip_prefix(HEADER_DISPOSITION) {
            self.attach_name = parameter_value(value);
        }

        if let Some(value) = line.strip_prefix(HEADER_ATTACHMENT_ID) {
            self.attach_id = value.trim_matches(' ').to_string();
        }

        self
    }

    /// `true` when id, filename and boundary are all known.
    pub fn is_complete(&self) -> bool {
        !self.attach_id.is_empty() && !self.attach_name.is_empty() && !self.boundary.is_empty()
    }

    /// Take the completed header, resetting id and filename.
    ///
    /// The boundary is kept: further attachments in the same message are
    /// delimited by it too.
    pub fn complete(&mut self) -> Option<AttachmentHeader> {
        if !self.is_complete() {
            return None;
        }
        Some(AttachmentHeader {
            id: std::mem::take(&mut self.attach_id),
            filename: std::mem::take(&mut self.attach_name),
            delimiter: format!("--{}", self.boundary),
        })
    }

    /// Current boundary, without the `--` prefix.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Whether a multipart content type has been seen.
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }
}

/// Extract a header parameter value, quotes stripped.
///
/// A quoted value ends at its closing quote; an unquoted one at the first
/// `;`. Any quote characters left over are removed.
fn parameter_value(raw: &str) -> String {
    let raw = raw.trim();
    let value = match raw.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(rest),
        None => raw.split(';').next().unwrap_or(raw).trim_end(),
    };
    value.replace('"', "")
}
