//! Attachment discovery: header recognition and the line scanner.

pub mod headers;
pub mod scanner;
