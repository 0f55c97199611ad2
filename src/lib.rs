//! `maildetach` — extract base64 attachments from raw email files.
//!
//! The core is a line-oriented scanner that finds attachment blocks in a
//! single email file, and a bounded pool of decode workers that write each
//! attachment to its own file. [`extract::extract_tree`] drives both over a
//! directory tree.

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod pipeline;
