//! Core data model types: attachment records and recorded faults.

pub mod attachment;
pub mod fault;
