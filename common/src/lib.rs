//! Shared records and the pure parts of the monitoring pipeline.
//!
//! Everything here is free of I/O: the typed target/result records, the
//! snapshot change detector and the visa evidence scanner. The `monitor`
//! crate wires them to the network and the filesystem.

pub mod detect;
pub mod error;
pub mod model;
pub mod visa;

pub use detect::detect_change;
pub use error::ValidationError;
pub use model::{validate_targets, ResultRow, RunStatus, Target, TargetKey, VisaVerdict};
pub use visa::{split_sentences, VisaEvidence, VisaScanner};
