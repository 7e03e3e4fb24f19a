//! Career Page Monitor
//!
//! Fetches each registered career page, compares it with the previous
//! snapshot, scans it for visa sponsorship evidence, archives changed pages
//! and appends the outcome to `results.csv`.

pub mod archive;
pub mod config;
pub mod error;
pub mod external;
pub mod fetch;
pub mod overview;
pub mod pipeline;
pub mod registry;
pub mod results;
pub mod snapshot;
pub mod table;
pub mod text;

pub use archive::{ArchiveOutcome, Archiver};
pub use config::MonitorConfig;
pub use error::{ExternalError, FetchError, MonitorError, Result};
pub use fetch::{HttpFetcher, PageFetcher};
pub use overview::{overview, Overview};
pub use pipeline::{MonitorContext, RunOptions, RunReport, SyncDirection};
pub use registry::{SyncSummary, TargetRegistry};
pub use results::{export_csv, HistoryEntry, HistoryFilter, ResultLog};
