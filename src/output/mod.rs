//! Output module for recording runs and generating reports
//!
//! This module handles:
//! - Building the per-run snapshot document
//! - Maintaining the bounded per-URL history
//! - Recording both through a storage backend
//! - Trend statistics and markdown summaries

pub mod history;
mod markdown;
mod recorder;
pub mod snapshot;
pub mod stats;

pub use history::{History, HistoryRecord, UrlStatus};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use recorder::Recorder;
pub use snapshot::{build_snapshot, SiteSnapshot, SiteStatus, Snapshot, SnapshotSummary, UrlSnapshot};
pub use stats::{compute_trends, print_statistics, UrlTrend};

use thiserror::Error;

/// Errors that can occur while producing reports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
