//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::{History, Snapshot};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes must be atomic: a failed save leaves the previous document intact.
pub trait Storage {
    /// Loads the latest snapshot, if one has been published
    fn load_snapshot(&self) -> StorageResult<Option<Snapshot>>;

    /// Replaces the published snapshot
    fn save_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()>;

    /// Loads the history ledger
    ///
    /// A missing document is an empty history, not an error.
    fn load_history(&self) -> StorageResult<History>;

    /// Replaces the history ledger
    fn save_history(&self, history: &History) -> StorageResult<()>;

    /// Moves an unreadable history document aside so it is never overwritten
    ///
    /// Returns where it was moved, or `None` if there was nothing to move.
    fn set_aside_history(&self) -> StorageResult<Option<PathBuf>>;
}
