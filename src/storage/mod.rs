//! Storage module for persisting run documents
//!
//! Two JSON documents are kept on disk:
//! - the latest snapshot, replaced wholesale on every run
//! - the bounded per-URL history, read-modify-written on every run
//!
//! Both are written atomically so readers never observe a partial file.

mod json;
mod traits;

pub use json::JsonStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::OutputConfig;

/// Opens the JSON storage described by the output configuration
pub fn open_storage(output: &OutputConfig) -> JsonStorage {
    JsonStorage::from_config(output)
}
