//! Site-Pulse: a polite mirror health prober
//!
//! This crate probes the candidate URLs of named sites, validates that each
//! answers with genuine content, picks one best URL per site and keeps a
//! bounded per-URL health history for trend reporting.

pub mod config;
pub mod output;
pub mod sources;
pub mod state;
pub mod storage;
pub mod tester;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Pulse operations
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Site source error: {0}")]
    Source(String),

    #[error("Site '{site}' has no candidate URLs")]
    NoCandidates { site: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty URL")]
    Empty,
}

/// Result type alias for Site-Pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{ErrorKind, ProbeOutcome, Site, SiteRunResult};
pub use tester::{run_tester, Coordinator, RunReport};
pub use url::build_test_url;
