//! Configuration module for Site-Pulse
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every option has a default, so an empty file yields a usable configuration.
//!
//! # Example
//!
//! ```no_run
//! use site_pulse::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-pulse.toml")).unwrap();
//! println!("History limit: {}", config.tester.history_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    redact_url, Config, OutputConfig, ProxyConfig, ProxyUrls, SitesConfig, SourceConfig,
    TesterConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
