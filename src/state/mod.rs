//! State module for probe results
//!
//! This module defines the values that flow from the prober up to the
//! recorder during a single run.
//!
//! # Components
//!
//! - `ErrorKind`: The closed set of probe failure classifications
//! - `ProbeOutcome`: The result of probing one URL
//! - `SiteRunResult`: All probe outcomes of one site plus its best URL
//! - `Site` / `SiteContext`: A site's candidates and its probe settings

mod error_kind;
mod outcome;
mod site;

// Re-export main types
pub use error_kind::ErrorKind;
pub use outcome::{ProbeError, ProbeOutcome, RankingMode, SiteRunResult, UrlProbe};
pub use site::{Site, SiteContext};
