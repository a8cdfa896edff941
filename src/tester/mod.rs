//! Tester module for probing sites and choosing their best URLs
//!
//! This module contains the core testing logic, including:
//! - HTTP probing with retries and content validation
//! - Best-URL selection per site
//! - Pacing between probes of the same site
//! - Overall run coordination

mod content;
mod coordinator;
mod pacer;
mod prober;
mod selector;

pub use content::{contains_keyword, extract_title, MAX_DETAIL_CHARS};
pub use coordinator::{run_tester, Coordinator, RunReport};
pub use pacer::Pacer;
pub use prober::{build_http_client, HttpProber, Probe, ProbeSettings, RetryPolicy};
pub use selector::{fastest_valid, rank_weighted, ranking_mode, select_best_url};
