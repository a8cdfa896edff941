//! Trend statistics from the snapshot and history documents
//!
//! This module provides functionality for deriving per-URL trends from
//! the history ledger and displaying them alongside the latest snapshot.

use crate::output::history::{History, UrlStatus};
use crate::output::snapshot::{SiteStatus, Snapshot};

/// Health trend of one (site, URL) pair over its retained history
#[derive(Debug, Clone, PartialEq)]
pub struct UrlTrend {
    pub site: String,
    pub url: String,

    /// Number of retained records
    pub samples: usize,

    /// Records with status `up`
    pub up: usize,

    /// `up / samples` as a percentage
    pub uptime_pct: f64,

    /// Mean latency over the `up` records that carry one
    pub avg_latency: Option<f64>,

    /// Status of the newest record
    pub last_status: Option<UrlStatus>,
}

/// Computes one trend per (site, URL) pair, in site then URL order
pub fn compute_trends(history: &History) -> Vec<UrlTrend> {
    history
        .iter()
        .map(|(site, url, records)| {
            let samples = records.len();
            let up = records
                .iter()
                .filter(|r| r.status == UrlStatus::Up)
                .count();

            let latencies: Vec<f64> = records
                .iter()
                .filter(|r| r.status == UrlStatus::Up)
                .filter_map(|r| r.latency)
                .collect();
            let avg_latency = if latencies.is_empty() {
                None
            } else {
                Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
            };

            let uptime_pct = if samples > 0 {
                (up as f64 / samples as f64) * 100.0
            } else {
                0.0
            };

            UrlTrend {
                site: site.to_string(),
                url: url.to_string(),
                samples,
                up,
                uptime_pct,
                avg_latency,
                last_status: records.last().map(|r| r.status),
            }
        })
        .collect()
}

/// Prints the latest snapshot and the history trends to stdout
///
/// # Arguments
///
/// * `snapshot` - The latest published snapshot, if any
/// * `history` - The history ledger
pub fn print_statistics(snapshot: Option<&Snapshot>, history: &History) {
    println!("=== Site Pulse Statistics ===\n");

    match snapshot {
        Some(snapshot) => {
            println!("Latest run: {}", snapshot.timestamp.to_rfc3339());
            println!("  Total sites: {}", snapshot.summary.total_sites);
            println!("  Succeeded: {}", snapshot.summary.success_sites);
            println!("  Failed: {}", snapshot.summary.failed_sites);
            println!();

            println!("Best URLs:");
            for (name, site) in &snapshot.sites {
                match (&site.best_url, site.status) {
                    (Some(best), SiteStatus::Success) => println!("  {}: {}", name, best),
                    _ => println!("  {}: (none)", name),
                }
            }
            println!();
        }
        None => {
            println!("No snapshot has been published yet.\n");
        }
    }

    let trends = compute_trends(history);
    if trends.is_empty() {
        println!("History is empty.");
        return;
    }

    println!("URL Trends ({} URLs):", trends.len());
    let mut current_site = "";
    for trend in &trends {
        if trend.site != current_site {
            println!("  {}", trend.site);
            current_site = &trend.site;
        }
        let latency = trend
            .avg_latency
            .map(|l| format!("{:.2}s", l))
            .unwrap_or_else(|| "-".to_string());
        let last = match trend.last_status {
            Some(UrlStatus::Up) => "up",
            Some(UrlStatus::Down) => "down",
            None => "-",
        };
        println!(
            "    {} uptime {:.1}% ({}/{}) avg {} last {}",
            trend.url, trend.uptime_pct, trend.up, trend.samples, latency, last
        );
    }
}
