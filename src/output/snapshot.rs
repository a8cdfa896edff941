//! Run snapshot document
//!
//! The snapshot is the full result of the latest run. It replaces the
//! previous snapshot wholesale; nothing is merged across runs.

use crate::state::{ErrorKind, SiteRunResult, UrlProbe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// The latest run, as published to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub summary: SnapshotSummary,
    pub sites: BTreeMap<String, SiteSnapshot>,
}

/// Site counts; `success_sites + failed_sites == total_sites`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub total_sites: usize,
    pub success_sites: usize,
    pub failed_sites: usize,
}

/// Whether a site ended up with a best URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    Success,
    Failed,
}

/// One site in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub site_name: String,
    pub best_url: Option<String>,
    pub status: SiteStatus,
    /// Best first, then by latency, failures last
    pub urls: Vec<UrlSnapshot>,
}

/// One probed URL in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlSnapshot {
    pub url: String,
    pub latency: Option<f64>,
    pub has_keyword: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    pub is_best: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Snapshot {
    /// Returns true if the summary counts agree with the site details
    pub fn is_consistent(&self) -> bool {
        let success = self
            .sites
            .values()
            .filter(|s| s.status == SiteStatus::Success)
            .count();
        self.summary.total_sites == self.sites.len()
            && self.summary.success_sites == success
            && self.summary.success_sites + self.summary.failed_sites == self.summary.total_sites
    }
}

/// Builds the snapshot for a completed run
///
/// # Arguments
///
/// * `results` - One result per processed site
/// * `timestamp` - When the run was recorded
pub fn build_snapshot(results: &[SiteRunResult], timestamp: DateTime<Utc>) -> Snapshot {
    let mut sites = BTreeMap::new();
    for result in results {
        sites.insert(result.site_name.clone(), site_snapshot(result));
    }

    let success_sites = sites
        .values()
        .filter(|s: &&SiteSnapshot| s.status == SiteStatus::Success)
        .count();

    Snapshot {
        timestamp,
        summary: SnapshotSummary {
            total_sites: sites.len(),
            success_sites,
            failed_sites: sites.len() - success_sites,
        },
        sites,
    }
}

fn site_snapshot(result: &SiteRunResult) -> SiteSnapshot {
    let mut urls: Vec<UrlSnapshot> = result
        .url_results
        .iter()
        .map(|r| url_snapshot(r, result))
        .collect();
    sort_url_entries(&mut urls);

    SiteSnapshot {
        site_name: result.site_name.clone(),
        best_url: result.best_url.clone(),
        status: if result.is_success() {
            SiteStatus::Success
        } else {
            SiteStatus::Failed
        },
        urls,
    }
}

fn url_snapshot(url_result: &UrlProbe, site: &SiteRunResult) -> UrlSnapshot {
    let outcome = &url_result.outcome;
    UrlSnapshot {
        url: url_result.url.clone(),
        latency: outcome.latency.map(round_latency),
        has_keyword: outcome.has_keyword,
        weight: url_result.weight,
        is_best: site.best_url.as_deref() == Some(url_result.url.as_str()),
        error_type: outcome.error_kind(),
        error_detail: outcome.error_detail().map(str::to_string),
    }
}

/// Orders URL entries: best first, then measured latency ascending, then
/// entries without latency
///
/// The sort is stable, so entries that compare equal keep probe order.
pub fn sort_url_entries(urls: &mut [UrlSnapshot]) {
    urls.sort_by(|a, b| {
        b.is_best
            .cmp(&a.is_best)
            .then_with(|| a.latency.is_none().cmp(&b.latency.is_none()))
            .then_with(|| match (a.latency, b.latency) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => Ordering::Equal,
            })
    });
}

/// Rounds a latency to two decimals for publication
pub fn round_latency(latency: f64) -> f64 {
    (latency * 100.0).round() / 100.0
}
