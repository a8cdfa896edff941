//! Bounded per-URL health history
//!
//! Each (site, URL) pair keeps its records oldest-first. Every run appends
//! one record per probed URL and evicts from the front once the list grows
//! past the limit. Pairs not probed in a run are left alone.
//!
//! Loading is lenient. Timestamps without an offset are read as UTC, and a
//! malformed record is dropped on its own instead of invalidating the file.

use crate::state::SiteRunResult;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Up/down state of a URL at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStatus {
    Up,
    Down,
}

/// One observation of one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub status: UrlStatus,
    pub latency: Option<f64>,
    pub is_best: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Parses an RFC 3339 timestamp, or an ISO 8601 one without offset as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

/// Site → URL → records, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    sites: BTreeMap<String, BTreeMap<String, Vec<HistoryRecord>>>,
}

impl<'de> Deserialize<'de> for History {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_loose(raw))
    }
}

impl History {
    /// Creates an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps every well-formed record of a loosely typed document
    fn from_loose(raw: BTreeMap<String, Value>) -> Self {
        let mut sites = BTreeMap::new();
        let mut dropped = 0usize;

        for (site, urls) in raw {
            let Value::Object(urls) = urls else {
                tracing::warn!(
                    site = %site,
                    step = "history",
                    "Ignoring non-object site entry"
                );
                continue;
            };

            let mut kept = BTreeMap::new();
            for (url, records) in urls {
                let Value::Array(records) = records else {
                    tracing::warn!(
                        site = %site,
                        url = %url,
                        step = "history",
                        "Ignoring non-array record list"
                    );
                    continue;
                };

                let parsed: Vec<HistoryRecord> = records
                    .into_iter()
                    .filter_map(|record| match serde_json::from_value(record) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::debug!(
                                site = %site,
                                url = %url,
                                step = "history",
                                "Bad record: {}",
                                e
                            );
                            dropped += 1;
                            None
                        }
                    })
                    .collect();
                if !parsed.is_empty() {
                    kept.insert(url, parsed);
                }
            }

            if !kept.is_empty() {
                sites.insert(site, kept);
            }
        }

        if dropped > 0 {
            tracing::warn!(step = "history", dropped, "Dropped malformed history records");
        }

        Self { sites }
    }

    /// Returns the records of one (site, URL) pair, oldest first
    pub fn records(&self, site: &str, url: &str) -> &[HistoryRecord] {
        self.sites
            .get(site)
            .and_then(|urls| urls.get(url))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterates over every (site, URL, records) triple
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[HistoryRecord])> {
        self.sites.iter().flat_map(|(site, urls)| {
            urls.iter()
                .map(move |(url, records)| (site.as_str(), url.as_str(), records.as_slice()))
        })
    }

    /// Number of tracked sites
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Returns true if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Appends one record and evicts the oldest records beyond `limit`
    pub fn push(&mut self, site: &str, url: &str, record: HistoryRecord, limit: usize) {
        let records = self
            .sites
            .entry(site.to_string())
            .or_default()
            .entry(url.to_string())
            .or_default();

        records.push(record);
        if records.len() > limit {
            let excess = records.len() - limit;
            records.drain(..excess);
        }
    }

    /// Folds a run's results into the history
    ///
    /// # Arguments
    ///
    /// * `results` - One result per processed site
    /// * `timestamp` - Shared timestamp of every record appended by this run
    /// * `limit` - Maximum records kept per (site, URL)
    ///
    /// # Returns
    ///
    /// The number of records appended
    pub fn append_run(
        &mut self,
        results: &[SiteRunResult],
        timestamp: DateTime<Utc>,
        limit: usize,
    ) -> usize {
        let mut appended = 0;
        for site in results {
            for url_result in &site.url_results {
                let outcome = &url_result.outcome;
                let record = HistoryRecord {
                    timestamp,
                    status: if outcome.latency.is_some() {
                        UrlStatus::Up
                    } else {
                        UrlStatus::Down
                    },
                    latency: outcome.latency,
                    is_best: site.best_url.as_deref() == Some(url_result.url.as_str()),
                    error_detail: outcome.error_detail().map(str::to_string),
                };
                self.push(&site.site_name, &url_result.url, record, limit);
                appended += 1;
            }
        }
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ErrorKind, ProbeOutcome, RankingMode, UrlProbe};
    use chrono::{Duration, TimeZone};

    fn run_result(latency: Option<f64>) -> Vec<SiteRunResult> {
        let outcome = match latency {
            Some(latency) => ProbeOutcome::success(latency),
            None => ProbeOutcome::failure(ErrorKind::Timeout, "request timed out (>15s)"),
        };
        vec![SiteRunResult {
            site_name: "Alpha".to_string(),
            best_url: latency.map(|_| "https://a.example".to_string()),
            mode: RankingMode::Single,
            url_results: vec![UrlProbe {
                url: "https://a.example".to_string(),
                outcome,
                weight: None,
            }],
        }]
    }

    fn run_time(run: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::hours(run)
    }

    #[test]
    fn test_append_run_records_status() {
        let mut history = History::new();
        history.append_run(&run_result(Some(0.3)), run_time(1), 24);
        history.append_run(&run_result(None), run_time(2), 24);

        let records = history.records("Alpha", "https://a.example");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].status, UrlStatus::Up);
        assert_eq!(records[0].latency, Some(0.3));
        assert!(records[0].is_best);
        assert!(records[0].error_detail.is_none());

        assert_eq!(records[1].status, UrlStatus::Down);
        assert!(records[1].latency.is_none());
        assert!(!records[1].is_best);
        assert_eq!(
            records[1].error_detail.as_deref(),
            Some("request timed out (>15s)")
        );
    }

    #[test]
    fn test_limit_evicts_oldest_first() {
        let mut history = History::new();
        for run in 1..=4 {
            history.append_run(&run_result(Some(run as f64)), run_time(run), 3);
        }

        let records = history.records("Alpha", "https://a.example");
        let runs: Vec<DateTime<Utc>> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(runs, vec![run_time(2), run_time(3), run_time(4)]);
    }

    #[test]
    fn test_untouched_pairs_are_kept() {
        let mut history = History::new();
        let record = HistoryRecord {
            timestamp: run_time(0),
            status: UrlStatus::Up,
            latency: Some(0.1),
            is_best: true,
            error_detail: None,
        };
        history.push("Alpha", "https://old.example", record, 3);

        for run in 1..=5 {
            history.append_run(&run_result(None), run_time(run), 3);
        }

        assert_eq!(history.records("Alpha", "https://old.example").len(), 1);
        assert_eq!(history.records("Alpha", "https://a.example").len(), 3);
    }

    #[test]
    fn test_shrinking_limit_trims_on_next_append() {
        let mut history = History::new();
        for run in 1..=5 {
            history.append_run(&run_result(Some(0.2)), run_time(run), 10);
        }
        history.append_run(&run_result(Some(0.2)), run_time(6), 2);

        let records = history.records("Alpha", "https://a.example");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].timestamp, run_time(6));
    }

    #[test]
    fn test_json_shape() {
        let mut history = History::new();
        history.append_run(&run_result(None), run_time(1), 24);

        let json = serde_json::to_value(&history).unwrap();
        let record = &json["Alpha"]["https://a.example"][0];
        assert_eq!(record["status"], "down");
        assert!(record["latency"].is_null());
        assert_eq!(record["is_best"], false);

        let parsed: History = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, history);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2025-06-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T14:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01T12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-06-01 12:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-06-01T12:00:00.123456"),
            Some(expected + Duration::microseconds(123_456))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_loads_naive_timestamps() {
        let raw = r#"{"Alpha": {"https://old.example": [
            {"timestamp": "2025-06-01T12:00:00.123456", "status": "up", "latency": 0.4, "is_best": true}
        ]}}"#;

        let history: History = serde_json::from_str(raw).unwrap();
        let records = history.records("Alpha", "https://old.example");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, UrlStatus::Up);
        assert_eq!(
            records[0].timestamp,
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::microseconds(123_456)
        );
    }

    #[test]
    fn test_malformed_records_dropped_individually() {
        let raw = r#"{
            "Alpha": {
                "https://a.example": [
                    {"timestamp": "2025-06-01T12:00:00", "status": "up", "latency": 0.4, "is_best": true},
                    {"timestamp": "not a time", "status": "up", "latency": 0.4, "is_best": true},
                    {"timestamp": "2025-06-01T13:00:00", "status": "sideways", "latency": null, "is_best": false},
                    {"timestamp": "2025-06-01T14:00:00", "status": "down", "latency": null, "is_best": false}
                ],
                "https://b.example": "not a list"
            },
            "Beta": 42
        }"#;

        let history: History = serde_json::from_str(raw).unwrap();
        let records = history.records("Alpha", "https://a.example");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, UrlStatus::Down);
        assert!(history.records("Alpha", "https://b.example").is_empty());
        assert_eq!(history.site_count(), 1);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(serde_json::from_str::<History>("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_iter_and_counts() {
        let mut history = History::new();
        assert!(history.is_empty());
        history.append_run(&run_result(Some(0.2)), run_time(1), 24);

        assert_eq!(history.site_count(), 1);
        let entries: Vec<_> = history.iter().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "Alpha");
        assert_eq!(entries[0].1, "https://a.example");
    }
}
