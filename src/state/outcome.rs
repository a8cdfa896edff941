use crate::state::ErrorKind;
use std::fmt;

/// Classified failure of a single probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeError {
    pub kind: ErrorKind,
    /// Short human-readable explanation
    pub detail: String,
}

/// The final result of probing one URL, after any retries
///
/// `latency` is only present on success. A 200 response that lacks the
/// site's keyword is a failure: no latency, `has_keyword = false` and an
/// `invalid_content` error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// Seconds until the response headers arrived
    pub latency: Option<f64>,
    pub has_keyword: bool,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    /// Creates a successful outcome
    pub fn success(latency: f64) -> Self {
        Self {
            latency: Some(latency),
            has_keyword: true,
            error: None,
        }
    }

    /// Creates a failed outcome
    pub fn failure(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            latency: None,
            has_keyword: false,
            error: Some(ProbeError {
                kind,
                detail: detail.into(),
            }),
        }
    }

    /// Returns true if the URL is reachable and serves the expected content
    pub fn is_success(&self) -> bool {
        self.latency.is_some() && self.has_keyword && self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.detail.as_str())
    }
}

/// Ranking policy applied to a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMode {
    /// One candidate; probed directly without ranking
    Single,
    /// Operator weights order the probes and dominate latency
    Weighted,
    /// Lowest latency among keyword-valid URLs wins
    KeywordGated,
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Single => "single",
            Self::Weighted => "weighted",
            Self::KeywordGated => "keyword-gated",
        };
        f.write_str(name)
    }
}

/// Outcome of one probed candidate
#[derive(Debug, Clone, PartialEq)]
pub struct UrlProbe {
    /// The candidate URL as configured (without search path)
    pub url: String,
    pub outcome: ProbeOutcome,
    /// Effective weight; only set for weighted sites
    pub weight: Option<i64>,
}

/// Everything one run learned about one site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRunResult {
    pub site_name: String,
    pub best_url: Option<String>,
    pub mode: RankingMode,
    /// Probed candidates in probe order; skipped candidates are absent
    pub url_results: Vec<UrlProbe>,
}

impl SiteRunResult {
    /// Creates the result recorded for a site whose processing failed
    pub fn failed(site_name: impl Into<String>, mode: RankingMode) -> Self {
        Self {
            site_name: site_name.into(),
            best_url: None,
            mode,
            url_results: Vec::new(),
        }
    }

    /// Returns true if a best URL was chosen
    pub fn is_success(&self) -> bool {
        self.best_url.is_some()
    }
}
