//! HTTP availability prober
//!
//! This module handles every request made by the tester:
//! - Building an HTTP client with browser-like headers, proxy and TLS settings
//! - Probing one candidate URL and validating its content
//! - Retrying transient failures with a fixed delay
//! - Classifying failures into `ErrorKind`

use crate::config::{Config, ProxyUrls};
use crate::state::{ErrorKind, ProbeOutcome, SiteContext};
use crate::tester::content::{contains_keyword, invalid_content_detail, truncate_detail};
use crate::url::build_test_url;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use std::error::Error as StdError;
use std::time::{Duration, Instant};
use url::Url;

/// Something that can probe one candidate URL of a site
///
/// The tester is generic over this trait so selection and orchestration can
/// be exercised without a network.
#[allow(async_fn_in_trait)]
pub trait Probe {
    /// Probes `url` with the site's search path and keyword applied
    async fn probe(&self, url: &str, ctx: &SiteContext) -> ProbeOutcome;
}

/// Bounded retry policy for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Fixed pause before each retry
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

/// Everything the prober needs to know about how to send requests
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
    pub proxy: Option<ProxyUrls>,
    pub retry: RetryPolicy,
}

impl ProbeSettings {
    /// Resolves probe settings from the configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: Duration::from_secs(config.tester.test_timeout),
            verify_ssl: config.tester.verify_ssl,
            user_agent: config.tester.user_agent.clone(),
            proxy: config
                .proxy
                .is_active()
                .then(|| config.proxy.proxies.clone()),
            retry: RetryPolicy {
                max_retries: config.tester.max_retries,
                delay: Duration::from_millis(config.tester.retry_delay_ms),
            },
        }
    }
}

/// Builds an HTTP client for probing
///
/// The client sends browser-like headers, follows up to 10 redirects,
/// applies the probe timeout to the whole request and honors the proxy and
/// TLS verification settings.
///
/// # Example
///
/// ```no_run
/// use site_pulse::config::Config;
/// use site_pulse::tester::{build_http_client, ProbeSettings};
///
/// let settings = ProbeSettings::from_config(&Config::default());
/// let client = build_http_client(&settings).unwrap();
/// ```
pub fn build_http_client(settings: &ProbeSettings) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let mut builder = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(headers)
        .timeout(settings.timeout)
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(!settings.verify_ssl)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &settings.proxy {
        if let Some(http) = &proxy.http {
            builder = builder.proxy(Proxy::http(http.as_str())?);
        }
        if let Some(https) = &proxy.https {
            builder = builder.proxy(Proxy::https(https.as_str())?);
        }
    }

    builder.build()
}

/// Result of a single request attempt
#[derive(Debug)]
enum Attempt {
    /// Final; no retry will change it
    Finished(ProbeOutcome),
    /// May succeed if tried again
    Transient { kind: ErrorKind, detail: String },
}

/// Probes URLs over HTTP
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    settings: ProbeSettings,
}

impl HttpProber {
    /// Creates a prober with its own HTTP client
    pub fn new(settings: ProbeSettings) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&settings)?;
        Ok(Self { client, settings })
    }

    /// Sends one request and classifies the response
    async fn attempt(&self, url: &Url, keyword: Option<&str>) -> Attempt {
        let started = Instant::now();
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify_request_error(&e, self.settings.timeout),
        };
        let latency = started.elapsed().as_secs_f64();
        let status = response.status();

        if status == StatusCode::OK {
            let Some(keyword) = keyword else {
                return Attempt::Finished(ProbeOutcome::success(latency));
            };

            return match response.text().await {
                Ok(body) if contains_keyword(&body, Some(keyword)) => {
                    Attempt::Finished(ProbeOutcome::success(latency))
                }
                Ok(body) => Attempt::Finished(ProbeOutcome::failure(
                    ErrorKind::InvalidContent,
                    invalid_content_detail(&body, keyword),
                )),
                Err(e) => classify_request_error(&e, self.settings.timeout),
            };
        }

        let detail = format!("HTTP status {}", status.as_u16());
        if is_transient_status(status) {
            Attempt::Transient {
                kind: ErrorKind::HttpError,
                detail,
            }
        } else {
            Attempt::Finished(ProbeOutcome::failure(ErrorKind::HttpError, detail))
        }
    }
}

impl Probe for HttpProber {
    async fn probe(&self, url: &str, ctx: &SiteContext) -> ProbeOutcome {
        let test_url = match build_test_url(url, ctx.search_path.as_deref()) {
            Ok(test_url) => test_url,
            Err(e) => {
                tracing::warn!(site = %ctx.name, url = %url, step = "probe", "Invalid candidate URL: {}", e);
                return ProbeOutcome::failure(
                    ErrorKind::UnknownError,
                    truncate_detail(&format!("invalid URL: {}", e)),
                );
            }
        };

        let retry = self.settings.retry;
        let mut retries = 0;

        loop {
            match self.attempt(&test_url, ctx.keyword.as_deref()).await {
                Attempt::Finished(outcome) => {
                    log_outcome(ctx, &test_url, &outcome);
                    return outcome;
                }
                Attempt::Transient { kind, detail }
                    if kind.is_retryable() && retries < retry.max_retries =>
                {
                    retries += 1;
                    tracing::warn!(
                        site = %ctx.name,
                        url = %test_url,
                        step = "probe",
                        error_type = %kind,
                        "{}, retrying in {:?} ({}/{})",
                        detail,
                        retry.delay,
                        retries,
                        retry.max_retries
                    );
                    tokio::time::sleep(retry.delay).await;
                }
                Attempt::Transient { kind, detail } => {
                    let outcome = ProbeOutcome::failure(kind, detail);
                    log_outcome(ctx, &test_url, &outcome);
                    return outcome;
                }
            }
        }
    }
}

fn log_outcome(ctx: &SiteContext, url: &Url, outcome: &ProbeOutcome) {
    match (&outcome.latency, &outcome.error) {
        (Some(latency), _) => tracing::info!(
            site = %ctx.name,
            url = %url,
            step = "probe",
            latency_secs = latency,
            keyword = ctx.keyword.is_some(),
            "URL reachable in {:.2}s",
            latency
        ),
        (None, Some(error)) => tracing::info!(
            site = %ctx.name,
            url = %url,
            step = "probe",
            error_type = %error.kind,
            "URL failed: {}",
            error.detail
        ),
        (None, None) => {}
    }
}

/// Returns true for statuses that often clear up on a second try
///
/// 403 and 503 are what edge-protection layers return while a challenge is
/// pending; 429 is plain rate limiting.
pub fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS
    )
}

/// Maps a transport error to an attempt result
fn classify_request_error(e: &reqwest::Error, timeout: Duration) -> Attempt {
    if is_tls_error(e) {
        return Attempt::Finished(ProbeOutcome::failure(
            ErrorKind::SslError,
            truncate_detail(&format!("SSL error: {}", root_cause(e))),
        ));
    }

    if e.is_timeout() {
        return Attempt::Transient {
            kind: ErrorKind::Timeout,
            detail: format!("request timed out (>{}s)", timeout.as_secs_f64()),
        };
    }

    if e.is_connect() || is_connection_io_error(e) {
        return Attempt::Transient {
            kind: ErrorKind::ConnectionError,
            detail: truncate_detail(&format!("connection failed: {}", root_cause(e))),
        };
    }

    Attempt::Finished(ProbeOutcome::failure(
        ErrorKind::UnknownError,
        truncate_detail(&format!("request failed: {}", root_cause(e))),
    ))
}

/// Detects TLS handshake and certificate failures in an error chain
///
/// Only the sources are inspected; the top-level message contains the URL,
/// which may itself mention "ssl". During connect, an `InvalidData` I/O
/// error can only come from the TLS layer, e.g. a plain HTTP peer answering
/// a handshake.
fn is_tls_error(e: &reqwest::Error) -> bool {
    let mut source = e.source();
    while let Some(err) = source {
        if e.is_connect() {
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                if io.kind() == std::io::ErrorKind::InvalidData {
                    return true;
                }
            }
        }
        let message = err.to_string().to_lowercase();
        if ["certificate", "tls", "ssl", "handshake", "corrupt message"]
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        source = err.source();
    }
    false
}

/// Detects resets and aborts that surface outside the connect phase
fn is_connection_io_error(e: &reqwest::Error) -> bool {
    use std::io::ErrorKind as IoKind;

    let mut source = e.source();
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                IoKind::ConnectionRefused
                    | IoKind::ConnectionReset
                    | IoKind::ConnectionAborted
                    | IoKind::BrokenPipe
                    | IoKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Returns the innermost error message
fn root_cause(e: &reqwest::Error) -> String {
    let mut current: &dyn StdError = e;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}
