//! Integration tests for the tester
//!
//! These tests use wiremock to create mock HTTP servers and exercise
//! probing, selection and recording end-to-end.

use site_pulse::config::Config;
use site_pulse::output::SiteStatus;
use site_pulse::state::{ErrorKind, Site, SiteContext};
use site_pulse::storage::{JsonStorage, Storage};
use site_pulse::tester::{Coordinator, HttpProber, Probe, ProbeSettings, RetryPolicy};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEYWORD: &str = "search-result";

/// Probe settings with short timeouts and retry delays
fn fast_settings(timeout: Duration) -> ProbeSettings {
    let mut settings = ProbeSettings::from_config(&Config::default());
    settings.timeout = timeout;
    settings.retry = RetryPolicy {
        max_retries: 2,
        delay: Duration::from_millis(10),
    };
    settings
}

fn context(keyword: Option<&str>, search_path: Option<&str>) -> SiteContext {
    SiteContext {
        name: "Mirror".to_string(),
        keyword: keyword.map(str::to_string),
        search_path: search_path.map(str::to_string),
        default_weight: 50,
        ..Default::default()
    }
}

/// A configuration writing into `dir`, with no pacing and retry pauses
fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.tester.request_delay_ms = 0;
    config.tester.retry_delay_ms = 10;
    config.tester.test_timeout = 5;
    config.tester.history_limit = 2;
    config.output.snapshot_path = dir.path().join("test_results.json").to_string_lossy().into_owned();
    config.output.history_path = dir.path().join("history.json").to_string_lossy().into_owned();
    config
}

fn storage_for(config: &Config) -> JsonStorage {
    JsonStorage::from_config(&config.output)
}

#[tokio::test]
async fn test_keyword_present_succeeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body><div class=\"{}\">ok</div></body></html>", KEYWORD)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober
        .probe(&mock_server.uri(), &context(Some(KEYWORD), None))
        .await;

    assert!(outcome.is_success());
    assert!(outcome.has_keyword);
    assert!(outcome.latency.is_some());
}

#[tokio::test]
async fn test_missing_keyword_is_invalid_content() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Just a moment...</title></head><body>challenge</body></html>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober
        .probe(&mock_server.uri(), &context(Some(KEYWORD), None))
        .await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.latency, None);
    assert!(!outcome.has_keyword);
    assert_eq!(outcome.error_kind(), Some(ErrorKind::InvalidContent));
    assert!(outcome
        .error_detail()
        .unwrap()
        .contains("page title: Just a moment..."));
}

#[tokio::test]
async fn test_timeouts_are_retried_until_success() {
    let mock_server = MockServer::start().await;

    // First two attempts hang past the timeout, the third answers.
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(KEYWORD)
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_millis(300))).unwrap();
    let outcome = prober
        .probe(&mock_server.uri(), &context(Some(KEYWORD), None))
        .await;

    assert!(outcome.is_success());
    assert!(outcome.latency.unwrap() < 0.3);
}

#[tokio::test]
async fn test_timeouts_exhaust_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_millis(200))).unwrap();
    let outcome = prober.probe(&mock_server.uri(), &context(None, None)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::Timeout));
    assert_eq!(outcome.latency, None);
}

#[tokio::test]
async fn test_service_unavailable_is_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober.probe(&mock_server.uri(), &context(None, None)).await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober.probe(&mock_server.uri(), &context(None, None)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::HttpError));
    assert_eq!(outcome.error_detail(), Some("HTTP status 404"));
}

#[tokio::test]
async fn test_forbidden_exhausts_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober.probe(&mock_server.uri(), &context(None, None)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::HttpError));
    assert_eq!(outcome.error_detail(), Some("HTTP status 403"));
}

#[tokio::test]
async fn test_rate_limited_exhausts_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober.probe(&mock_server.uri(), &context(None, None)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::HttpError));
    assert_eq!(outcome.error_detail(), Some("HTTP status 429"));
    assert_eq!(outcome.latency, None);
}

#[tokio::test]
async fn test_tls_failure_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    // A plain HTTP server cannot complete a TLS handshake.
    let https_url = mock_server.uri().replacen("http://", "https://", 1);
    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober.probe(&https_url, &context(None, None)).await;

    assert_eq!(outcome.error_kind(), Some(ErrorKind::SslError));
    assert!(outcome.error_detail().unwrap().starts_with("SSL error: "));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection_resets_are_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = accepted.clone();
    let server = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            // Zero linger turns the close into a reset.
            let _ = stream.set_linger(Some(Duration::ZERO));
            drop(stream);
        }
    });

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober
        .probe(&format!("http://{}", addr), &context(None, None))
        .await;
    server.abort();

    assert_eq!(outcome.error_kind(), Some(ErrorKind::ConnectionError));
    assert!(outcome.error_detail().unwrap().starts_with("connection failed: "));
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_shutdown_stops_before_next_url() {
    let dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let slow = format!("{}/slow", mock_server.uri());
    let next = format!("{}/next", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(KEYWORD)
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&dir);
    let coordinator = Coordinator::new(config.clone()).unwrap();
    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.store(true, Ordering::SeqCst);
    });

    let report = coordinator
        .run(&[
            Site::new("Mirror", vec![slow.clone(), next.clone()]),
            Site::new("Later", vec![next.clone()]),
        ])
        .await;

    assert!(report.interrupted);
    assert_eq!(report.total_sites, 1);
    assert_eq!(report.results[0].url_results.len(), 1);
    assert_eq!(report.results[0].best_url.as_deref(), Some(slow.as_str()));
    assert!(report.snapshot_written);

    let snapshot = storage_for(&config).load_snapshot().unwrap().unwrap();
    assert_eq!(snapshot.sites.len(), 1);
    assert!(snapshot.is_consistent());
}

#[tokio::test]
async fn test_search_path_is_applied() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vodsearch/keyword.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .expect(1)
        .mount(&mock_server)
        .await;

    let prober = HttpProber::new(fast_settings(Duration::from_secs(5))).unwrap();
    let outcome = prober
        .probe(
            &mock_server.uri(),
            &context(Some(KEYWORD), Some("/vodsearch/keyword.html")),
        )
        .await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_weighted_run_skips_lower_tiers() {
    let dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let primary = format!("{}/primary", mock_server.uri());
    let backup = format!("{}/backup", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/primary"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/backup"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&dir);
    config
        .sites
        .keyword_validation
        .insert("Mirror".to_string(), KEYWORD.to_string());
    config.sites.url_weights.insert(
        "Mirror".to_string(),
        HashMap::from([(primary.clone(), 100), (backup.clone(), 10)]),
    );

    let coordinator = Coordinator::new(config.clone()).unwrap();
    let report = coordinator
        .run(&[Site::new("Mirror", vec![backup.clone(), primary.clone()])])
        .await;

    assert!(report.is_success());
    assert_eq!(report.results[0].best_url.as_deref(), Some(primary.as_str()));
    assert_eq!(report.results[0].url_results.len(), 1);

    let snapshot = storage_for(&config).load_snapshot().unwrap().unwrap();
    let site = &snapshot.sites["Mirror"];
    assert_eq!(site.status, SiteStatus::Success);
    assert_eq!(site.urls[0].weight, Some(100));
    assert!(site.urls[0].is_best);
}

#[tokio::test]
async fn test_full_run_writes_snapshot_and_history() {
    let dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;
    let fast = format!("{}/fast", mock_server.uri());
    let broken = format!("{}/broken", mock_server.uri());
    let parked = format!("{}/parked", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_string(KEYWORD))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/parked"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Domain for sale</title>"))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&dir);
    config
        .sites
        .keyword_validation
        .insert("Mirror".to_string(), KEYWORD.to_string());
    config
        .sites
        .keyword_validation
        .insert("Parked".to_string(), KEYWORD.to_string());

    let sites = vec![
        Site::new("Mirror", vec![broken.clone(), fast.clone()]),
        Site::new("Parked", vec![parked.clone()]),
    ];

    let coordinator = Coordinator::new(config.clone()).unwrap();
    for _ in 0..3 {
        let report = coordinator.run(&sites).await;
        assert_eq!(report.success_sites, 1);
        assert_eq!(report.failed_sites, 1);
        assert!(report.snapshot_written);
    }

    let storage = storage_for(&config);
    let snapshot = storage.load_snapshot().unwrap().unwrap();
    assert!(snapshot.is_consistent());
    assert_eq!(snapshot.summary.total_sites, 2);

    let mirror = &snapshot.sites["Mirror"];
    assert_eq!(mirror.best_url.as_deref(), Some(fast.as_str()));
    assert_eq!(mirror.urls[0].url, fast);
    assert!(mirror.urls[0].is_best);
    assert_eq!(mirror.urls[1].url, broken);
    assert_eq!(mirror.urls[1].latency, None);
    assert_eq!(mirror.urls[1].error_type, Some(ErrorKind::HttpError));
    assert_eq!(mirror.urls[1].weight, None);

    let parked_site = &snapshot.sites["Parked"];
    assert_eq!(parked_site.status, SiteStatus::Failed);
    assert_eq!(parked_site.best_url, None);
    assert_eq!(parked_site.urls[0].error_type, Some(ErrorKind::InvalidContent));

    // Three runs with a limit of two keep only the latest two records.
    let history = storage.load_history().unwrap();
    assert_eq!(history.records("Mirror", &fast).len(), 2);
    assert_eq!(history.records("Mirror", &broken).len(), 2);
    assert_eq!(history.records("Parked", &parked).len(), 2);
    let records = history.records("Mirror", &fast);
    assert!(records[0].timestamp <= records[1].timestamp);

    let raw = std::fs::read_to_string(dir.path().join("history.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["Mirror"][&fast][1]["status"], "up");
    assert_eq!(json["Mirror"][&broken][1]["status"], "down");
}
