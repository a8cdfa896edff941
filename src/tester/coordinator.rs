//! Run coordinator - orchestrates one tester run
//!
//! This module drives a full run:
//! - Resolving each site's probe settings from the configuration
//! - Selecting a best URL per site, one site at a time
//! - Isolating per-site failures
//! - Recording the batch as snapshot and history
//! - Stopping early on shutdown, between sites and between requests

use crate::config::Config;
use crate::output::Recorder;
use crate::sources::load_sites;
use crate::state::{Site, SiteContext, SiteRunResult};
use crate::storage::{JsonStorage, Storage};
use crate::tester::pacer::Pacer;
use crate::tester::prober::{HttpProber, Probe, ProbeSettings};
use crate::tester::selector::{ranking_mode, select_best_url};
use crate::PulseError;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exit status used when a second interrupt aborts the process
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<SiteRunResult>,
    pub total_sites: usize,
    pub success_sites: usize,
    pub failed_sites: usize,
    /// False when the snapshot could not be published
    pub snapshot_written: bool,
    /// True when shutdown cut the run short
    pub interrupted: bool,
}

impl RunReport {
    fn from_results(results: Vec<SiteRunResult>, snapshot_written: bool, interrupted: bool) -> Self {
        let success_sites = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_sites: results.len(),
            success_sites,
            failed_sites: results.len() - success_sites,
            results,
            snapshot_written,
            interrupted,
        }
    }

    /// A run succeeds when at least one site produced a best URL
    pub fn is_success(&self) -> bool {
        self.success_sites > 0
    }
}

/// Main tester coordinator structure
pub struct Coordinator<P: Probe = HttpProber, S: Storage = JsonStorage> {
    config: Arc<Config>,
    prober: P,
    recorder: Recorder<S>,
    shutdown: Arc<AtomicBool>,
}

impl Coordinator {
    /// Creates a coordinator with an HTTP prober and JSON storage
    ///
    /// # Arguments
    ///
    /// * `config` - The loaded configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(PulseError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, PulseError> {
        let prober = HttpProber::new(ProbeSettings::from_config(&config))?;
        let storage = JsonStorage::from_config(&config.output);
        Ok(Self::with_parts(config, prober, storage))
    }
}

impl<P: Probe, S: Storage> Coordinator<P, S> {
    /// Creates a coordinator from explicit parts
    pub fn with_parts(config: Config, prober: P, storage: S) -> Self {
        let history_limit = config.tester.history_limit;
        Self {
            config: Arc::new(config),
            prober,
            recorder: Recorder::new(storage, history_limit),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the shutdown flag with one shared with the caller
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Flag that stops the run before the next request when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Runs every site and records the results
    ///
    /// Sites are processed strictly one after another. A failing site never
    /// stops the run; it is recorded with no best URL.
    pub async fn run(&self, sites: &[Site]) -> RunReport {
        let start_time = Instant::now();
        tracing::info!(step = "run", sites = sites.len(), "Starting tester run");

        let mut results = Vec::with_capacity(sites.len());
        let mut interrupted = false;

        for (index, site) in sites.iter().enumerate() {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!(
                    step = "run",
                    remaining = sites.len() - index,
                    "Shutdown requested, skipping remaining sites"
                );
                interrupted = true;
                break;
            }

            tracing::info!(
                site = %site.name,
                step = "run",
                "Testing site {}/{}",
                index + 1,
                sites.len()
            );
            results.push(self.process_site(site).await);

            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!(
                    site = %site.name,
                    step = "run",
                    remaining = sites.len() - index - 1,
                    "Shutdown requested, recording partial results"
                );
                interrupted = true;
                break;
            }
        }

        let snapshot_written = match self.recorder.record(&results, Utc::now()) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(step = "record", "Failed to publish snapshot: {}", e);
                false
            }
        };

        let report = RunReport::from_results(results, snapshot_written, interrupted);
        tracing::info!(
            step = "run",
            total = report.total_sites,
            success = report.success_sites,
            failed = report.failed_sites,
            interrupted = report.interrupted,
            "Run completed in {:?}",
            start_time.elapsed()
        );

        report
    }

    /// Selects the best URL of one site, converting errors into a failed result
    async fn process_site(&self, site: &Site) -> SiteRunResult {
        let ctx = SiteContext::from_config(&site.name, &self.config);
        let mut pacer = Pacer::new(Duration::from_millis(self.config.tester.request_delay_ms))
            .with_shutdown(Arc::clone(&self.shutdown));

        match select_best_url(&self.prober, &mut pacer, site, &ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(site = %site.name, step = "run", "Site failed: {}", e);
                SiteRunResult::failed(&site.name, ranking_mode(site.urls.len(), &ctx))
            }
        }
    }
}

/// Runs the tester end to end
///
/// Loads the sites, probes them, records the results and returns the report.
/// The first Ctrl-C stops the run before the next request and the results
/// gathered so far are still recorded. A second Ctrl-C exits immediately
/// with status 130.
///
/// # Example
///
/// ```no_run
/// use site_pulse::config::load_config;
/// use site_pulse::run_tester;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let report = run_tester(config, None).await?;
/// println!("{} of {} sites up", report.success_sites, report.total_sites);
/// # Ok(())
/// # }
/// ```
pub async fn run_tester(
    config: Config,
    sites_override: Option<&Path>,
) -> Result<RunReport, PulseError> {
    let sites = load_sites(&config, sites_override);
    if sites.is_empty() {
        tracing::error!(step = "run", "No sites to test");
        return Ok(RunReport::from_results(Vec::new(), false, false));
    }

    let coordinator = Coordinator::new(config)?;

    let shutdown = coordinator.shutdown_handle();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!(
            step = "run",
            "Interrupt received, finishing the current request (press Ctrl-C again to abort)"
        );
        shutdown.store(true, Ordering::SeqCst);

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!(step = "run", "Second interrupt received, aborting");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    });

    let report = coordinator.run(&sites).await;
    listener.abort();

    Ok(report)
}
