//! Site-Pulse main entry point
//!
//! This is the command-line interface for the Site-Pulse mirror prober.

use anyhow::Context;
use clap::Parser;
use site_pulse::config::{load_config_with_hash, redact_url, Config};
use site_pulse::output::{generate_markdown_summary, print_statistics};
use site_pulse::sources::load_sites;
use site_pulse::state::SiteContext;
use site_pulse::storage::{open_storage, Storage};
use site_pulse::tester::ranking_mode;
use site_pulse::{build_test_url, run_tester};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Site-Pulse: a polite mirror health prober
///
/// Site-Pulse probes every candidate URL of each configured site, checks
/// that the page carries the expected content, picks the best URL per site
/// and keeps a bounded health history of every URL.
#[derive(Parser, Debug)]
#[command(name = "site-pulse")]
#[command(version = "1.0.0")]
#[command(about = "A polite mirror health prober", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Also append plain-text logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Read sites from this JSON file instead of the configured one
    #[arg(long, value_name = "FILE")]
    sites: Option<PathBuf>,

    /// Validate config and show what would be probed without any network access
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show the latest snapshot and history trends and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Dropping the guard flushes the log file, so it lives until main returns.
    let _log_guard = setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.sites.as_deref())?;
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config)?;
        Ok(ExitCode::SUCCESS)
    } else if cli.export_summary {
        handle_export_summary(&config)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_run(config, cli.sites.as_deref()).await
    }
}

/// Builds the level filter for the given verbosity
fn log_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_pulse=info,warn"),
            1 => EnvFilter::new("site_pulse=debug,info"),
            2 => EnvFilter::new("site_pulse=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    }
}

/// Opens `path` for appending behind a background writer
fn log_file_writer(path: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    Ok(tracing_appender::non_blocking(file))
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file, the same events are also written there without ANSI
/// colors. The returned guard must be held until exit.
fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_filter(log_filter(verbose, quiet));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = log_file_writer(path)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(log_filter(verbose, quiet));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Handles the --dry-run mode: validates config and shows what would be probed
fn handle_dry_run(config: &Config, sites_override: Option<&Path>) -> anyhow::Result<()> {
    println!("=== Site-Pulse Dry Run ===\n");

    println!("Tester Configuration:");
    println!("  Timeout: {}s", config.tester.test_timeout);
    println!("  Max retries: {}", config.tester.max_retries);
    println!("  Retry delay: {}ms", config.tester.retry_delay_ms);
    println!("  Request delay: {}ms", config.tester.request_delay_ms);
    println!("  Verify SSL: {}", config.tester.verify_ssl);
    println!("  History limit: {}", config.tester.history_limit);
    println!("  Default weight: {}", config.tester.default_weight);
    if config.proxy.is_active() {
        let proxies = &config.proxy.proxies;
        println!(
            "  Proxy: http={} https={}",
            proxies.http.as_deref().map_or("-".to_string(), redact_url),
            proxies.https.as_deref().map_or("-".to_string(), redact_url)
        );
    }

    println!("\nOutput:");
    println!("  Snapshot: {}", config.output.snapshot_path);
    println!("  History: {}", config.output.history_path);
    println!("  Summary: {}", config.output.summary_path);

    let sites = load_sites(config, sites_override);
    println!("\nSites ({}):", sites.len());
    for site in &sites {
        let ctx = SiteContext::from_config(&site.name, config);
        println!(
            "  - {} [{}] keyword: {}",
            site.name,
            ranking_mode(site.urls.len(), &ctx),
            ctx.keyword.as_deref().unwrap_or("-")
        );
        for url in &site.urls {
            let target = match build_test_url(url, ctx.search_path.as_deref()) {
                Ok(target) => target.to_string(),
                Err(e) => format!("invalid ({})", e),
            };
            if ctx.is_weighted() {
                println!("    * {} (weight {})", target, ctx.weight_of(url));
            } else {
                println!("    * {}", target);
            }
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would probe {} URLs across {} sites",
        sites.iter().map(|s| s.urls.len()).sum::<usize>(),
        sites.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows the latest snapshot and history trends
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Snapshot: {}", config.output.snapshot_path);
    println!("History: {}\n", config.output.history_path);

    let storage = open_storage(&config.output);
    let snapshot = storage.load_snapshot()?;
    let history = storage.load_history()?;

    print_statistics(snapshot.as_ref(), &history);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Site-Pulse Summary ===\n");
    println!("Snapshot: {}", config.output.snapshot_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = open_storage(&config.output);
    let snapshot = storage
        .load_snapshot()?
        .context("no snapshot has been published yet; run the tester first")?;
    let history = storage.load_history()?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&snapshot, &history, Path::new(&config.output.summary_path))?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the main tester run
async fn handle_run(config: Config, sites_override: Option<&Path>) -> anyhow::Result<ExitCode> {
    let report = run_tester(config, sites_override).await?;

    if !report.snapshot_written && report.total_sites > 0 {
        tracing::error!("Snapshot was not published; readers still see the previous run");
    }

    if report.is_success() {
        tracing::info!(
            "Run succeeded: {}/{} sites have a best URL",
            report.success_sites,
            report.total_sites
        );
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Run failed: no site has a usable URL");
        Ok(ExitCode::FAILURE)
    }
}
