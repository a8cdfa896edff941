//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of the latest
//! snapshot together with per-URL uptime trends from the history.

use crate::output::history::History;
use crate::output::snapshot::{SiteStatus, Snapshot};
use crate::output::stats::compute_trends;
use crate::output::OutputResult;
use std::fs;
use std::path::Path;

/// Writes a markdown summary to `output_path`
///
/// # Arguments
///
/// * `snapshot` - The latest published snapshot
/// * `history` - The history ledger
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    snapshot: &Snapshot,
    history: &History,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(snapshot, history);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output_path, markdown)?;

    Ok(())
}

/// Formats the snapshot and history trends as markdown
pub fn format_markdown_summary(snapshot: &Snapshot, history: &History) -> String {
    let mut md = String::new();

    md.push_str("# Site Pulse Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!(
        "- **Timestamp**: {}\n",
        snapshot.timestamp.to_rfc3339()
    ));
    md.push_str(&format!(
        "- **Total Sites**: {}\n",
        snapshot.summary.total_sites
    ));
    md.push_str(&format!(
        "- **Succeeded**: {}\n",
        snapshot.summary.success_sites
    ));
    md.push_str(&format!(
        "- **Failed**: {}\n\n",
        snapshot.summary.failed_sites
    ));

    md.push_str("## Sites\n\n");
    if snapshot.sites.is_empty() {
        md.push_str("No sites were tested.\n\n");
    } else {
        md.push_str("| Site | Status | Best URL | Latency |\n");
        md.push_str("|------|--------|----------|---------|\n");
        for (name, site) in &snapshot.sites {
            let status = match site.status {
                SiteStatus::Success => "success",
                SiteStatus::Failed => "failed",
            };
            let best = site.best_url.as_deref().unwrap_or("-");
            let latency = site
                .urls
                .iter()
                .find(|u| u.is_best)
                .and_then(|u| u.latency)
                .map(|l| format!("{:.2}s", l))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                name, status, best, latency
            ));
        }
        md.push('\n');
    }

    let failures: Vec<_> = snapshot
        .sites
        .values()
        .flat_map(|site| site.urls.iter().map(move |u| (&site.site_name, u)))
        .filter(|(_, u)| u.error_type.is_some())
        .collect();
    if !failures.is_empty() {
        md.push_str("## Errors\n\n");
        for (site, url) in failures {
            let kind = url.error_type.map(|k| k.as_str()).unwrap_or("unknown_error");
            let detail = url.error_detail.as_deref().unwrap_or("");
            md.push_str(&format!("- **{}** `{}`: {} {}\n", site, url.url, kind, detail));
        }
        md.push('\n');
    }

    let trends = compute_trends(history);
    if !trends.is_empty() {
        md.push_str("## Uptime Trends\n\n");
        md.push_str("| Site | URL | Samples | Uptime | Avg Latency |\n");
        md.push_str("|------|-----|---------|--------|-------------|\n");
        for trend in trends {
            let latency = trend
                .avg_latency
                .map(|l| format!("{:.2}s", l))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {} |\n",
                trend.site, trend.url, trend.samples, trend.uptime_pct, latency
            ));
        }
        md.push('\n');
    }

    md
}
