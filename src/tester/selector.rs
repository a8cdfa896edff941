//! Best-URL selection
//!
//! Three policies, chosen per site:
//!
//! | Site | Probe order | Best URL |
//! |------|-------------|----------|
//! | one candidate | the candidate | it, if the probe succeeds |
//! | weights configured | weight descending | keyword, then weight, then latency |
//! | no weights | candidate order | lowest latency among valid URLs |
//!
//! In every mode the keyword gate comes first: a response without the
//! keyword is a failed probe and can never be best.

use crate::state::{ProbeOutcome, RankingMode, Site, SiteContext, SiteRunResult, UrlProbe};
use crate::tester::pacer::Pacer;
use crate::tester::prober::Probe;
use crate::url::clean_candidates;
use crate::PulseError;
use std::cmp::Ordering;

/// Returns the ranking mode a site will use
pub fn ranking_mode(candidates: usize, ctx: &SiteContext) -> RankingMode {
    if candidates == 1 {
        RankingMode::Single
    } else if ctx.is_weighted() {
        RankingMode::Weighted
    } else {
        RankingMode::KeywordGated
    }
}

/// Probes a site's candidates and picks its best URL
///
/// # Arguments
///
/// * `prober` - Probes individual URLs
/// * `pacer` - Spaces consecutive probes of this site
/// * `site` - The site and its candidate URLs
/// * `ctx` - The site's search path, keyword and weights
///
/// # Returns
///
/// * `Ok(SiteRunResult)` - Every probed candidate and the best URL, if any
/// * `Err(PulseError::NoCandidates)` - The site has no usable candidate
pub async fn select_best_url<P: Probe>(
    prober: &P,
    pacer: &mut Pacer,
    site: &Site,
    ctx: &SiteContext,
) -> Result<SiteRunResult, PulseError> {
    let candidates = clean_candidates(site.urls.iter().cloned());
    if candidates.is_empty() {
        return Err(PulseError::NoCandidates {
            site: site.name.clone(),
        });
    }

    let mode = ranking_mode(candidates.len(), ctx);
    tracing::debug!(
        site = %site.name,
        step = "select",
        mode = %mode,
        "Probing {} candidate(s)",
        candidates.len()
    );

    let url_results = match mode {
        RankingMode::Single => {
            let url = &candidates[0];
            if pacer.wait_turn().await {
                let outcome = prober.probe(url, ctx).await;
                vec![UrlProbe {
                    url: url.clone(),
                    outcome,
                    weight: ctx.is_weighted().then(|| ctx.weight_of(url)),
                }]
            } else {
                Vec::new()
            }
        }
        RankingMode::Weighted => probe_weighted(prober, pacer, &candidates, ctx).await,
        RankingMode::KeywordGated => {
            let mut results = Vec::with_capacity(candidates.len());
            for url in &candidates {
                if !pacer.wait_turn().await {
                    tracing::debug!(
                        site = %site.name,
                        step = "select",
                        "Shutdown requested, not starting further requests"
                    );
                    break;
                }
                let outcome = prober.probe(url, ctx).await;
                results.push(UrlProbe {
                    url: url.clone(),
                    outcome,
                    weight: None,
                });
            }
            results
        }
    };

    let best = match mode {
        RankingMode::Single => url_results.first().filter(|r| r.outcome.is_success()),
        RankingMode::Weighted => rank_weighted(&url_results),
        RankingMode::KeywordGated => fastest_valid(&url_results),
    };
    let best_url = best.map(|r| r.url.clone());

    match (&best_url, best) {
        (Some(url), Some(result)) => tracing::info!(
            site = %site.name,
            url = %url,
            step = "select",
            mode = %mode,
            weight = result.weight,
            "Best URL selected ({:.2}s)",
            result.outcome.latency.unwrap_or_default()
        ),
        _ => tracing::warn!(
            site = %site.name,
            step = "select",
            mode = %mode,
            "No valid URL among {} probed",
            url_results.len()
        ),
    }

    Ok(SiteRunResult {
        site_name: site.name.clone(),
        best_url,
        mode,
        url_results,
    })
}

/// Probes in descending weight order, skipping tiers that can no longer win
///
/// Once a candidate succeeds, every candidate with strictly lower weight is
/// skipped: weight dominates latency in the ranking, so none of them could
/// be chosen.
async fn probe_weighted<P: Probe>(
    prober: &P,
    pacer: &mut Pacer,
    candidates: &[String],
    ctx: &SiteContext,
) -> Vec<UrlProbe> {
    let mut ordered: Vec<(&String, i64)> = candidates
        .iter()
        .map(|url| (url, ctx.weight_of(url)))
        .collect();
    // Stable, so equal weights keep candidate order.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut results = Vec::with_capacity(ordered.len());
    let mut confirmed_weight: Option<i64> = None;

    for (url, weight) in ordered {
        if let Some(confirmed) = confirmed_weight {
            if weight < confirmed {
                tracing::debug!(
                    site = %ctx.name,
                    url = %url,
                    step = "select",
                    "Skipping weight {} below confirmed weight {}",
                    weight,
                    confirmed
                );
                continue;
            }
        }

        if !pacer.wait_turn().await {
            tracing::debug!(
                site = %ctx.name,
                step = "select",
                "Shutdown requested, not starting further requests"
            );
            break;
        }
        let outcome: ProbeOutcome = prober.probe(url, ctx).await;
        if outcome.is_success() && confirmed_weight.is_none() {
            confirmed_weight = Some(weight);
        }
        results.push(UrlProbe {
            url: url.clone(),
            outcome,
            weight: Some(weight),
        });
    }

    results
}

/// Ranks weighted results by (keyword desc, weight desc, latency asc)
///
/// Only successful probes are eligible. On a complete tie the earlier
/// probe wins.
pub fn rank_weighted(results: &[UrlProbe]) -> Option<&UrlProbe> {
    results
        .iter()
        .filter(|r| r.outcome.is_success())
        .min_by(|a, b| {
            b.outcome
                .has_keyword
                .cmp(&a.outcome.has_keyword)
                .then_with(|| b.weight.cmp(&a.weight))
                .then_with(|| compare_latency(&a.outcome, &b.outcome))
        })
}

/// Picks the lowest-latency successful result
///
/// On equal latency the earlier candidate wins.
pub fn fastest_valid(results: &[UrlProbe]) -> Option<&UrlProbe> {
    results
        .iter()
        .filter(|r| r.outcome.is_success())
        .min_by(|a, b| compare_latency(&a.outcome, &b.outcome))
}

fn compare_latency(a: &ProbeOutcome, b: &ProbeOutcome) -> Ordering {
    match (a.latency, b.latency) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
