use crate::state::Site;
use crate::url::clean_candidates;
use crate::PulseError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Reads a `{"site": ["url", ...]}` document
///
/// Entries that are not arrays, and sites left with no URLs after trimming,
/// are skipped with a warning. Non-string array items are ignored.
pub fn read_sites_file(path: &Path) -> Result<Vec<Site>, PulseError> {
    let content = fs::read_to_string(path)?;
    parse_sites(&content)
        .map_err(|e| PulseError::Source(format!("{}: {}", path.display(), e)))
}

fn parse_sites(content: &str) -> Result<Vec<Site>, serde_json::Error> {
    let raw: BTreeMap<String, Value> = serde_json::from_str(content)?;

    let mut sites = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let Value::Array(items) = value else {
            tracing::warn!(site = %name, step = "extract", "URL list is not an array");
            continue;
        };

        let urls = clean_candidates(
            items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string)),
        );
        if urls.is_empty() {
            tracing::warn!(site = %name, step = "extract", "No usable URLs");
            continue;
        }

        tracing::debug!(site = %name, step = "extract", count = urls.len(), "Found URLs");
        sites.push(Site::new(name, urls));
    }

    Ok(sites)
}
