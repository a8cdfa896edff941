use crate::state::Site;
use crate::url::clean_candidates;
use crate::PulseError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Shape of a TVBox site file; only the domain list matters here
#[derive(Debug, Deserialize)]
struct TvboxFile {
    #[serde(rename = "Domains")]
    domains: Option<Vec<Value>>,
}

/// Reads candidate URLs from TVBox site files
///
/// `mapping` pairs each file name inside `dir` with the site it describes.
/// Missing or malformed files are logged and skipped.
pub fn read_tvbox_dir(
    dir: &Path,
    mapping: &BTreeMap<String, String>,
) -> Result<Vec<Site>, PulseError> {
    if !dir.is_dir() {
        return Err(PulseError::Source(format!(
            "TVBox directory not found: {}",
            dir.display()
        )));
    }

    let mut by_site: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (file_name, site_name) in mapping {
        let path = dir.join(file_name);
        let urls = match read_domains(&path) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(site = %site_name, step = "extract", file = %file_name, "{}", e);
                continue;
            }
        };

        if urls.is_empty() {
            tracing::warn!(site = %site_name, step = "extract", file = %file_name, "No URLs in Domains");
            continue;
        }
        by_site.entry(site_name.as_str()).or_default().extend(urls);
    }

    Ok(by_site
        .into_iter()
        .map(|(name, urls)| Site::new(name, clean_candidates(urls)))
        .collect())
}

fn read_domains(path: &Path) -> Result<Vec<String>, PulseError> {
    let content = fs::read_to_string(path)?;
    let file: TvboxFile = serde_json::from_str(&content)
        .map_err(|e| PulseError::Source(format!("{}: {}", path.display(), e)))?;

    let domains = file
        .domains
        .ok_or_else(|| PulseError::Source(format!("{}: no Domains field", path.display())))?;

    Ok(clean_candidates(domains.into_iter().filter_map(domain_url)))
}

/// A domain entry is either a bare URL or an object with a `url` key
fn domain_url(entry: Value) -> Option<String> {
    match entry {
        Value::String(url) => Some(url),
        Value::Object(mut fields) => match fields.remove("url") {
            Some(Value::String(url)) => Some(url),
            _ => None,
        },
        _ => None,
    }
}
