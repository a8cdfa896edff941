//! Test URL construction
//!
//! A site's search path is joined onto each candidate URL as if the
//! candidate were a directory, so `https://a.example/app` plus
//! `/search?wd=x` probes `https://a.example/app/search?wd=x`.

use crate::{UrlError, UrlResult};
use url::Url;

/// Builds the URL that is actually requested for a candidate
///
/// # Arguments
///
/// * `base` - The candidate URL as configured (surrounding whitespace is ignored)
/// * `search_path` - Optional suffix joined onto the candidate
///
/// # Returns
///
/// * `Ok(Url)` - The URL to request
/// * `Err(UrlError)` - The candidate is empty, unparseable, or not http(s)
///
/// # Examples
///
/// ```
/// use site_pulse::url::build_test_url;
///
/// let url = build_test_url("https://example.com", Some("/vod/search.html?wd=test")).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/vod/search.html?wd=test");
/// ```
pub fn build_test_url(base: &str, search_path: Option<&str>) -> UrlResult<Url> {
    let base = base.trim();
    if base.is_empty() {
        return Err(UrlError::Empty);
    }

    let suffix = search_path.map(str::trim).filter(|s| !s.is_empty());

    let url = match suffix {
        Some(suffix) => {
            let mut dir = base.to_string();
            if !dir.ends_with('/') {
                dir.push('/');
            }
            let dir = parse_http(&dir)?;
            dir.join(suffix.trim_start_matches('/'))
                .map_err(|e| UrlError::Parse(format!("{}: {}", suffix, e)))?
        }
        None => parse_http(base)?,
    };

    Ok(url)
}

fn parse_http(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}
