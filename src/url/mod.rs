//! URL handling module for Site-Pulse
//!
//! This module builds the URLs that are probed and cleans up candidate
//! lists coming from site sources.

mod join;

pub use join::build_test_url;

/// Cleans a raw candidate list
///
/// Trims whitespace, drops empty entries and removes duplicates while
/// keeping the first occurrence, so candidate order is preserved.
///
/// # Examples
///
/// ```
/// use site_pulse::url::clean_candidates;
///
/// let urls = vec![" https://a.example ".to_string(), "".to_string(), "https://a.example".to_string()];
/// assert_eq!(clean_candidates(urls), vec!["https://a.example".to_string()]);
/// ```
pub fn clean_candidates<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut cleaned: Vec<String> = Vec::new();
    for url in urls {
        let trimmed = url.trim();
        if trimmed.is_empty() || cleaned.iter().any(|u| u == trimmed) {
            continue;
        }
        cleaned.push(trimmed.to_string());
    }
    cleaned
}
