//! Response body validation
//!
//! A 200 response is only trusted when the body carries the site's keyword.
//! Parked domains and edge-protection challenge pages answer 200 too; their
//! `<title>` is captured so the failure detail says what was served instead.

use scraper::{Html, Selector};

/// Maximum length of an error detail, in characters
pub const MAX_DETAIL_CHARS: usize = 100;

/// Returns true if the body satisfies the keyword requirement
///
/// A missing keyword means no requirement.
pub fn contains_keyword(body: &str, keyword: Option<&str>) -> bool {
    match keyword {
        Some(keyword) => body.contains(keyword),
        None => true,
    }
}

/// Extracts the page title from an HTML document
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Builds the detail recorded for an `invalid_content` failure
pub fn invalid_content_detail(body: &str, keyword: &str) -> String {
    let detail = match extract_title(body) {
        Some(title) => format!("keyword '{}' not found (page title: {})", keyword, title),
        None => format!("keyword '{}' not found", keyword),
    };
    truncate_detail(&detail)
}

/// Shortens a detail message to `MAX_DETAIL_CHARS` characters
pub fn truncate_detail(detail: &str) -> String {
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        return detail.to_string();
    }
    let mut truncated: String = detail.chars().take(MAX_DETAIL_CHARS).collect();
    truncated.push_str("...");
    truncated
}
