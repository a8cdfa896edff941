use crate::config::Config;
use std::collections::HashMap;

/// A named target and its candidate URLs, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub name: String,
    pub urls: Vec<String>,
}

impl Site {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }
}

/// Per-site probe settings resolved from the configuration
#[derive(Debug, Clone, Default)]
pub struct SiteContext {
    pub name: String,
    pub search_path: Option<String>,
    pub keyword: Option<String>,
    /// Present only when the operator configured weights for this site
    pub weights: Option<HashMap<String, i64>>,
    pub default_weight: i64,
}

impl SiteContext {
    /// Resolves the settings for a site
    pub fn from_config(name: &str, config: &Config) -> Self {
        Self {
            name: name.to_string(),
            search_path: config.sites.search_path_for(name).map(str::to_string),
            keyword: config.sites.keyword_for(name).map(str::to_string),
            weights: config.sites.weights_for(name).cloned(),
            default_weight: config.tester.default_weight,
        }
    }

    /// Returns true if this site ranks by weight
    pub fn is_weighted(&self) -> bool {
        self.weights.is_some()
    }

    /// Returns the weight of a candidate, falling back to the default weight
    pub fn weight_of(&self, url: &str) -> i64 {
        self.weights
            .as_ref()
            .and_then(|w| w.get(url.trim()).copied())
            .unwrap_or(self.default_weight)
    }
}
