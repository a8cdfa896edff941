use crate::config::types::{
    redact_url, Config, OutputConfig, ProxyConfig, SitesConfig, TesterConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_tester_config(&config.tester)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    validate_sites_config(&config.sites)?;
    Ok(())
}

/// Validates probe and ranking settings
fn validate_tester_config(config: &TesterConfig) -> Result<(), ConfigError> {
    if config.test_timeout < 1 || config.test_timeout > 300 {
        return Err(ConfigError::Validation(format!(
            "test_timeout must be between 1 and 300 seconds, got {}",
            config.test_timeout
        )));
    }

    if config.history_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "history_limit must be >= 1, got {}",
            config.history_limit
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates proxy settings
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    if !config.is_active() {
        return Err(ConfigError::Validation(
            "proxy is enabled but no proxy URL is configured".to_string(),
        ));
    }

    for proxy in [&config.proxies.http, &config.proxies.https]
        .into_iter()
        .flatten()
    {
        Url::parse(proxy)
            .map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid proxy URL '{}': {}", redact_url(proxy), e))
            })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("snapshot_path", &config.snapshot_path),
        ("history_path", &config.history_path),
        ("summary_path", &config.summary_path),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.snapshot_path == config.history_path {
        return Err(ConfigError::Validation(
            "snapshot_path and history_path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates per-site settings
fn validate_sites_config(config: &SitesConfig) -> Result<(), ConfigError> {
    for (site, weights) in &config.url_weights {
        for url in weights.keys() {
            validate_http_url(url).map_err(|reason| {
                ConfigError::InvalidUrl(format!(
                    "Invalid weighted URL '{}' for site '{}': {}",
                    url, site, reason
                ))
            })?;
        }
    }

    for (site, path) in &config.search_paths {
        if path.contains("://") {
            return Err(ConfigError::Validation(format!(
                "search path for site '{}' must be a relative path, got '{}'",
                site, path
            )));
        }
    }

    for (file, site) in &config.mapping {
        if file.trim().is_empty() || site.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "mapping entry '{}' -> '{}' must name both a file and a site",
                file, site
            )));
        }
    }

    Ok(())
}

/// Checks that a URL parses and uses an HTTP scheme
fn validate_http_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
