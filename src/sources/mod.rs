//! Site sources
//!
//! Produces the site → candidate URL mapping a run works on. The sites file
//! is preferred; a directory of TVBox site files is the fallback. When
//! neither is usable the mapping is empty.

mod sites_file;
mod tvbox;

pub use sites_file::read_sites_file;
pub use tvbox::read_tvbox_dir;

use crate::config::Config;
use crate::state::Site;
use std::path::{Path, PathBuf};

/// Loads the sites to probe
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `sites_override` - A sites file that replaces the configured one
///
/// # Returns
///
/// Sites ordered by name. Unreadable sources are logged and skipped.
pub fn load_sites(config: &Config, sites_override: Option<&Path>) -> Vec<Site> {
    let sites_path = sites_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.source.sites_file));

    if sites_path.exists() {
        match read_sites_file(&sites_path) {
            Ok(sites) => {
                tracing::info!(
                    step = "extract",
                    path = %sites_path.display(),
                    sites = sites.len(),
                    "Loaded sites file"
                );
                return sites;
            }
            Err(e) => {
                tracing::warn!(step = "extract", path = %sites_path.display(), "{}", e);
            }
        }
    }

    let Some(dir) = config.source.tvbox_json_dir.as_deref() else {
        tracing::error!(
            step = "extract",
            path = %sites_path.display(),
            "Sites file unavailable and no TVBox directory configured"
        );
        return Vec::new();
    };

    match read_tvbox_dir(Path::new(dir), &config.sites.mapping) {
        Ok(sites) => {
            tracing::info!(step = "extract", dir, sites = sites.len(), "Loaded TVBox files");
            sites
        }
        Err(e) => {
            tracing::error!(step = "extract", dir, "{}", e);
            Vec::new()
        }
    }
}
