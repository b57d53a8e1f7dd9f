//! CLI Commands

pub mod init;
pub mod list;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use pagecheck_common::{BrowserKind, HarnessConfig, RouteCatalog};

/// Directory searched for catalogs when no paths are given
pub const DEFAULT_SPECS_DIR: &str = "specs";

/// Settings that override the configuration file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub workers: Option<usize>,
    pub browser: Option<BrowserKind>,
    pub headed: bool,
    pub output_dir: Option<PathBuf>,
}

/// Load the configuration file (defaults when absent) and apply overrides
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    if let Some(base_url) = &overrides.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(workers) = overrides.workers {
        config.workers = workers;
    }
    if let Some(browser) = overrides.browser {
        config.browser.engine = browser;
    }
    if overrides.headed {
        config.browser.headless = false;
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load catalogs from files and directories, or from `specs/` when none are given
pub fn load_catalogs(paths: &[PathBuf]) -> Result<Vec<RouteCatalog>> {
    let catalogs = if paths.is_empty() {
        RouteCatalog::load_all(Path::new(DEFAULT_SPECS_DIR))
    } else {
        RouteCatalog::load_paths(paths)
    };
    catalogs.context("Failed to load catalogs")
}

/// Narrow catalogs to a tag and to explicit route paths, dropping emptied catalogs
pub fn select(catalogs: Vec<RouteCatalog>, tag: Option<&str>, routes: &[String]) -> Vec<RouteCatalog> {
    let catalogs = match tag {
        Some(tag) => RouteCatalog::filter_by_tag(catalogs, tag),
        None => catalogs,
    };
    if routes.is_empty() {
        return catalogs;
    }

    catalogs
        .into_iter()
        .filter_map(|mut catalog| {
            catalog.retain_routes(|r| routes.iter().any(|p| p == &r.path));
            (!catalog.is_empty()).then_some(catalog)
        })
        .collect()
}
