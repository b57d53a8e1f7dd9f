//! Validate catalogs and configuration without opening a browser

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use pagecheck_common::HarnessConfig;

use crate::output::{print_info, print_success};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Catalog files or directories (default: ./specs)
    pub paths: Vec<PathBuf>,
}

/// Any load error propagates and becomes a harness failure
pub fn execute(args: ValidateArgs, config: &HarnessConfig) -> Result<i32> {
    let catalogs = super::load_catalogs(&args.paths)?;

    for catalog in &catalogs {
        if catalog.description().is_empty() {
            print_info(&format!("{}: {} route(s)", catalog.name(), catalog.len()));
        } else {
            print_info(&format!(
                "{}: {} route(s), {}",
                catalog.name(),
                catalog.len(),
                catalog.description()
            ));
        }
    }

    let routes: usize = catalogs.iter().map(|c| c.len()).sum();
    let rules: usize = catalogs.iter().map(|c| c.rule_count()).sum();
    print_success(&format!(
        "{} catalog(s), {} route(s), {} rule(s) are valid",
        catalogs.len(),
        routes,
        rules
    ));
    print_success(&format!(
        "Configuration valid: {} with {} worker(s) on {}",
        config.base_url, config.workers, config.browser.engine
    ));
    Ok(0)
}
