//! Write a starter configuration file

use anyhow::{bail, Result};
use clap::Args;
use std::path::Path;

use pagecheck_common::HarnessConfig;

use crate::output::print_success;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Writes the defaults, with `--base-url` applied when given
pub fn execute(args: InitArgs, path: &Path, base_url: Option<&str>) -> Result<i32> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let mut config = HarnessConfig::default();
    if let Some(base_url) = base_url {
        config.base_url = base_url.to_string();
    }
    config.validate()?;
    config.save(path)?;

    print_success(&format!("Wrote {}", path.display()));
    Ok(0)
}
