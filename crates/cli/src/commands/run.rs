//! Run catalogs against the site

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use pagecheck_common::HarnessConfig;
use pagecheck_e2e::playwright::{PlaywrightConfig, PlaywrightFactory};
use pagecheck_e2e::server::SiteServer;
use pagecheck_e2e::{RunnerSettings, Suite};

use crate::output::{print_info, print_report, print_warning, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Catalog files or directories (default: ./specs)
    pub paths: Vec<PathBuf>,

    /// Run only catalogs carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only these route paths (repeatable)
    #[arg(short, long = "route")]
    pub routes: Vec<String>,

    /// Do not write the results file
    #[arg(long)]
    pub no_results: bool,
}

/// Returns the process exit code: 0 when every route passed, 1 otherwise
pub async fn execute(args: RunArgs, config: HarnessConfig, format: OutputFormat) -> Result<i32> {
    let catalogs = super::select(
        super::load_catalogs(&args.paths)?,
        args.tag.as_deref(),
        &args.routes,
    );
    if catalogs.is_empty() {
        print_warning("No routes selected");
        return Ok(0);
    }

    // Held for the duration of the run; stopped on drop
    let _server = match &config.site_server {
        Some(server) => Some(
            SiteServer::spawn(server, &config.base_url)
                .await
                .context("Failed to start site server")?,
        ),
        None => None,
    };

    info!(
        "Checking {} route(s) in {} catalog(s) against {}",
        catalogs.iter().map(|c| c.len()).sum::<usize>(),
        catalogs.len(),
        config.base_url
    );

    let factory = PlaywrightFactory::new(PlaywrightConfig::from(&config));
    let suite = Suite::new(factory, RunnerSettings::from(&config), config.workers)
        .with_base_url(config.base_url.clone());
    let report = suite.run(catalogs).await?;

    print_report(&report, format);

    if !args.no_results {
        let path = report
            .write_json(&config.output_dir)
            .context("Failed to write results")?;
        if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
            print_info(&format!("Results written to {}", path.display()));
        }
    }

    Ok(report.exit_code())
}
