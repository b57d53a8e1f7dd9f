//! Live E2E entry point
//!
//! Runs the route catalogs under `specs/` against a served site.
//! Run with: PAGECHECK_BASE_URL=http://127.0.0.1:8080 cargo test --package pagecheck-e2e --test e2e
//!
//! Without a base URL there is no site to check and the run is skipped.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagecheck_common::{BrowserKind, HarnessConfig, RouteCatalog};
use pagecheck_e2e::playwright::{PlaywrightConfig, PlaywrightFactory};
use pagecheck_e2e::server::SiteServer;
use pagecheck_e2e::{E2eResult, RunnerSettings, Suite};

#[derive(Parser, Debug)]
#[command(name = "pagecheck-e2e")]
#[command(about = "Run pagecheck catalogs against a live site")]
struct Args {
    /// Base URL of the site under test
    #[arg(long, env = "PAGECHECK_BASE_URL")]
    base_url: Option<String>,

    /// Path to catalog directory (defaults to the workspace `specs/`)
    #[arg(short, long)]
    specs: Option<PathBuf>,

    /// Harness configuration file
    #[arg(short, long, env = "PAGECHECK_CONFIG")]
    config: Option<PathBuf>,

    /// Run only catalogs carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, env = "PAGECHECK_BROWSER")]
    browser: Option<BrowserKind>,

    /// Parallel runners
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let Some(base_url) = args.base_url.clone() else {
        eprintln!("PAGECHECK_BASE_URL not set, skipping live catalogs");
        std::process::exit(0);
    };

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    match rt.block_on(async_main(args, base_url)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args, base_url: String) -> E2eResult<i32> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    config.base_url = base_url;
    if let Some(browser) = args.browser {
        config.browser.engine = browser;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    config.validate()?;

    let specs = args
        .specs
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../specs"));
    let mut catalogs = RouteCatalog::load_all(&specs)?;
    if let Some(tag) = &args.tag {
        catalogs = RouteCatalog::filter_by_tag(catalogs, tag);
    }
    info!("Loaded {} catalog(s) from {}", catalogs.len(), specs.display());

    // Held for the duration of the run; stopped on drop
    let _server = match &config.site_server {
        Some(server) => Some(SiteServer::spawn(server, &config.base_url).await?),
        None => None,
    };

    let factory = PlaywrightFactory::new(PlaywrightConfig::from(&config));
    let suite = Suite::new(factory, RunnerSettings::from(&config), config.workers)
        .with_base_url(config.base_url.clone());
    let report = suite.run(catalogs).await?;

    let path = report.write_json(&config.output_dir)?;
    info!("Results written to {}", path.display());

    Ok(report.exit_code())
}
