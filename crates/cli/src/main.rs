//! pagecheck CLI - Main Entry Point
//!
//! Loads route catalogs, runs them against a site through a real browser
//! and reports per-route verdicts.
//!
//! Exit codes: 0 all routes passed, 1 a route failed, 2 harness error.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pagecheck_cli::commands::{self, init, list, run, validate, Overrides};
use pagecheck_cli::output::{print_error, OutputFormat};
use pagecheck_common::config::DEFAULT_CONFIG_FILE;
use pagecheck_common::BrowserKind;

/// pagecheck - declarative content checks for websites
#[derive(Parser)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "PAGECHECK_CONFIG", global = true)]
    config: PathBuf,

    /// Base URL of the site under test
    #[arg(long, env = "PAGECHECK_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Parallel runners, one browser session each
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(long, env = "PAGECHECK_BROWSER", global = true)]
    browser: Option<BrowserKind>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Output directory for results
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run catalogs against the site
    Run(run::RunArgs),

    /// List declared routes
    List(list::ListArgs),

    /// Check catalogs and configuration without opening a browser
    Validate(validate::ValidateArgs),

    /// Write a default configuration file
    Init(init::InitArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let overrides = Overrides {
        base_url: cli.base_url.clone(),
        workers: cli.workers,
        browser: cli.browser,
        headed: cli.headed,
        output_dir: cli.output.clone(),
    };

    match cli.command {
        Commands::Run(args) => {
            let config = commands::load_config(&cli.config, &overrides)?;
            run::execute(args, config, cli.format).await
        }
        Commands::List(args) => list::execute(args, cli.format),
        Commands::Validate(args) => {
            let config = commands::load_config(&cli.config, &overrides)?;
            validate::execute(args, &config)
        }
        Commands::Init(args) => init::execute(args, &cli.config, cli.base_url.as_deref()),
        Commands::Version => {
            println!("pagecheck v{}", env!("CARGO_PKG_VERSION"));
            println!("pagecheck-common v{}", pagecheck_common::VERSION);
            Ok(0)
        }
    }
}
