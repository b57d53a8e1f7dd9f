//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use pagecheck_common::RouteCatalog;
use pagecheck_e2e::{RouteReport, SuiteReport};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// One route of a suite run, flattened for display
#[derive(Debug, Serialize)]
pub struct RouteRow {
    pub catalog: String,
    pub route: String,
    pub path: String,
    pub status: String,
    pub rules: String,
    pub duration_ms: u64,
    pub failure: String,
}

impl RouteRow {
    pub fn from_report(catalog: &str, route: &RouteReport) -> Self {
        let evaluated = route.rules.iter().filter(|r| r.passed).count();
        Self {
            catalog: catalog.to_string(),
            route: route.name.clone(),
            path: route.path.clone(),
            status: if route.passed() { "passed" } else { "failed" }.to_string(),
            rules: format!("{}/{}", evaluated, route.rules.len()),
            duration_ms: route.duration_ms,
            failure: match (&route.failure, route.failed_rule) {
                (Some(failure), Some(index)) => format!("rule #{}: {}", index, failure),
                (Some(failure), None) => failure.to_string(),
                (None, _) => String::new(),
            },
        }
    }
}

impl TableDisplay for RouteRow {
    fn headers() -> Vec<&'static str> {
        vec!["Catalog", "Route", "Path", "Status", "Rules", "Duration", "Failure"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.catalog.clone(),
            self.route.clone(),
            self.path.clone(),
            self.status.clone(),
            self.rules.clone(),
            format!("{} ms", self.duration_ms),
            self.failure.clone(),
        ]
    }
}

/// A declared route, as shown by `list`
#[derive(Debug, Serialize)]
pub struct CatalogRow {
    pub catalog: String,
    pub tags: String,
    pub path: String,
    pub title: String,
    pub rules: usize,
    pub runtime_errors: bool,
}

impl CatalogRow {
    pub fn rows(catalog: &RouteCatalog) -> Vec<Self> {
        catalog
            .routes()
            .iter()
            .map(|route| Self {
                catalog: catalog.name().to_string(),
                tags: catalog.tags().join(","),
                path: route.path.clone(),
                title: route.title.as_ref().map(ToString::to_string).unwrap_or_default(),
                rules: route.required_elements.len(),
                runtime_errors: route.check_runtime_errors,
            })
            .collect()
    }
}

impl TableDisplay for CatalogRow {
    fn headers() -> Vec<&'static str> {
        vec!["Catalog", "Tags", "Path", "Title", "Rules", "Runtime Errors"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.catalog.clone(),
            self.tags.clone(),
            self.path.clone(),
            self.title.clone(),
            self.rules.to_string(),
            if self.runtime_errors { "checked" } else { "-" }.to_string(),
        ]
    }
}

fn table<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => println!("{}", table(items)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print a suite report: the full document for machine formats,
/// a route table plus summary line otherwise
pub fn print_report(report: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(report).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let rows: Vec<RouteRow> = report
                .catalogs
                .iter()
                .flat_map(|c| c.routes.iter().map(|r| RouteRow::from_report(&c.catalog, r)))
                .collect();
            print_list(&rows, format);
            println!();
            print_summary(report);
        }
    }
}

fn print_summary(report: &SuiteReport) {
    let passed = format!("{} passed", report.passed);
    let failed = format!("{} failed", report.failed);
    println!(
        "{} {}, {} ({} routes in {} ms, started {})",
        if report.success() { "✓".green() } else { "✗".red() },
        passed.green(),
        if report.failed > 0 { failed.red() } else { failed.normal() },
        report.total,
        report.duration_ms,
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
