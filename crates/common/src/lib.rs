//! pagecheck Common Library
//!
//! Route catalogs, element rules, patterns and configuration shared by the
//! assertion runner and the CLI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod pattern;
pub mod route;
pub mod rule;

// Re-export commonly used types
pub use catalog::RouteCatalog;
pub use config::{BrowserConfig, BrowserKind, HarnessConfig, RetryConfig, SiteServerConfig, TimeoutConfig};
pub use error::{Error, Result};
pub use pattern::{NamePattern, TextPattern, TitlePattern};
pub use route::{LoadMilestone, RouteDescriptor};
pub use rule::{AttributeMatch, Condition, ElementRule, Locator, StyleExpectation};

/// pagecheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
