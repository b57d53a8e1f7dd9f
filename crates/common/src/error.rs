//! Error types for catalog construction and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using pagecheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building catalogs or loading configuration.
///
/// All of these are fatal before any route runs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog directory error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Duplicate route path in catalog '{catalog}': {path}")]
    DuplicatePath { catalog: String, path: String },

    #[error("Invalid route path '{0}': paths must start with '/'")]
    InvalidPath(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid rule in route {path} (rule #{index}): {reason}")]
    InvalidRule {
        path: String,
        index: usize,
        reason: String,
    },

    #[error("Catalog parse error in {file}: {source}")]
    CatalogParse {
        file: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
