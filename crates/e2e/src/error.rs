//! Error types for driving pages and running catalogs

use thiserror::Error;

/// Failures raised by a `PageDriver`
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timeout after {ms} ms waiting for: {operation}")]
    Timeout { operation: String, ms: u64 },

    #[error("Node handle {0} is stale or unknown")]
    StaleNode(u64),

    #[error("Browser bridge not available: {0}. Install with: npm install playwright && npx playwright install")]
    BridgeNotFound(String),

    #[error("Browser bridge error: {0}")]
    Bridge(String),

    #[error("Browser session closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl DriverError {
    /// Whether navigation may be attempted again after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Navigation { .. } | DriverError::Timeout { .. })
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError::Protocol(e.to_string())
    }
}

/// Harness-level errors
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] pagecheck_common::Error),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Site server failed to start: {0}")]
    ServerStartup(String),

    #[error("Site server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
