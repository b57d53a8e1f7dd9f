//! Page driver abstraction over a live browser session

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use pagecheck_common::{LoadMilestone, Locator};

use crate::error::DriverError;

/// Opaque reference to a node resolved by `PageDriver::locate`.
///
/// Valid until the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u64);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Uncaught page errors collected since the last navigation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeErrorLog {
    messages: Vec<String>,
}

impl RuntimeErrorLog {
    /// Upper bound on retained messages; later distinct messages are discarded
    pub const CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message, ignoring exact duplicates and anything past capacity
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.messages.len() < Self::CAPACITY && !self.messages.contains(&message) {
            self.messages.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl FromIterator<String> for RuntimeErrorLog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut log = RuntimeErrorLog::new();
        for message in iter {
            log.record(message);
        }
        log
    }
}

/// Navigation and inspection over a single live page session.
///
/// Calls are sequential: the runner owns the driver and never issues
/// overlapping requests against one session.
#[async_trait]
pub trait PageDriver: Send {
    /// Load `path` and suspend until `milestone` is reached.
    /// Clears node handles and the runtime error log.
    async fn navigate(&mut self, path: &str, milestone: LoadMilestone) -> Result<(), DriverError>;

    /// Current document title
    async fn title(&mut self) -> Result<String, DriverError>;

    /// Current URL, including any fragment
    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// All nodes matching the locator, in document order
    async fn locate(&mut self, locator: &Locator) -> Result<Vec<NodeHandle>, DriverError>;

    /// Non-zero rendered box and not hidden by styling
    async fn is_visible(&mut self, node: NodeHandle) -> Result<bool, DriverError>;

    async fn attribute_value(&mut self, node: NodeHandle, name: &str) -> Result<Option<String>, DriverError>;

    /// Resolved value of a CSS property, e.g. `background-image`
    async fn computed_style(&mut self, node: NodeHandle, property: &str) -> Result<String, DriverError>;

    async fn click(&mut self, node: NodeHandle) -> Result<(), DriverError>;

    async fn hover(&mut self, node: NodeHandle) -> Result<(), DriverError>;

    /// Uncaught errors since the last navigation
    async fn collect_errors(&mut self) -> Result<RuntimeErrorLog, DriverError>;

    /// Release the browser session
    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Opens independent driver sessions, one per runner
#[async_trait]
pub trait DriverFactory: Send + Sync + 'static {
    type Driver: PageDriver + 'static;

    async fn open(&self) -> Result<Self::Driver, DriverError>;
}

/// Timing knobs shared by drivers and the runner
#[derive(Debug, Clone)]
pub struct DriverTimeouts {
    pub navigation: Duration,
    pub action: Duration,
}

impl Default for DriverTimeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            action: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_log_dedupes_and_bounds() {
        let mut log = RuntimeErrorLog::new();
        log.record("ReferenceError: gtag is not defined");
        log.record("ReferenceError: gtag is not defined");
        assert_eq!(log.len(), 1);

        for i in 0..100 {
            log.record(format!("error {}", i));
        }
        assert_eq!(log.len(), RuntimeErrorLog::CAPACITY);
    }

    #[test]
    fn test_error_log_serializes_as_list() {
        let log: RuntimeErrorLog = vec!["boom".to_string()].into_iter().collect();
        assert_eq!(serde_json::to_string(&log).unwrap(), r#"["boom"]"#);
    }
}
