//! Run reports: per-rule observations, per-route outcomes, per-catalog summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use pagecheck_common::ElementRule;

use crate::error::E2eResult;

/// What the runner saw when it evaluated a rule against the live page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub found: bool,
    pub visible: bool,
    pub matched_count: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Number of evaluation attempts before the verdict
    pub attempts: u32,
}

impl Observation {
    pub fn with_matches(count: usize) -> Self {
        Self {
            found: count > 0,
            matched_count: count,
            ..Default::default()
        }
    }
}

/// Why a rule or route failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    ElementNotFound { locator: String },
    CountMismatch { expected: usize, actual: usize },
    AmbiguousMatch { locator: String, count: usize },
    NotVisible { locator: String },
    AttributeMismatch { name: String, expected: String, actual: Option<String> },
    StyleMismatch { property: String, expected: String, actual: String },
    TitleMismatch { expected: String, actual: String },
    UrlMismatch { expected: String, actual: String },
    Navigation { message: String },
    RuntimeErrorDetected { errors: Vec<String> },
    Driver { message: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ElementNotFound { locator } => write!(f, "element not found: {}", locator),
            FailureKind::CountMismatch { expected, actual } => {
                write!(f, "expected {} match(es), found {}", expected, actual)
            }
            FailureKind::AmbiguousMatch { locator, count } => {
                write!(f, "{} matched {} elements, expected one", locator, count)
            }
            FailureKind::NotVisible { locator } => write!(f, "element not visible: {}", locator),
            FailureKind::AttributeMismatch { name, expected, actual } => match actual {
                Some(actual) => write!(f, "attribute {}: expected {:?}, got {:?}", name, expected, actual),
                None => write!(f, "attribute {} missing, expected {:?}", name, expected),
            },
            FailureKind::StyleMismatch { property, expected, actual } => {
                write!(f, "style {}: expected {}, got {:?}", property, expected, actual)
            }
            FailureKind::TitleMismatch { expected, actual } => {
                write!(f, "title {:?} does not match {}", actual, expected)
            }
            FailureKind::UrlMismatch { expected, actual } => {
                write!(f, "url {} does not match {}", actual, expected)
            }
            FailureKind::Navigation { message } => write!(f, "navigation failed: {}", message),
            FailureKind::RuntimeErrorDetected { errors } => {
                write!(f, "{} runtime error(s): {}", errors.len(), errors.join("; "))
            }
            FailureKind::Driver { message } => write!(f, "driver error: {}", message),
        }
    }
}

/// Lifecycle of one route inside a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    Pending,
    Navigating,
    Evaluating,
    Passed,
    Failed,
}

impl RouteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteState::Passed | RouteState::Failed)
    }

    pub fn can_transition_to(&self, next: RouteState) -> bool {
        use RouteState::*;
        matches!(
            (self, next),
            (Pending, Navigating)
                | (Navigating, Evaluating)
                | (Navigating, Failed)
                | (Evaluating, Passed)
                | (Evaluating, Failed)
        )
    }
}

/// Verdict for one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub index: usize,
    pub rule: ElementRule,
    pub observation: Observation,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

/// Verdict for one route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteReport {
    pub path: String,
    pub name: String,
    pub state: RouteState,
    /// Every state the route passed through, starting at `Pending`
    pub history: Vec<RouteState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rules: Vec<RuleOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Index of the rule that failed, if a rule caused the failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_rule: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime_errors: Vec<String>,
    pub navigation_attempts: u32,
    pub duration_ms: u64,
}

impl RouteReport {
    pub fn passed(&self) -> bool {
        self.state == RouteState::Passed
    }
}

/// Outcome of running one catalog on one runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub catalog: String,
    /// Routes in declaration order
    pub routes: Vec<RouteReport>,
    pub duration_ms: u64,
}

impl Report {
    pub fn new(catalog: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            routes: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn route(&self, path: &str) -> Option<&RouteReport> {
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn passed(&self) -> usize {
        self.routes.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.routes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.routes.iter().all(RouteReport::passed)
    }

    pub fn route_paths(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.path.as_str()).collect()
    }
}

/// Outcome of a whole suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    /// Catalogs in the order they were submitted
    pub catalogs: Vec<Report>,
}

impl SuiteReport {
    pub fn from_reports(
        started_at: DateTime<Utc>,
        base_url: impl Into<String>,
        duration_ms: u64,
        catalogs: Vec<Report>,
    ) -> Self {
        let passed = catalogs.iter().map(Report::passed).sum();
        let failed = catalogs.iter().map(Report::failed).sum();
        Self {
            started_at,
            base_url: base_url.into(),
            total: passed + failed,
            passed,
            failed,
            duration_ms,
            catalogs,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// 0 if every route passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Write the report as JSON into `output_dir`
    pub fn write_json(&self, output_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("pagecheck-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn route(path: &str, state: RouteState) -> RouteReport {
        RouteReport {
            path: path.to_string(),
            name: path.to_string(),
            state,
            history: vec![RouteState::Pending, state],
            title: None,
            rules: vec![],
            failure: None,
            failed_rule: None,
            runtime_errors: vec![],
            navigation_attempts: 1,
            duration_ms: 0,
        }
    }

    #[test_case(RouteState::Pending, RouteState::Navigating, true)]
    #[test_case(RouteState::Navigating, RouteState::Evaluating, true)]
    #[test_case(RouteState::Navigating, RouteState::Failed, true)]
    #[test_case(RouteState::Evaluating, RouteState::Passed, true)]
    #[test_case(RouteState::Pending, RouteState::Evaluating, false ; "cannot skip navigation")]
    #[test_case(RouteState::Passed, RouteState::Failed, false ; "terminal passed")]
    #[test_case(RouteState::Failed, RouteState::Navigating, false ; "terminal failed")]
    fn test_state_transitions(from: RouteState, to: RouteState, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_terminal_states() {
        assert!(RouteState::Failed.is_terminal());
        assert!(RouteState::Passed.is_terminal());
        assert!(!RouteState::Evaluating.is_terminal());
    }

    #[test]
    fn test_suite_exit_code() {
        let mut report = Report::new("navigation");
        report.routes.push(route("/", RouteState::Passed));
        let suite = SuiteReport::from_reports(Utc::now(), "http://localhost", 10, vec![report.clone()]);
        assert_eq!(suite.exit_code(), 0);

        report.routes.push(route("/agenda", RouteState::Failed));
        let suite = SuiteReport::from_reports(Utc::now(), "http://localhost", 10, vec![report]);
        assert_eq!(suite.total, 2);
        assert_eq!(suite.failed, 1);
        assert_eq!(suite.exit_code(), 1);
    }

    #[test]
    fn test_failure_kind_serializes_with_kind_tag() {
        let failure = FailureKind::CountMismatch { expected: 6, actual: 5 };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "count_mismatch");
        assert_eq!(failure.to_string(), "expected 6 match(es), found 5");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let suite = SuiteReport::from_reports(Utc::now(), "http://localhost", 0, vec![Report::new("empty")]);
        let path = suite.write_json(dir.path()).unwrap();
        let written: SuiteReport = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written.catalogs.len(), 1);
        assert!(written.success());
    }
}
