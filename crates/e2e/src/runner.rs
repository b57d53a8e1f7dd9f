//! Assertion runner: drives one page session through a route catalog

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use pagecheck_common::{
    Condition, ElementRule, HarnessConfig, Locator, RouteCatalog, RouteDescriptor, TextPattern,
    TitlePattern,
};

use crate::driver::{NodeHandle, PageDriver};
use crate::error::DriverError;
use crate::report::{FailureKind, Observation, Report, RouteReport, RouteState, RuleOutcome};

/// Retry and timeout policy applied by the runner
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// How long a rule retries against the live page before failing
    pub locate_timeout: Duration,

    pub poll_interval: Duration,

    /// Total navigation attempts, including the first
    pub navigation_attempts: u32,

    /// Backoff before the next navigation attempt, scaled by attempt number
    pub navigation_backoff: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            locate_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            navigation_attempts: 2,
            navigation_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&HarnessConfig> for RunnerSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            locate_timeout: config.timeouts.locate(),
            poll_interval: config.timeouts.poll_interval(),
            navigation_attempts: config.retry.navigation_attempts.max(1),
            navigation_backoff: config.retry.backoff(),
        }
    }
}

/// Result of one evaluation attempt
type Verdict = Result<(), FailureKind>;

/// Runs routes sequentially on a single exclusively-owned page session
pub struct AssertionRunner<D: PageDriver> {
    driver: D,
    settings: RunnerSettings,
}

impl<D: PageDriver> AssertionRunner<D> {
    pub fn new(driver: D, settings: RunnerSettings) -> Self {
        Self { driver, settings }
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Run every route of the catalog in declaration order.
    ///
    /// Route failures are recorded in the report and never abort siblings.
    pub async fn run(&mut self, catalog: &RouteCatalog) -> Report {
        let start = Instant::now();
        let mut report = Report::new(catalog.name());

        info!("Running catalog '{}' ({} route(s))", catalog.name(), catalog.len());

        for route in catalog.routes() {
            let result = self.run_route(route).await;
            if result.passed() {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result
                        .failure
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "unknown error".to_string())
                );
            }
            report.routes.push(result);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        report
    }

    /// Run the catalog, then release the session whatever the outcome
    pub async fn run_to_completion(mut self, catalog: &RouteCatalog) -> Report {
        let report = self.run(catalog).await;
        if let Err(e) = self.driver.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        report
    }

    /// Pending -> Navigating -> Evaluating -> Passed | Failed
    pub async fn run_route(&mut self, route: &RouteDescriptor) -> RouteReport {
        let start = Instant::now();
        let mut tracker = RouteTracker::new(route);

        debug!("Running route: {}", route.path);

        tracker.transition(RouteState::Navigating);
        match self.navigate_with_retry(route, &mut tracker).await {
            Ok(()) => tracker.transition(RouteState::Evaluating),
            Err(e) => {
                tracker.fail(FailureKind::Navigation { message: e.to_string() }, None);
                return tracker.finish(start);
            }
        }

        if let Some(expected) = &route.title {
            let (title, verdict) = self.poll_title(expected).await;
            tracker.report.title = title;
            if let Err(failure) = verdict {
                tracker.fail(failure, None);
                return tracker.finish(start);
            }
        }

        for (index, rule) in route.required_elements.iter().enumerate() {
            let outcome = self.evaluate_rule(index, rule).await;
            let failure = outcome.failure.clone();
            tracker.report.rules.push(outcome);

            if let Some(failure) = failure {
                tracker.fail(failure, Some(index));
                return tracker.finish(start);
            }
        }

        match self.driver.collect_errors().await {
            Ok(errors) => {
                let errors = errors.into_messages();
                if !errors.is_empty() {
                    warn!("{} runtime error(s) on {}", errors.len(), route.path);
                }
                tracker.report.runtime_errors = errors.clone();
                if route.check_runtime_errors && !errors.is_empty() {
                    tracker.fail(FailureKind::RuntimeErrorDetected { errors }, None);
                    return tracker.finish(start);
                }
            }
            Err(e) if route.check_runtime_errors => {
                tracker.fail(FailureKind::Driver { message: e.to_string() }, None);
                return tracker.finish(start);
            }
            Err(e) => debug!("Could not collect runtime errors: {}", e),
        }

        tracker.transition(RouteState::Passed);
        tracker.finish(start)
    }

    async fn navigate_with_retry(
        &mut self,
        route: &RouteDescriptor,
        tracker: &mut RouteTracker,
    ) -> Result<(), DriverError> {
        let attempts = self.settings.navigation_attempts.max(1);
        let mut attempt = 1;

        loop {
            tracker.report.navigation_attempts = attempt;
            match self.driver.navigate(&route.path, route.milestone).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let backoff = self.settings.navigation_backoff * attempt;
                    warn!(
                        "Navigation to {} failed (attempt {}/{}): {}; retrying in {:?}",
                        route.path, attempt, attempts, e, backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn poll_title(&mut self, expected: &TitlePattern) -> (Option<String>, Verdict) {
        let deadline = Instant::now() + self.settings.locate_timeout;
        loop {
            let verdict = match self.driver.title().await {
                Ok(title) if expected.matches(&title) => return (Some(title), Ok(())),
                Ok(title) => (
                    Some(title.clone()),
                    Err(FailureKind::TitleMismatch {
                        expected: expected.to_string(),
                        actual: title,
                    }),
                ),
                Err(e) => return (None, Err(FailureKind::Driver { message: e.to_string() })),
            };
            if Instant::now() >= deadline {
                return verdict;
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    /// Evaluate one rule against the current page, retrying until the
    /// condition holds or the locate timeout expires.
    ///
    /// Does not navigate, so repeated calls observe the same document.
    pub async fn evaluate_rule(&mut self, index: usize, rule: &ElementRule) -> RuleOutcome {
        debug!("Evaluating rule #{}: {}", index, rule);

        let result = match rule {
            ElementRule::Check { locator, condition } => self.poll_check(locator, condition).await,
            ElementRule::AnchorLink {
                click,
                url_pattern,
                target,
            } => self.evaluate_anchor(click, url_pattern, target).await,
            ElementRule::Hover { target } => self.evaluate_hover(target).await,
        };

        let (observation, verdict) = match result {
            Ok(pair) => pair,
            Err(e) => (Observation::default(), Err(FailureKind::Driver { message: e.to_string() })),
        };

        RuleOutcome {
            index,
            rule: rule.clone(),
            observation,
            passed: verdict.is_ok(),
            failure: verdict.err(),
        }
    }

    async fn poll_check(
        &mut self,
        locator: &Locator,
        condition: &Condition,
    ) -> Result<(Observation, Verdict), DriverError> {
        let deadline = Instant::now() + self.settings.locate_timeout;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let (mut observation, verdict) = self.check_once(locator, condition).await?;
            observation.attempts = attempts;
            if verdict.is_ok() || Instant::now() >= deadline {
                return Ok((observation, verdict));
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn check_once(
        &mut self,
        locator: &Locator,
        condition: &Condition,
    ) -> Result<(Observation, Verdict), DriverError> {
        let nodes = self.resolve(locator, condition).await?;
        let mut observation = Observation::with_matches(nodes.len());

        let verdict = match condition {
            Condition::Count { count } => count_verdict(locator, *count, nodes.len()),
            Condition::Visible => match single(locator, &nodes) {
                Err(failure) => Err(failure),
                Ok(node) => {
                    observation.visible = self.driver.is_visible(node).await?;
                    if observation.visible {
                        Ok(())
                    } else {
                        Err(FailureKind::NotVisible {
                            locator: locator.to_string(),
                        })
                    }
                }
            },
            Condition::HasAttribute { name, value } => match single(locator, &nodes) {
                Err(failure) => Err(failure),
                Ok(node) => {
                    let actual = self.driver.attribute_value(node, name).await?;
                    if let Some(actual) = &actual {
                        observation.attributes.insert(name.clone(), actual.clone());
                    }
                    if actual.as_deref() == Some(value.as_str()) {
                        Ok(())
                    } else {
                        Err(FailureKind::AttributeMismatch {
                            name: name.clone(),
                            expected: value.clone(),
                            actual,
                        })
                    }
                }
            },
            Condition::ComputedStyle { property, check } => match single(locator, &nodes) {
                Err(failure) => Err(failure),
                Ok(node) => {
                    let actual = self.driver.computed_style(node, property).await?;
                    observation.styles.insert(property.clone(), actual.clone());
                    if check.matches(&actual) {
                        Ok(())
                    } else {
                        Err(FailureKind::StyleMismatch {
                            property: property.clone(),
                            expected: check.to_string(),
                            actual,
                        })
                    }
                }
            },
        };

        Ok((observation, verdict))
    }

    /// Locate, narrowing to the first node where the locator asks for it
    async fn resolve(&mut self, locator: &Locator, condition: &Condition) -> Result<Vec<NodeHandle>, DriverError> {
        let mut nodes = self.driver.locate(locator).await?;
        if locator.takes_first(condition) {
            nodes.truncate(1);
        }
        Ok(nodes)
    }

    /// click -> URL matches -> target visible; the first failing step fails the rule
    async fn evaluate_anchor(
        &mut self,
        click: &Locator,
        url_pattern: &TextPattern,
        target: &Locator,
    ) -> Result<(Observation, Verdict), DriverError> {
        let (mut observation, verdict) = self.poll_check(click, &Condition::Visible).await?;
        if verdict.is_err() {
            return Ok((observation, verdict));
        }

        let nodes = self.resolve(click, &Condition::Visible).await?;
        let node = match single(click, &nodes) {
            Ok(node) => node,
            Err(failure) => return Ok((observation, Err(failure))),
        };
        self.driver.click(node).await?;

        let deadline = Instant::now() + self.settings.locate_timeout;
        loop {
            let url = self.driver.current_url().await?;
            let matched = url_pattern.is_match(&url);
            observation.url = Some(url.clone());
            if matched {
                break;
            }
            if Instant::now() >= deadline {
                return Ok((
                    observation,
                    Err(FailureKind::UrlMismatch {
                        expected: url_pattern.to_string(),
                        actual: url,
                    }),
                ));
            }
            sleep(self.settings.poll_interval).await;
        }

        let (target_observation, verdict) = self.poll_check(target, &Condition::Visible).await?;
        observation.visible = target_observation.visible;
        observation.attempts += target_observation.attempts;
        Ok((observation, verdict))
    }

    async fn evaluate_hover(&mut self, target: &Locator) -> Result<(Observation, Verdict), DriverError> {
        let (observation, verdict) = self.poll_check(target, &Condition::Visible).await?;
        if verdict.is_err() {
            return Ok((observation, verdict));
        }

        let nodes = self.resolve(target, &Condition::Visible).await?;
        let node = match single(target, &nodes) {
            Ok(node) => node,
            Err(failure) => return Ok((observation, Err(failure))),
        };
        self.driver.hover(node).await?;

        let (mut after, verdict) = self.poll_check(target, &Condition::Visible).await?;
        after.attempts += observation.attempts;
        Ok((after, verdict))
    }
}

fn not_found(locator: &Locator) -> FailureKind {
    FailureKind::ElementNotFound {
        locator: locator.to_string(),
    }
}

/// Role matches may only be plural when the rule counts more than one
fn count_verdict(locator: &Locator, expected: usize, actual: usize) -> Verdict {
    let role = matches!(locator, Locator::Role { first: false, .. });
    if actual == expected {
        Ok(())
    } else if actual == 0 {
        Err(not_found(locator))
    } else if role && expected <= 1 {
        Err(FailureKind::AmbiguousMatch {
            locator: locator.to_string(),
            count: actual,
        })
    } else {
        Err(FailureKind::CountMismatch { expected, actual })
    }
}

/// Exactly one node, or the failure explaining why not
fn single(locator: &Locator, nodes: &[NodeHandle]) -> Result<NodeHandle, FailureKind> {
    match nodes {
        [] => Err(not_found(locator)),
        [node] => Ok(*node),
        _ => Err(FailureKind::AmbiguousMatch {
            locator: locator.to_string(),
            count: nodes.len(),
        }),
    }
}

/// Accumulates a route report while enforcing the state machine
struct RouteTracker {
    report: RouteReport,
}

impl RouteTracker {
    fn new(route: &RouteDescriptor) -> Self {
        Self {
            report: RouteReport {
                path: route.path.clone(),
                name: route.display_name().to_string(),
                state: RouteState::Pending,
                history: vec![RouteState::Pending],
                title: None,
                rules: Vec::new(),
                failure: None,
                failed_rule: None,
                runtime_errors: Vec::new(),
                navigation_attempts: 0,
                duration_ms: 0,
            },
        }
    }

    fn transition(&mut self, next: RouteState) {
        debug_assert!(
            self.report.state.can_transition_to(next),
            "invalid route transition {:?} -> {:?}",
            self.report.state,
            next
        );
        debug!("{}: {:?} -> {:?}", self.report.path, self.report.state, next);
        self.report.state = next;
        self.report.history.push(next);
    }

    fn fail(&mut self, failure: FailureKind, rule: Option<usize>) {
        self.report.failure = Some(failure);
        self.report.failed_rule = rule;
        self.transition(RouteState::Failed);
    }

    fn finish(mut self, start: Instant) -> RouteReport {
        self.report.duration_ms = start.elapsed().as_millis() as u64;
        self.report
    }
}
