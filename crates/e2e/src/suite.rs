//! Parallel execution of catalogs, one runner and one session per catalog

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info};

use pagecheck_common::RouteCatalog;

use crate::driver::DriverFactory;
use crate::error::{E2eError, E2eResult};
use crate::report::{FailureKind, Report, RouteReport, RouteState, SuiteReport};
use crate::runner::{AssertionRunner, RunnerSettings};

/// Runs catalogs on up to `workers` independent runners.
///
/// Routes inside a catalog run sequentially on that runner's session;
/// runners share nothing but the factory.
pub struct Suite<F: DriverFactory> {
    factory: Arc<F>,
    settings: RunnerSettings,
    workers: usize,
    base_url: String,
}

impl<F: DriverFactory> Suite<F> {
    pub fn new(factory: F, settings: RunnerSettings, workers: usize) -> Self {
        Self {
            factory: Arc::new(factory),
            settings,
            workers: workers.max(1),
            base_url: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run every catalog; reports come back in submission order
    pub async fn run(&self, catalogs: Vec<RouteCatalog>) -> E2eResult<SuiteReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = catalogs.len();

        info!("Running {} catalog(s) on {} worker(s)...", total, self.workers);

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, catalog) in catalogs.into_iter().enumerate() {
            let factory = Arc::clone(&self.factory);
            let settings = self.settings.clone();
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| E2eError::Worker(e.to_string()))?;
                let report = run_catalog(factory.as_ref(), settings, &catalog).await;
                Ok::<_, E2eError>((index, report))
            });
        }

        let mut slots: Vec<Option<Report>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (index, report) = joined.map_err(|e| E2eError::Worker(e.to_string()))??;
            slots[index] = Some(report);
        }

        let reports: Vec<Report> = slots.into_iter().flatten().collect();
        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = SuiteReport::from_reports(started_at, self.base_url.clone(), duration_ms, reports);

        info!(
            "Suite Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );

        Ok(suite)
    }
}

/// Open a session, run the catalog on it, and release the session.
///
/// A session that cannot be opened fails every route of the catalog.
pub async fn run_catalog<F: DriverFactory>(factory: &F, settings: RunnerSettings, catalog: &RouteCatalog) -> Report {
    match factory.open().await {
        Ok(driver) => AssertionRunner::new(driver, settings).run_to_completion(catalog).await,
        Err(e) => {
            error!("Could not open browser session for '{}': {}", catalog.name(), e);
            let mut report = Report::new(catalog.name());
            report.routes = catalog
                .routes()
                .iter()
                .map(|route| RouteReport {
                    path: route.path.clone(),
                    name: route.display_name().to_string(),
                    state: RouteState::Failed,
                    history: vec![RouteState::Pending, RouteState::Navigating, RouteState::Failed],
                    title: None,
                    rules: Vec::new(),
                    failure: Some(FailureKind::Driver { message: e.to_string() }),
                    failed_rule: None,
                    runtime_errors: Vec::new(),
                    navigation_attempts: 0,
                    duration_ms: 0,
                })
                .collect();
            report
        }
    }
}
