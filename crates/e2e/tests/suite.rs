//! Parallel suite execution over in-memory sessions

use std::time::Duration;

use pagecheck_common::{ElementRule, Locator, RouteCatalog, RouteDescriptor};
use pagecheck_e2e::testing::{MemoryElement, MemoryFactory, MemoryPage, MemorySite};
use pagecheck_e2e::{FailureKind, RouteState, RunnerSettings, Suite};

fn settings() -> RunnerSettings {
    RunnerSettings {
        locate_timeout: Duration::from_millis(40),
        poll_interval: Duration::from_millis(5),
        navigation_attempts: 2,
        navigation_backoff: Duration::from_millis(1),
    }
}

fn site() -> MemorySite {
    let mut site = MemorySite::new();
    for (path, heading) in [
        ("/", "Developer! Developer! Developer! East Midlands"),
        ("/agenda", "Agenda"),
        ("/talks", "Talks"),
        ("/contact", "Contact"),
        ("/sponsor", "Sponsorship Tiers"),
    ] {
        site = site.page(path, MemoryPage::new(heading).element(MemoryElement::heading(heading).selector("h1")));
    }
    site
}

fn catalog(name: &str, paths: &[&str]) -> RouteCatalog {
    let mut catalog = RouteCatalog::new(name);
    for path in paths {
        catalog
            .add_route(RouteDescriptor::new(*path).with_rule(ElementRule::visible(Locator::css("h1"))))
            .unwrap();
    }
    catalog
}

fn catalogs() -> Vec<RouteCatalog> {
    vec![
        catalog("homepage", &["/"]),
        catalog("navigation", &["/agenda", "/talks", "/contact"]),
        catalog("sponsor", &["/sponsor"]),
        catalog("broken", &["/missing", "/agenda"]),
    ]
}

#[tokio::test]
async fn reports_follow_submission_order() {
    let factory = MemoryFactory::new(site());
    let suite = Suite::new(factory, settings(), 3).with_base_url("http://site.test");

    let report = suite.run(catalogs()).await.unwrap();

    let names: Vec<&str> = report.catalogs.iter().map(|c| c.catalog.as_str()).collect();
    assert_eq!(names, vec!["homepage", "navigation", "sponsor", "broken"]);
    assert_eq!(report.catalogs[1].route_paths(), vec!["/agenda", "/talks", "/contact"]);
    assert_eq!(report.base_url, "http://site.test");
}

#[tokio::test]
async fn totals_and_exit_code() {
    let suite = Suite::new(MemoryFactory::new(site()), settings(), 2);

    let report = suite.run(catalogs()).await.unwrap();

    assert_eq!(report.total, 7);
    assert_eq!(report.passed, 6);
    assert_eq!(report.failed, 1);
    assert!(!report.success());
    assert_eq!(report.exit_code(), 1);

    let broken = &report.catalogs[3];
    assert_eq!(broken.route("/missing").unwrap().state, RouteState::Failed);
    assert!(broken.route("/agenda").unwrap().passed());
}

#[tokio::test]
async fn all_passing_suite_exits_zero() {
    let suite = Suite::new(MemoryFactory::new(site()), settings(), 4);
    let report = suite.run(catalogs().into_iter().take(3).collect()).await.unwrap();
    assert!(report.success());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn each_runner_owns_one_session() {
    let factory = MemoryFactory::new(site());
    let suite = Suite::new(factory.clone(), settings(), 4);

    suite.run(catalogs()).await.unwrap();

    let logs = factory.logs();
    assert_eq!(logs.len(), 4, "one session per catalog");
    for log in logs {
        let log = log.lock();
        assert!(log.closed);
        assert_eq!(log.max_in_flight, 1, "a session never navigates concurrently");
    }
}

#[tokio::test]
async fn results_identical_across_worker_counts() {
    let serial = Suite::new(MemoryFactory::new(site()), settings(), 1)
        .run(catalogs())
        .await
        .unwrap();
    let parallel = Suite::new(MemoryFactory::new(site()), settings(), 4)
        .run(catalogs())
        .await
        .unwrap();

    let outcome = |r: &pagecheck_e2e::SuiteReport| -> Vec<(String, bool)> {
        r.catalogs
            .iter()
            .flat_map(|c| c.routes.iter().map(|route| (route.path.clone(), route.passed())))
            .collect()
    };
    assert_eq!(outcome(&serial), outcome(&parallel));
}

#[tokio::test]
async fn unopenable_session_fails_its_routes() {
    let suite = Suite::new(MemoryFactory::failing(), settings(), 2);

    let report = suite.run(vec![catalog("navigation", &["/agenda", "/talks"])]).await.unwrap();

    assert_eq!(report.failed, 2);
    let routes = &report.catalogs[0].routes;
    assert_eq!(routes.len(), 2);
    assert!(routes
        .iter()
        .all(|r| matches!(r.failure, Some(FailureKind::Driver { .. }))));
}

#[tokio::test]
async fn results_file_written() {
    let dir = tempfile::tempdir().unwrap();
    let report = Suite::new(MemoryFactory::new(site()), settings(), 1)
        .run(vec![catalog("homepage", &["/"])])
        .await
        .unwrap();

    let path = report.write_json(dir.path()).unwrap();

    assert_eq!(path.file_name().unwrap(), "pagecheck-results.json");
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["catalogs"][0]["routes"][0]["state"], "passed");
}
