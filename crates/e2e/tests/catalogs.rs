//! The shipped catalogs under `specs/` load and run against a scripted site

use std::path::PathBuf;
use std::time::Duration;

use pagecheck_common::{AttributeMatch, Condition, ElementRule, LoadMilestone, Locator, RouteCatalog};
use pagecheck_e2e::testing::{MemoryDriver, MemoryElement, MemoryPage, MemorySite};
use pagecheck_e2e::{AssertionRunner, FailureKind, RunnerSettings};

fn specs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../specs")
}

fn load(name: &str) -> RouteCatalog {
    RouteCatalog::from_file(&specs_dir().join(format!("{}.yaml", name))).unwrap()
}

fn settings() -> RunnerSettings {
    RunnerSettings {
        locate_timeout: Duration::from_millis(30),
        poll_interval: Duration::from_millis(5),
        navigation_attempts: 2,
        navigation_backoff: Duration::from_millis(1),
    }
}

#[test]
fn all_catalogs_load_in_file_order() {
    let catalogs = RouteCatalog::load_all(&specs_dir()).unwrap();
    let names: Vec<&str> = catalogs.iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["homepage", "navigation", "organisers", "sponsor"]);
}

#[test]
fn navigation_sweeps_runtime_errors() {
    let catalog = load("navigation");
    let swept: Vec<&str> = catalog
        .routes()
        .iter()
        .filter(|r| r.check_runtime_errors)
        .map(|r| r.path.as_str())
        .collect();
    assert_eq!(swept, vec!["/", "/about-the-conference", "/agenda", "/talks", "/contact"]);
}

#[test]
fn sponsor_tiers_keep_site_spelling() {
    let catalog = load("sponsor");
    let tiers = catalog.route("/sponsor/sponsorship-tiers").unwrap();
    assert_eq!(tiers.milestone, LoadMilestone::NetworkIdle);

    let silver = Locator::Attribute {
        attribute: "href".to_string(),
        value: AttributeMatch::Equals("#sillver-sponsor".to_string()),
        tag: Some("a".to_string()),
        first: false,
    };
    assert!(tiers.required_elements.contains(&ElementRule::visible(silver)));
    assert!(tiers
        .required_elements
        .iter()
        .any(|r| matches!(r, ElementRule::AnchorLink { url_pattern, .. } if url_pattern.is_match("http://x/sponsor/sponsorship-tiers/#platinum-sponsor"))));
}

#[test]
fn organiser_grid_counts_six() {
    let catalog = load("organisers");
    let route = catalog.route("/about-the-conference").unwrap();
    assert!(route.required_elements.iter().any(|r| matches!(
        r,
        ElementRule::Check { condition: Condition::Count { count: 6 }, .. }
    )));
    assert!(matches!(route.required_elements.last(), Some(ElementRule::Hover { .. })));
}

fn organiser_page(items: usize) -> MemoryPage {
    let people = [
        ("Jessica White", "jessica-white"),
        ("Moreton Brockley", "moreton-brockley"),
        ("Rachel Watson", "rachel-watson"),
        ("Ash Patel", "ash-patel"),
        ("Chris Hall", "chris-hall"),
        ("Dee Morgan", "dee-morgan"),
    ];
    let mut page = MemoryPage::new("About DDD East Midlands")
        .element(MemoryElement::new("section").selector("#organisers"))
        .element(MemoryElement::new("div").selector(".volunteer-grid"));
    for (name, slug) in people.iter().take(items) {
        let first_name = name.split(' ').next().unwrap_or_default();
        page = page
            .element(MemoryElement::new("div").selector(".volunteer-grid-item"))
            .element(
                MemoryElement::new("a")
                    .attr("href", &format!("../organisers/{}", slug))
                    .attr("tabindex", "0")
                    .attr("title", &format!("Link to Information About {}", first_name)),
            )
            .element(
                MemoryElement::new("img")
                    .selector(".volunteer-grid-item img")
                    .attr("alt", &format!("Picture of {}", name)),
            );
    }
    page
}

#[tokio::test]
async fn organisers_catalog_passes_on_conforming_page() {
    let site = MemorySite::new().page("/about-the-conference", organiser_page(6));
    let mut runner = AssertionRunner::new(MemoryDriver::new(site), settings());

    let report = runner.run(&load("organisers")).await;

    let route = &report.routes[0];
    assert!(route.passed(), "unexpected failure: {:?}", route.failure);
    assert_eq!(route.rules.len(), 10);
}

#[tokio::test]
async fn organisers_catalog_reports_missing_organiser() {
    let site = MemorySite::new().page("/about-the-conference", organiser_page(5));
    let mut runner = AssertionRunner::new(MemoryDriver::new(site), settings());

    let report = runner.run(&load("organisers")).await;

    let route = &report.routes[0];
    assert_eq!(route.failed_rule, Some(2));
    assert_eq!(route.failure, Some(FailureKind::CountMismatch { expected: 6, actual: 5 }));
}
