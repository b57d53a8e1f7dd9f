//! Route catalogs and the YAML files they are declared in

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::route::RouteDescriptor;

/// Ordered, duplicate-free collection of routes.
///
/// Routes come back in insertion order so reports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteCatalog {
    name: String,
    description: String,
    tags: Vec<String>,
    routes: Vec<RouteDescriptor>,
    #[serde(skip)]
    paths: HashSet<String>,
}

/// On-disk form of a catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    name: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    tags: Vec<String>,

    routes: Vec<RouteDescriptor>,
}

impl RouteCatalog {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Append a route, rejecting paths already present
    pub fn add_route(&mut self, route: RouteDescriptor) -> Result<()> {
        route.validate()?;

        if !self.paths.insert(route.path.clone()) {
            return Err(Error::DuplicatePath {
                catalog: self.name.clone(),
                path: route.path,
            });
        }

        self.routes.push(route);
        Ok(())
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn route(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.path == path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Total number of rules across all routes
    pub fn rule_count(&self) -> usize {
        self.routes.iter().map(|r| r.required_elements.len()).sum()
    }

    /// Keep only the routes whose path satisfies the predicate
    pub fn retain_routes<F>(&mut self, mut keep: F)
    where
        F: FnMut(&RouteDescriptor) -> bool,
    {
        self.routes.retain(|r| keep(r));
        self.paths = self.routes.iter().map(|r| r.path.clone()).collect();
    }

    /// Parse a catalog from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;
        Self::from_file_contents(file)
    }

    /// Parse a catalog from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file: CatalogFile = serde_yaml::from_str(&content).map_err(|source| Error::CatalogParse {
            file: path.to_path_buf(),
            source,
        })?;
        Self::from_file_contents(file)
    }

    fn from_file_contents(file: CatalogFile) -> Result<Self> {
        let mut catalog = RouteCatalog::new(file.name)
            .with_description(file.description)
            .with_tags(file.tags);

        for route in file.routes {
            catalog.add_route(route)?;
        }

        debug!("Loaded catalog '{}' with {} route(s)", catalog.name, catalog.len());
        Ok(catalog)
    }

    /// Load all catalogs from a directory, ordered by file path
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if is_yaml && entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();

        files.iter().map(|path| Self::from_file(path)).collect()
    }

    /// Load catalogs from a mix of files and directories
    pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Self>> {
        let mut catalogs = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                catalogs.extend(Self::load_all(path)?);
            } else {
                catalogs.push(Self::from_file(path)?);
            }
        }
        Ok(catalogs)
    }

    /// Filter catalogs by tag
    pub fn filter_by_tag(catalogs: Vec<Self>, tag: &str) -> Vec<Self> {
        catalogs.into_iter().filter(|c| c.has_tag(tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{TextPattern, TitlePattern};

    const NAVIGATION: &str = r#"
name: navigation
description: Top-level pages load
tags: [smoke]
routes:
  - path: /about-the-conference
    title:
      pattern: About DDD East Midlands
    required_elements:
      - rule: check
        locator: { by: role, role: heading, name: Contents }
        condition: { expect: visible }
  - path: /agenda
    title: { pattern: Agenda }
"#;

    #[test]
    fn test_routes_keep_insertion_order() {
        let mut catalog = RouteCatalog::new("order");
        for path in ["/", "/about-the-conference", "/agenda", "/talks", "/contact"] {
            catalog.add_route(RouteDescriptor::new(path)).unwrap();
        }
        let paths: Vec<_> = catalog.routes().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/about-the-conference", "/agenda", "/talks", "/contact"]);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let mut catalog = RouteCatalog::new("dupes");
        catalog.add_route(RouteDescriptor::new("/agenda")).unwrap();
        let err = catalog.add_route(RouteDescriptor::new("/agenda")).unwrap_err();
        assert!(matches!(err, Error::DuplicatePath { ref path, .. } if path == "/agenda"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_parse_catalog_yaml() {
        let catalog = RouteCatalog::from_yaml(NAVIGATION).unwrap();
        assert_eq!(catalog.name(), "navigation");
        assert_eq!(catalog.description(), "Top-level pages load");
        assert!(catalog.has_tag("smoke"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.rule_count(), 1);

        let about = catalog.route("/about-the-conference").unwrap();
        assert_eq!(
            about.title,
            Some(TitlePattern::Pattern(TextPattern::new("About DDD East Midlands").unwrap()))
        );
    }

    #[test]
    fn test_duplicate_path_in_yaml_is_fatal() {
        let yaml = "name: broken\nroutes:\n  - path: /talks\n  - path: /talks\n";
        let err = RouteCatalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::DuplicatePath { .. }));
    }

    #[test]
    fn test_invalid_regex_in_yaml_is_fatal() {
        let yaml = "name: broken\nroutes:\n  - path: /talks\n    title: { pattern: \"(Talks\" }\n";
        assert!(RouteCatalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_sorted_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "name: second\nroutes: []\n").unwrap();
        std::fs::write(dir.path().join("a.yml"), "name: first\nroutes: []\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalogs = RouteCatalog::load_all(dir.path()).unwrap();
        let names: Vec<_> = catalogs.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_load_all_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RouteCatalog::load_all(&dir.path().join("specs")).unwrap_err();
        assert!(matches!(err, Error::Walk(_)));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "name: [unterminated").unwrap();

        let err = RouteCatalog::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_retain_routes_updates_duplicate_index() {
        let mut catalog = RouteCatalog::from_yaml(NAVIGATION).unwrap();
        catalog.retain_routes(|r| r.path == "/agenda");
        assert_eq!(catalog.len(), 1);
        catalog.add_route(RouteDescriptor::new("/about-the-conference")).unwrap();
    }
}
