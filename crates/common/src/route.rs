//! Route descriptors

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pattern::TitlePattern;
use crate::rule::{Condition, ElementRule, Locator};

/// Page lifecycle point a navigation waits for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMilestone {
    #[default]
    DomContentLoaded,
    Load,
    NetworkIdle,
}

impl LoadMilestone {
    /// Playwright `waitUntil` value
    pub fn as_wait_until(&self) -> &'static str {
        match self {
            LoadMilestone::DomContentLoaded => "domcontentloaded",
            LoadMilestone::Load => "load",
            LoadMilestone::NetworkIdle => "networkidle",
        }
    }
}

/// A navigable path plus everything that must hold once it has loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// Path relative to the base URL, starting with '/'
    pub path: String,

    /// Human-readable label for reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Expected document title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<TitlePattern>,

    #[serde(default)]
    pub milestone: LoadMilestone,

    /// Fail the route if the page raised uncaught errors
    #[serde(default)]
    pub check_runtime_errors: bool,

    /// Rules evaluated in declared order
    #[serde(default)]
    pub required_elements: Vec<ElementRule>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            title: None,
            milestone: LoadMilestone::default(),
            check_runtime_errors: false,
            required_elements: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: TitlePattern) -> Self {
        self.title = Some(title);
        self
    }

    pub fn with_rule(mut self, rule: ElementRule) -> Self {
        self.required_elements.push(rule);
        self
    }

    pub fn with_milestone(mut self, milestone: LoadMilestone) -> Self {
        self.milestone = milestone;
        self
    }

    pub fn checking_runtime_errors(mut self) -> Self {
        self.check_runtime_errors = true;
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }

    /// Check the invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(Error::InvalidPath(self.path.clone()));
        }

        for (index, rule) in self.required_elements.iter().enumerate() {
            for locator in rule.locators() {
                if let Locator::Css { selector, .. } = locator {
                    if selector.trim().is_empty() {
                        return Err(self.invalid_rule(index, "empty CSS selector"));
                    }
                }
                if let Locator::Text { text } = locator {
                    if text.is_empty() {
                        return Err(self.invalid_rule(index, "empty text locator"));
                    }
                }
            }

            if let ElementRule::Check {
                condition: Condition::HasAttribute { name, .. },
                ..
            } = rule
            {
                if name.is_empty() {
                    return Err(self.invalid_rule(index, "attribute name is empty"));
                }
            }
        }

        Ok(())
    }

    fn invalid_rule(&self, index: usize, reason: &str) -> Error {
        Error::InvalidRule {
            path: self.path.clone(),
            index,
            reason: reason.to_string(),
        }
    }
}
