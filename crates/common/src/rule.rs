//! Element rules: how to find an element and what must hold for it

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pattern::{NamePattern, TextPattern};

/// Strategy for locating elements on the rendered page.
///
/// Every strategy resolves to zero or more nodes in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Case-sensitive substring of the rendered text content.
    /// Resolves to the first match unless the condition is `Count`.
    Text {
        text: String,
    },

    /// Accessible role plus accessible name
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<NamePattern>,
        #[serde(default, skip_serializing_if = "is_false")]
        first: bool,
    },

    /// Attribute selector, optionally restricted to one tag
    Attribute {
        attribute: String,
        #[serde(default)]
        value: AttributeMatch,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tag: Option<String>,
        #[serde(default, skip_serializing_if = "is_false")]
        first: bool,
    },

    /// Raw CSS selector
    Css {
        selector: String,
        #[serde(default, skip_serializing_if = "is_false")]
        first: bool,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Locator {
    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text { text: text.into() }
    }

    pub fn role(role: impl Into<String>, name: NamePattern) -> Self {
        Locator::Role {
            role: role.into(),
            name: Some(name),
            first: false,
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
            first: false,
        }
    }

    pub fn attribute(attribute: impl Into<String>, value: AttributeMatch) -> Self {
        Locator::Attribute {
            attribute: attribute.into(),
            value,
            tag: None,
            first: false,
        }
    }

    /// Restrict the locator to its first match in document order
    pub fn first(mut self) -> Self {
        match &mut self {
            Locator::Role { first, .. }
            | Locator::Attribute { first, .. }
            | Locator::Css { first, .. } => *first = true,
            Locator::Text { .. } => {}
        }
        self
    }

    /// Whether this locator narrows to a single node for the given condition
    pub fn takes_first(&self, condition: &Condition) -> bool {
        match self {
            Locator::Text { .. } => !matches!(condition, Condition::Count { .. }),
            Locator::Role { first, .. }
            | Locator::Attribute { first, .. }
            | Locator::Css { first, .. } => *first,
        }
    }

    /// The CSS selector an attribute locator compiles to
    pub fn attribute_selector(&self) -> Option<String> {
        match self {
            Locator::Attribute {
                attribute,
                value,
                tag,
                ..
            } => {
                let tag = tag.as_deref().unwrap_or("");
                Some(match value {
                    AttributeMatch::Equals(v) => format!("{}[{}={}]", tag, attribute, quoted(v)),
                    AttributeMatch::Contains(v) => format!("{}[{}*={}]", tag, attribute, quoted(v)),
                    AttributeMatch::Present => format!("{}[{}]", tag, attribute),
                })
            }
            _ => None,
        }
    }
}

/// Quote a selector value the way the browser bridge does (`JSON.stringify`)
fn quoted(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text } => write!(f, "text={:?}", text),
            Locator::Role { role, name, first } => {
                write!(f, "role={}", role)?;
                if let Some(name) = name {
                    write!(f, "[name={}]", name)?;
                }
                if *first {
                    write!(f, " >> first")?;
                }
                Ok(())
            }
            Locator::Attribute { first, .. } => {
                write!(f, "{}", self.attribute_selector().unwrap_or_default())?;
                if *first {
                    write!(f, " >> first")?;
                }
                Ok(())
            }
            Locator::Css { selector, first } => {
                write!(f, "css={}", selector)?;
                if *first {
                    write!(f, " >> first")?;
                }
                Ok(())
            }
        }
    }
}

/// Attribute value predicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum AttributeMatch {
    Equals(String),
    Contains(String),
    #[default]
    Present,
}

impl AttributeMatch {
    pub fn matches(&self, actual: Option<&str>) -> bool {
        match (self, actual) {
            (AttributeMatch::Equals(v), Some(a)) => a == v,
            (AttributeMatch::Contains(v), Some(a)) => a.contains(v.as_str()),
            (AttributeMatch::Present, Some(_)) => true,
            (_, None) => false,
        }
    }
}

/// Expected computed style value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum StyleExpectation {
    Equals(String),
    NotEquals(String),
}

impl StyleExpectation {
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            StyleExpectation::Equals(v) => actual == v,
            StyleExpectation::NotEquals(v) => !actual.is_empty() && actual != v,
        }
    }
}

impl fmt::Display for StyleExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleExpectation::Equals(v) => write!(f, "== {:?}", v),
            StyleExpectation::NotEquals(v) => write!(f, "!= {:?}", v),
        }
    }
}

/// The single condition a `Check` rule asserts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum Condition {
    Visible,

    /// Exactly `count` matches
    Count {
        count: usize,
    },

    HasAttribute {
        name: String,
        value: String,
    },

    ComputedStyle {
        property: String,
        check: StyleExpectation,
    },
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Visible => write!(f, "visible"),
            Condition::Count { count } => write!(f, "count == {}", count),
            Condition::HasAttribute { name, value } => write!(f, "[{}={:?}]", name, value),
            Condition::ComputedStyle { property, check } => write!(f, "style {} {}", property, check),
        }
    }
}

/// One assertable condition about the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ElementRule {
    /// Locate, then check exactly one condition
    Check {
        locator: Locator,
        condition: Condition,
    },

    /// Click a same-page link, then verify the URL and the target anchor.
    /// The three sub-steps pass or fail as a unit.
    AnchorLink {
        click: Locator,
        url_pattern: TextPattern,
        target: Locator,
    },

    /// Hover the element; it must stay visible afterwards
    Hover {
        target: Locator,
    },
}

impl ElementRule {
    pub fn visible(locator: Locator) -> Self {
        ElementRule::Check {
            locator,
            condition: Condition::Visible,
        }
    }

    pub fn count(locator: Locator, count: usize) -> Self {
        ElementRule::Check {
            locator,
            condition: Condition::Count { count },
        }
    }

    pub fn has_attribute(locator: Locator, name: impl Into<String>, value: impl Into<String>) -> Self {
        ElementRule::Check {
            locator,
            condition: Condition::HasAttribute {
                name: name.into(),
                value: value.into(),
            },
        }
    }

    /// Locators referenced by this rule, in evaluation order
    pub fn locators(&self) -> Vec<&Locator> {
        match self {
            ElementRule::Check { locator, .. } => vec![locator],
            ElementRule::AnchorLink { click, target, .. } => vec![click, target],
            ElementRule::Hover { target } => vec![target],
        }
    }
}

impl fmt::Display for ElementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementRule::Check { locator, condition } => write!(f, "{} is {}", locator, condition),
            ElementRule::AnchorLink {
                click,
                url_pattern,
                target,
            } => write!(f, "click {} -> url {} -> {} visible", click, url_pattern, target),
            ElementRule::Hover { target } => write!(f, "hover {}", target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_check_rule() {
        let yaml = r#"
rule: check
locator:
  by: css
  selector: .volunteer-grid-item
condition:
  expect: count
  count: 6
"#;
        let rule: ElementRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule, ElementRule::count(Locator::css(".volunteer-grid-item"), 6));
    }

    #[test]
    fn test_parse_anchor_rule() {
        let yaml = r##"
rule: anchor_link
click:
  by: attribute
  attribute: href
  value: { op: equals, value: "#principles" }
  tag: a
url_pattern: "about-the-conference.*#principles"
target:
  by: css
  selector: "#principles"
"##;
        let rule: ElementRule = serde_yaml::from_str(yaml).unwrap();
        match rule {
            ElementRule::AnchorLink { click, url_pattern, target } => {
                assert_eq!(click.attribute_selector().unwrap(), r##"a[href="#principles"]"##);
                assert!(url_pattern.is_match("http://localhost/about-the-conference/#principles"));
                assert_eq!(target, Locator::css("#principles"));
            }
            other => panic!("unexpected rule: {other:?}"),
        }
    }

    #[test]
    fn test_parse_style_condition() {
        let yaml = "expect: computed_style\nproperty: background-image\ncheck: { op: not_equals, value: none }";
        let condition: Condition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            condition,
            Condition::ComputedStyle {
                property: "background-image".to_string(),
                check: StyleExpectation::NotEquals("none".to_string()),
            }
        );
    }

    #[test_case(AttributeMatch::Equals("0".into()), Some("0"), true ; "equals hit")]
    #[test_case(AttributeMatch::Equals("0".into()), Some("-1"), false ; "equals miss")]
    #[test_case(AttributeMatch::Contains("attendees".into()), Some("Hundreds of attendees"), true ; "contains hit")]
    #[test_case(AttributeMatch::Present, Some(""), true ; "present empty value")]
    #[test_case(AttributeMatch::Present, None, false ; "absent")]
    fn test_attribute_match(m: AttributeMatch, actual: Option<&str>, expected: bool) {
        assert_eq!(m.matches(actual), expected);
    }

    #[test]
    fn test_style_not_equals_rejects_none_and_empty() {
        let check = StyleExpectation::NotEquals("none".to_string());
        assert!(check.matches("url(\"/images/banner.jpg\")"));
        assert!(!check.matches("none"));
        assert!(!check.matches(""));
    }

    #[test]
    fn test_text_locator_takes_first_unless_counting() {
        let loc = Locator::text("Agenda");
        assert!(loc.takes_first(&Condition::Visible));
        assert!(!loc.takes_first(&Condition::Count { count: 2 }));

        let css = Locator::css(".volunteer-grid-item img");
        assert!(!css.takes_first(&Condition::Visible));
        assert!(css.first().takes_first(&Condition::Visible));
    }

    #[test]
    fn test_attribute_selector_forms() {
        let present = Locator::Attribute {
            attribute: "tabindex".into(),
            value: AttributeMatch::Present,
            tag: Some("a".into()),
            first: false,
        };
        assert_eq!(present.attribute_selector().unwrap(), "a[tabindex]");

        let contains = Locator::Attribute {
            attribute: "alt".into(),
            value: AttributeMatch::Contains("attendees".into()),
            tag: Some("img".into()),
            first: true,
        };
        assert_eq!(contains.attribute_selector().unwrap(), r#"img[alt*="attendees"]"#);
    }

    #[test]
    fn test_attribute_selector_quotes_like_json() {
        let locator = Locator::Attribute {
            attribute: "alt".into(),
            value: AttributeMatch::Equals("Café \"crew\"".into()),
            tag: None,
            first: false,
        };
        assert_eq!(locator.attribute_selector().unwrap(), r#"[alt="Café \"crew\""]"#);

        let control = Locator::attribute("title", AttributeMatch::Contains("a\u{7f}b".into()));
        assert_eq!(control.attribute_selector().unwrap(), "[title*=\"a\u{7f}b\"]");
    }
}
