//! Text patterns used for titles, URLs and accessible names

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// A compiled regular expression that remembers its source.
///
/// Deserializes from either a bare string or `{ pattern, case_insensitive }`.
/// Always serializes to the map form so the source survives a round trip
/// through the browser bridge.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct TextPattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Plain(String),
    Detailed {
        pattern: String,
        #[serde(default)]
        case_insensitive: bool,
    },
}

impl TextPattern {
    /// Compile a case-sensitive pattern
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Self::build(pattern, false)
    }

    /// Compile a case-insensitive pattern
    pub fn case_insensitive(pattern: &str) -> Result<Self, Error> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self, Error> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            case_insensitive,
            regex,
        })
    }

    /// Unanchored search, the same semantics as a JS `RegExp.test`
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl TryFrom<RawPattern> for TextPattern {
    type Error = Error;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        match raw {
            RawPattern::Plain(pattern) => Self::build(&pattern, false),
            RawPattern::Detailed {
                pattern,
                case_insensitive,
            } => Self::build(&pattern, case_insensitive),
        }
    }
}

impl From<TextPattern> for RawPattern {
    fn from(p: TextPattern) -> Self {
        RawPattern::Detailed {
            pattern: p.source,
            case_insensitive: p.case_insensitive,
        }
    }
}

impl fmt::Debug for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)?;
        if self.case_insensitive {
            write!(f, "i")?;
        }
        Ok(())
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl Eq for TextPattern {}

/// Match rule for an accessible name.
///
/// A bare string is an exact, case-sensitive comparison; a map is a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamePattern {
    Exact(String),
    Pattern(TextPattern),
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(expected) => expected == name,
            NamePattern::Pattern(p) => p.is_match(name),
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamePattern::Exact(s) => write!(f, "{:?}", s),
            NamePattern::Pattern(p) => write!(f, "{}", p),
        }
    }
}

/// Expected document title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitlePattern {
    Exact(String),
    Pattern(TextPattern),
}

impl TitlePattern {
    pub fn matches(&self, title: &str) -> bool {
        match self {
            TitlePattern::Exact(expected) => expected == title,
            TitlePattern::Pattern(p) => p.is_match(title),
        }
    }
}

impl fmt::Display for TitlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitlePattern::Exact(s) => write!(f, "{:?}", s),
            TitlePattern::Pattern(p) => write!(f, "{}", p),
        }
    }
}
