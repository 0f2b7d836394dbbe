//! Artifact rules attached to layout steps.
//!
//! A rule list explains a step's materials or products. The set of rule
//! kinds is closed, so rules are a tagged enum keyed by `ruleType` on the
//! wire.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a [`Rule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "MATCH")]
    Match,
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "MODIFY")]
    Modify,
    #[serde(rename = "CREATEORMODIFY")]
    CreateOrModify,
    #[serde(rename = "ALLOW")]
    Allow,
    #[serde(rename = "DISALLOW")]
    Disallow,
    #[serde(rename = "REQUIRE")]
    Require,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Match => "MATCH",
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
            Self::Modify => "MODIFY",
            Self::CreateOrModify => "CREATEORMODIFY",
            Self::Allow => "ALLOW",
            Self::Disallow => "DISALLOW",
            Self::Require => "REQUIRE",
        };
        f.write_str(name)
    }
}

/// Rule payload carrying only a path pattern.
///
/// For REQUIRE the pattern is an exact artifact uri; every other kind
/// treats it as a glob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    pub pattern: String,
}

/// Which side of the destination step a MATCH rule compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DestinationType {
    Materials,
    Products,
}

/// MATCH: artifacts under `source_path_prefix` matching `pattern` must
/// appear with identical hashes under `destination_path_prefix` in the
/// destination step's materials or products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRule {
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path_prefix: Option<String>,

    pub destination_type: DestinationType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_path_prefix: Option<String>,

    pub destination_segment_name: String,

    pub destination_step_name: String,
}

/// An artifact rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ruleType")]
pub enum Rule {
    #[serde(rename = "MATCH")]
    Match(MatchRule),
    #[serde(rename = "CREATE")]
    Create(PatternRule),
    #[serde(rename = "DELETE")]
    Delete(PatternRule),
    #[serde(rename = "MODIFY")]
    Modify(PatternRule),
    #[serde(rename = "CREATEORMODIFY")]
    CreateOrModify(PatternRule),
    #[serde(rename = "ALLOW")]
    Allow(PatternRule),
    #[serde(rename = "DISALLOW")]
    Disallow(PatternRule),
    #[serde(rename = "REQUIRE")]
    Require(PatternRule),
}

impl Rule {
    pub fn create(pattern: impl Into<String>) -> Self {
        Self::Create(PatternRule { pattern: pattern.into() })
    }

    pub fn delete(pattern: impl Into<String>) -> Self {
        Self::Delete(PatternRule { pattern: pattern.into() })
    }

    pub fn modify(pattern: impl Into<String>) -> Self {
        Self::Modify(PatternRule { pattern: pattern.into() })
    }

    pub fn create_or_modify(pattern: impl Into<String>) -> Self {
        Self::CreateOrModify(PatternRule { pattern: pattern.into() })
    }

    pub fn allow(pattern: impl Into<String>) -> Self {
        Self::Allow(PatternRule { pattern: pattern.into() })
    }

    pub fn disallow(pattern: impl Into<String>) -> Self {
        Self::Disallow(PatternRule { pattern: pattern.into() })
    }

    pub fn require(uri: impl Into<String>) -> Self {
        Self::Require(PatternRule { pattern: uri.into() })
    }

    /// MATCH without path prefixes.
    pub fn match_in(
        pattern: impl Into<String>,
        destination_type: DestinationType,
        segment: impl Into<String>,
        step: impl Into<String>,
    ) -> Self {
        Self::Match(MatchRule {
            pattern: pattern.into(),
            source_path_prefix: None,
            destination_type,
            destination_path_prefix: None,
            destination_segment_name: segment.into(),
            destination_step_name: step.into(),
        })
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            Self::Match(_) => RuleType::Match,
            Self::Create(_) => RuleType::Create,
            Self::Delete(_) => RuleType::Delete,
            Self::Modify(_) => RuleType::Modify,
            Self::CreateOrModify(_) => RuleType::CreateOrModify,
            Self::Allow(_) => RuleType::Allow,
            Self::Disallow(_) => RuleType::Disallow,
            Self::Require(_) => RuleType::Require,
        }
    }

    pub fn pattern(&self) -> &str {
        match self {
            Self::Match(m) => &m.pattern,
            Self::Create(p)
            | Self::Delete(p)
            | Self::Modify(p)
            | Self::CreateOrModify(p)
            | Self::Allow(p)
            | Self::Disallow(p)
            | Self::Require(p) => &p.pattern,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match(m) => write!(
                f,
                "MATCH {} WITH {:?} FROM {}/{}",
                m.pattern, m.destination_type, m.destination_segment_name, m.destination_step_name
            ),
            other => write!(f, "{} {}", other.rule_type(), other.pattern()),
        }
    }
}
