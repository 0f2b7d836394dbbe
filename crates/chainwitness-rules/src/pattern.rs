//! Artifact path patterns.
//!
//! Globs follow path semantics: `*` and `?` stay within one path segment,
//! `**` spans any number of segments.

use chainwitness_model::Rule;
use globset::{GlobBuilder, GlobMatcher};

use crate::error::RuleError;

/// A compiled artifact path pattern.
#[derive(Debug, Clone)]
pub enum PathPattern {
    Glob(GlobMatcher),
    /// Matches one uri verbatim
    Exact(String),
}

impl PathPattern {
    pub fn glob(pattern: &str) -> Result<Self, RuleError> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| RuleError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self::Glob(glob.compile_matcher()))
    }

    pub fn exact(uri: &str) -> Self {
        Self::Exact(uri.to_string())
    }

    /// The pattern a rule filters with: exact for REQUIRE, glob otherwise.
    pub fn for_rule(rule: &Rule) -> Result<Self, RuleError> {
        match rule {
            Rule::Require(p) => Ok(Self::exact(&p.pattern)),
            other => Self::glob(other.pattern()),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        match self {
            Self::Glob(matcher) => matcher.is_match(path),
            Self::Exact(uri) => uri == path,
        }
    }
}

/// Normalize a MATCH path prefix so that it always names a directory.
pub(crate) fn normalize_prefix(prefix: Option<&str>) -> String {
    match prefix {
        None | Some("") => String::new(),
        Some(p) if p.ends_with('/') => p.to_string(),
        Some(p) => format!("{p}/"),
    }
}

fn check_prefix(prefix: Option<&str>) -> Result<(), RuleError> {
    if let Some(p) = prefix {
        if p.starts_with('/') {
            return Err(RuleError::InvalidPrefix {
                prefix: p.to_string(),
                reason: "must be relative",
            });
        }
        if p.split('/').any(|segment| segment == "..") {
            return Err(RuleError::InvalidPrefix {
                prefix: p.to_string(),
                reason: "must not contain '..'",
            });
        }
    }
    Ok(())
}

/// Check that a rule's pattern and prefixes are usable.
pub fn validate_rule(rule: &Rule) -> Result<(), RuleError> {
    PathPattern::for_rule(rule)?;
    if let Rule::Match(m) = rule {
        check_prefix(m.source_path_prefix.as_deref())?;
        check_prefix(m.destination_path_prefix.as_deref())?;
    }
    Ok(())
}
