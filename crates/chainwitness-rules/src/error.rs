//! Rule definition errors.

use thiserror::Error;

/// A rule that cannot be evaluated at all.
///
/// Ordinary negative outcomes (wrong hash, unexplained artifact) are not
/// errors; they come back as `false` from the rule.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid path prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },
}
