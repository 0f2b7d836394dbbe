//! Content-addressed artifact references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A file reference pinned to the digest of its content.
///
/// Equality covers both fields; ordering is by `uri`, then `hash`, which is
/// the order the canonical encoding uses.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the artifact, relative to the step's working root
    pub uri: String,

    /// Hex-encoded digest of the (optionally line-ending normalized) content
    pub hash: String,
}

impl Artifact {
    pub fn new(uri: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            hash: hash.into(),
        }
    }

    /// Same path, content ignored.
    pub fn same_uri(&self, other: &Artifact) -> bool {
        self.uri == other.uri
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Hashes come from untrusted documents and may not be ASCII.
        let short = self.hash.get(..12).unwrap_or(&self.hash);
        write!(f, "{}@{}", self.uri, short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_requires_both_fields() {
        let a = Artifact::new("lib/app.jar", "aa");
        assert_eq!(a, Artifact::new("lib/app.jar", "aa"));
        assert_ne!(a, Artifact::new("lib/app.jar", "bb"));
        assert_ne!(a, Artifact::new("lib/other.jar", "aa"));
        assert!(a.same_uri(&Artifact::new("lib/app.jar", "bb")));
    }

    #[test]
    fn test_display_shortens_hash() {
        let a = Artifact::new("app.jar", "0123456789abcdef");
        assert_eq!(a.to_string(), "app.jar@0123456789ab");
        assert_eq!(Artifact::new("app.jar", "aa").to_string(), "app.jar@aa");
    }

    #[test]
    fn test_display_non_ascii_hash() {
        let a = Artifact::new("x", "aaaaaaaaaaa\u{e9}0000");
        assert_eq!(a.to_string(), "x@aaaaaaaaaaa\u{e9}0000");
    }

    #[test]
    fn test_ordering_by_uri_first() {
        let mut artifacts = vec![
            Artifact::new("b.txt", "01"),
            Artifact::new("a.txt", "ff"),
            Artifact::new("a.txt", "00"),
        ];
        artifacts.sort();
        let order: Vec<_> = artifacts.iter().map(|a| (a.uri.as_str(), a.hash.as_str())).collect();
        assert_eq!(order, vec![("a.txt", "00"), ("a.txt", "ff"), ("b.txt", "01")]);
    }

    #[test]
    fn test_display_shortens_hash_20_chars() {
        let a = Artifact::new("x", "0123456789abcdef0123");
        assert_eq!(a.to_string(), "x@0123456789ab");
    }
}
