//! Canonical encoding of signed documents.
//!
//! The canonical form is the exact byte string that gets signed, so every
//! implementation has to reproduce it byte for byte:
//! - object keys sorted at every level (RFC 8785 / JCS)
//! - absent optional fields omitted, never emitted as `null`
//! - unordered collections sorted first: link materials and products by
//!   uri, layout segments by name, each segment's steps by name, keys by
//!   key id, key id lists lexicographically
//!
//! Rule lists keep their declared order because evaluation order is part of
//! their meaning. Sorting happens on a private copy; the caller's document
//! is never touched.

use serde::Serialize;

use crate::error::CanonicalError;
use crate::layout::Layout;
use crate::link::Link;

/// A document with a canonical signing encoding.
pub trait CanonicalDocument {
    fn canonical_string(&self) -> Result<String, CanonicalError>;

    fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        self.canonical_string().map(String::into_bytes)
    }
}

/// JCS-encode any serializable value.
pub fn canonicalize<T: Serialize>(document: &T) -> Result<String, CanonicalError> {
    // Going through Value first keeps tagged enums and flattened fields in
    // plain map form before the canonicalizer sees them.
    let value = serde_json::to_value(document)?;
    let bytes = serde_json_canonicalizer::to_vec(&value)
        .map_err(|e| CanonicalError::Jcs(e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| CanonicalError::NotUtf8)
}

impl CanonicalDocument for Link {
    fn canonical_string(&self) -> Result<String, CanonicalError> {
        let mut copy = self.clone();
        copy.materials.sort();
        copy.products.sort();
        canonicalize(&copy)
    }
}

impl CanonicalDocument for Layout {
    fn canonical_string(&self) -> Result<String, CanonicalError> {
        let mut copy = self.clone();
        copy.keys.sort_by(|a, b| a.key_id.cmp(&b.key_id));
        copy.authorized_key_ids.sort();
        copy.layout_segments.sort_by(|a, b| a.name.cmp(&b.name));
        for segment in &mut copy.layout_segments {
            segment.steps.sort_by(|a, b| a.name.cmp(&b.name));
            for step in &mut segment.steps {
                step.authorized_key_ids.sort();
            }
        }
        canonicalize(&copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::keys::PublicKey;
    use crate::layout::{LayoutSegment, Step};
    use crate::rule::Rule;
    use crate::signature::KeyAlgorithm;

    fn sample_link() -> Link {
        Link::new("ci", "build", "run-7")
            .with_materials(vec![
                Artifact::new("src/z.c", "03"),
                Artifact::new("src/a.c", "01"),
            ])
            .with_products(vec![Artifact::new("out/b.o", "05"), Artifact::new("out/a.o", "04")])
    }

    fn sample_layout() -> Layout {
        let mut build = Step::new("build");
        build.authorized_key_ids = vec!["k2".into(), "k1".into()];
        build.expected_product_rules = vec![Rule::create("out/*.o"), Rule::disallow("**")];
        Layout {
            keys: vec![
                PublicKey::new(KeyAlgorithm::Ed25519, vec![2; 32]),
                PublicKey::new(KeyAlgorithm::Ed25519, vec![1; 32]),
            ],
            authorized_key_ids: vec!["k9".into()],
            layout_segments: vec![
                LayoutSegment {
                    name: "release".into(),
                    steps: vec![Step::new("sign"), Step::new("publish")],
                },
                LayoutSegment {
                    name: "ci".into(),
                    steps: vec![build, Step::new("test")],
                },
            ],
            expected_end_products: vec![],
        }
    }

    #[test]
    fn test_link_exact_encoding() {
        let canonical = sample_link().canonical_string().unwrap();
        assert_eq!(
            canonical,
            concat!(
                r#"{"layoutSegmentName":"ci","#,
                r#""materials":[{"hash":"01","uri":"src/a.c"},{"hash":"03","uri":"src/z.c"}],"#,
                r#""products":[{"hash":"04","uri":"out/a.o"},{"hash":"05","uri":"out/b.o"}],"#,
                r#""runId":"run-7","stepName":"build"}"#
            )
        );
    }

    #[test]
    fn test_deterministic_and_order_independent() {
        let link = sample_link();
        let mut shuffled = link.clone();
        shuffled.materials.reverse();
        shuffled.products.reverse();

        let first = link.canonical_string().unwrap();
        assert_eq!(first, link.canonical_string().unwrap());
        assert_eq!(first, shuffled.canonical_string().unwrap());
    }

    #[test]
    fn test_caller_document_not_mutated() {
        let link = sample_link();
        let before = link.clone();
        link.canonical_string().unwrap();
        assert_eq!(link, before);

        let layout = sample_layout();
        let before = layout.clone();
        layout.canonical_string().unwrap();
        assert_eq!(layout, before);
    }

    #[test]
    fn test_layout_segments_and_steps_sorted() {
        let canonical = sample_layout().canonical_string().unwrap();
        let value: serde_json::Value = serde_json::from_str(&canonical).unwrap();

        let segments: Vec<&str> = value["layoutSegments"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(segments, vec!["ci", "release"]);

        let release_steps: Vec<&str> = value["layoutSegments"][1]["steps"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap())
            .collect();
        assert_eq!(release_steps, vec!["publish", "sign"]);

        let build = &value["layoutSegments"][0]["steps"][0];
        assert_eq!(build["authorizedKeyIds"], serde_json::json!(["k1", "k2"]));
    }

    #[test]
    fn test_rule_order_preserved() {
        let canonical = sample_layout().canonical_string().unwrap();
        let create = canonical.find("CREATE").unwrap();
        let disallow = canonical.find("DISALLOW").unwrap();
        assert!(create < disallow);
    }

    #[test]
    fn test_no_nulls_emitted() {
        let canonical = sample_link().canonical_string().unwrap();
        assert!(!canonical.contains("null"));
        assert!(!canonical.contains("command"));
    }
}
