//! Chainwitness document model.
//!
//! Defines the documents exchanged between supply-chain participants and the
//! verifier: signed step links, the signed layout describing the expected
//! steps, the artifact rules attached to each step, and the canonical
//! encoding those documents are signed over.

pub mod approval;
pub mod artifact;
pub mod canonical;
pub mod error;
pub mod keys;
pub mod layout;
pub mod link;
pub mod rule;
pub mod signature;

pub use approval::ApprovalConfiguration;
pub use artifact::Artifact;
pub use canonical::{canonicalize, CanonicalDocument};
pub use error::{CanonicalError, DocumentError};
pub use keys::{compute_key_id, KeyId, PublicKey};
pub use layout::{Layout, LayoutMetaBlock, LayoutSegment, Step, StepRef};
pub use link::{Link, LinkMetaBlock};
pub use rule::{DestinationType, MatchRule, PatternRule, Rule, RuleType};
pub use signature::{HashAlgorithm, KeyAlgorithm, Signature};

/// Hex (de)serialization for raw byte fields.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Read a UTF-8 document, refusing files larger than `max_bytes`.
pub(crate) fn read_bounded(path: &std::path::Path, max_bytes: u64) -> Result<String, DocumentError> {
    let size = std::fs::metadata(path)?.len();
    if size > max_bytes {
        return Err(DocumentError::TooLarge {
            path: path.display().to_string(),
            size,
            limit: max_bytes,
        });
    }
    Ok(std::fs::read_to_string(path)?)
}
