//! Detached signatures over canonical documents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Asymmetric key family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyAlgorithm {
    /// NIST P-384 elliptic curve
    Ec,
    /// RSA (declared in documents, no signing scheme registered)
    Rsa,
    Ed25519,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ec => write!(f, "EC"),
            Self::Rsa => write!(f, "RSA"),
            Self::Ed25519 => write!(f, "ED25519"),
        }
    }
}

/// Message digest paired with a key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Lowercase identifier used in configuration (`sha256`, ...).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha384 => write!(f, "SHA384"),
            Self::Sha512 => write!(f, "SHA512"),
        }
    }
}

/// A signature produced by one key over the canonical encoding of a document.
///
/// Two signatures compare equal when they come from the same key with the
/// same algorithm pair: the signature bytes are not part of the identity,
/// so a key occupies one signature slot no matter how often it signed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Identifier of the signing key
    pub key_id: String,

    /// Hex-encoded signature bytes
    pub signature: String,

    pub key_algorithm: KeyAlgorithm,

    pub hash_algorithm: HashAlgorithm,
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.key_id == other.key_id
            && self.key_algorithm == other.key_algorithm
            && self.hash_algorithm == other.hash_algorithm
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_id.hash(state);
        self.key_algorithm.hash(state);
        self.hash_algorithm.hash(state);
    }
}
