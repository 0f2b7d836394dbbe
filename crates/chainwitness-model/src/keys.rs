//! Public key documents.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::signature::KeyAlgorithm;

/// Key identifier: lowercase hex SHA-256 of the encoded public key.
pub type KeyId = String;

/// A public key as published in a layout.
///
/// `key` holds the SPKI DER encoding for EC keys and the raw 32-byte point
/// for Ed25519 keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub key_id: KeyId,

    pub algorithm: KeyAlgorithm,

    #[serde(with = "crate::hex_bytes")]
    pub key: Vec<u8>,
}

impl PublicKey {
    /// Wrap encoded key bytes, deriving the key id from them.
    pub fn new(algorithm: KeyAlgorithm, key: Vec<u8>) -> Self {
        Self {
            key_id: compute_key_id(&key),
            algorithm,
            key,
        }
    }

    /// Whether `key_id` really is the digest of `key`.
    pub fn has_consistent_id(&self) -> bool {
        compute_key_id(&self.key) == self.key_id
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("key", &format_args!("[{} bytes]", self.key.len()))
            .finish()
    }
}

/// Compute the key id for encoded public key bytes.
pub fn compute_key_id(key: &[u8]) -> KeyId {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hex::encode(hasher.finalize())
}
