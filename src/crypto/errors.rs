//! Security error type.

use chainwitness_model::{HashAlgorithm, KeyAlgorithm};
use thiserror::Error;

/// Cryptographic failures.
///
/// These are kept apart from "the signature does not match", which is an
/// ordinary `false` result, so a caller can never mistake a broken key for
/// a tampered document. Messages never contain key bytes or passphrases.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unsupported algorithm combination: {key_algorithm}/{hash_algorithm}")]
    UnsupportedAlgorithm {
        key_algorithm: KeyAlgorithm,
        hash_algorithm: HashAlgorithm,
    },

    #[error("no signature scheme registered for {0} keys")]
    UnsupportedKeyAlgorithm(KeyAlgorithm),

    #[error("malformed key material: {0}")]
    InvalidKeyMaterial(String),

    /// Wrong passphrase or corrupted ciphertext. Deliberately says nothing
    /// about which key was involved.
    #[error("private key could not be decrypted")]
    Decryption,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("key encryption failed: {0}")]
    Encryption(String),
}
