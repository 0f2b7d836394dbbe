//! Signing and verifying canonical documents.
//!
//! The message is always the canonical UTF-8 encoding of the document, so a
//! signature stays valid across any re-serialization that preserves content.

use chainwitness_model::{CanonicalDocument, CanonicalError, PublicKey, Signature};
use thiserror::Error;
use tracing::debug;

use super::errors::CryptoError;
use super::keys::EncryptedPrivateKey;
use super::registry::AlgorithmRegistry;

/// Errors from signing or verifying a document.
#[derive(Debug, Error)]
pub enum SignError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] CanonicalError),
}

/// Produces [`Signature`]s with encrypted private keys.
#[derive(Debug, Clone, Copy)]
pub struct Signer<'r> {
    registry: &'r AlgorithmRegistry,
}

impl<'r> Signer<'r> {
    pub fn new(registry: &'r AlgorithmRegistry) -> Self {
        Self { registry }
    }

    pub fn sign<D: CanonicalDocument>(
        &self,
        private_key: &EncryptedPrivateKey,
        passphrase: &str,
        document: &D,
    ) -> Result<Signature, SignError> {
        let canonical = document.canonical_string()?;
        Ok(self.sign_canonical(private_key, passphrase, &canonical)?)
    }

    /// Sign an already canonical string.
    pub fn sign_canonical(
        &self,
        private_key: &EncryptedPrivateKey,
        passphrase: &str,
        canonical: &str,
    ) -> Result<Signature, CryptoError> {
        let scheme = self.registry.preferred_scheme(private_key.algorithm)?;
        let secret = private_key.decrypt(passphrase)?;
        let bytes = scheme.sign(&secret, canonical.as_bytes())?;

        Ok(Signature {
            key_id: private_key.key_id.clone(),
            signature: hex::encode(bytes),
            key_algorithm: scheme.key_algorithm(),
            hash_algorithm: scheme.hash_algorithm(),
        })
    }
}

/// Checks [`Signature`]s against public keys.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier<'r> {
    registry: &'r AlgorithmRegistry,
}

impl<'r> SignatureVerifier<'r> {
    pub fn new(registry: &'r AlgorithmRegistry) -> Self {
        Self { registry }
    }

    /// `Ok(false)` for any mismatch: different key, undecodable signature,
    /// tampered document. `Err` for unsupported algorithms and unusable keys.
    pub fn is_valid<D: CanonicalDocument>(
        &self,
        document: &D,
        signature: &Signature,
        public_key: &PublicKey,
    ) -> Result<bool, SignError> {
        let canonical = document.canonical_string()?;
        Ok(self.is_valid_canonical(&canonical, signature, public_key)?)
    }

    pub fn is_valid_canonical(
        &self,
        canonical: &str,
        signature: &Signature,
        public_key: &PublicKey,
    ) -> Result<bool, CryptoError> {
        let scheme = self
            .registry
            .scheme(signature.key_algorithm, signature.hash_algorithm)?;

        if signature.key_id != public_key.key_id || signature.key_algorithm != public_key.algorithm {
            debug!(
                key_id = %signature.key_id,
                public_key_id = %public_key.key_id,
                "signature does not belong to this key"
            );
            return Ok(false);
        }

        let Ok(bytes) = hex::decode(&signature.signature) else {
            debug!(key_id = %signature.key_id, "signature is not valid hex");
            return Ok(false);
        };

        scheme.verify(&public_key.key, canonical.as_bytes(), &bytes)
    }
}
