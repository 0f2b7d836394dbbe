//! Algorithm registry.
//!
//! Maps (key algorithm, hash algorithm) pairs to signature schemes. Built
//! once at startup and then shared read-only across verifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use chainwitness_model::{HashAlgorithm, KeyAlgorithm};

use super::errors::CryptoError;
use super::schemes::{EcdsaP384Sha384, Ed25519Sha512, SignatureScheme};

pub struct AlgorithmRegistry {
    schemes: BTreeMap<(KeyAlgorithm, HashAlgorithm), Arc<dyn SignatureScheme>>,
    /// Scheme used when only a key algorithm is known (signing, keygen).
    preferred: BTreeMap<KeyAlgorithm, HashAlgorithm>,
}

impl AlgorithmRegistry {
    /// An empty registry. Every lookup fails until schemes are registered.
    pub fn new() -> Self {
        Self {
            schemes: BTreeMap::new(),
            preferred: BTreeMap::new(),
        }
    }

    /// Registry with the built-in schemes: `EC`/`SHA384` and `ED25519`/`SHA512`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EcdsaP384Sha384));
        registry.register(Arc::new(Ed25519Sha512));
        registry
    }

    /// Register a scheme. The first scheme registered for a key algorithm
    /// becomes its preferred scheme.
    pub fn register(&mut self, scheme: Arc<dyn SignatureScheme>) {
        let key = scheme.key_algorithm();
        let hash = scheme.hash_algorithm();
        self.preferred.entry(key).or_insert(hash);
        self.schemes.insert((key, hash), scheme);
    }

    pub fn scheme(
        &self,
        key_algorithm: KeyAlgorithm,
        hash_algorithm: HashAlgorithm,
    ) -> Result<&dyn SignatureScheme, CryptoError> {
        self.schemes
            .get(&(key_algorithm, hash_algorithm))
            .map(|s| s.as_ref())
            .ok_or(CryptoError::UnsupportedAlgorithm {
                key_algorithm,
                hash_algorithm,
            })
    }

    pub fn preferred_scheme(&self, key_algorithm: KeyAlgorithm) -> Result<&dyn SignatureScheme, CryptoError> {
        let hash = self
            .preferred
            .get(&key_algorithm)
            .ok_or(CryptoError::UnsupportedKeyAlgorithm(key_algorithm))?;
        self.scheme(key_algorithm, *hash)
    }

    pub fn supports(&self, key_algorithm: KeyAlgorithm, hash_algorithm: HashAlgorithm) -> bool {
        self.schemes.contains_key(&(key_algorithm, hash_algorithm))
    }

    pub fn supported(&self) -> Vec<(KeyAlgorithm, HashAlgorithm)> {
        self.schemes.keys().copied().collect()
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("schemes", &self.supported())
            .finish()
    }
}
