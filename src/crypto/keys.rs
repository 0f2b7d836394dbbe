//! Key generation, encrypted private keys and the verification key ring.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use chainwitness_model::{KeyAlgorithm, KeyId, Layout, PublicKey};
use pkcs8::pkcs5::pbes2;
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo, SecretDocument};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::errors::CryptoError;
use super::registry::AlgorithmRegistry;

/// Default PBKDF2 iteration count for newly encrypted keys.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

/// A private key stored as encrypted PKCS#8 (PBES2: PBKDF2-SHA256 with
/// AES-256-CBC). Safe to write to disk; useless without the passphrase.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPrivateKey {
    /// Id of the matching public key
    pub key_id: KeyId,

    pub algorithm: KeyAlgorithm,

    /// Base64 DER of the EncryptedPrivateKeyInfo
    #[serde(with = "base64_der")]
    pub encrypted_key: Vec<u8>,
}

impl EncryptedPrivateKey {
    /// Decrypt to PKCS#8 DER. Any failure, wrong passphrase included,
    /// comes back as [`CryptoError::Decryption`].
    pub fn decrypt(&self, passphrase: &str) -> Result<SecretDocument, CryptoError> {
        let info = EncryptedPrivateKeyInfo::try_from(self.encrypted_key.as_slice())
            .map_err(|_| CryptoError::Decryption)?;
        info.decrypt(passphrase).map_err(|_| CryptoError::Decryption)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl fmt::Debug for EncryptedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPrivateKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("encrypted_key", &"[REDACTED]")
            .finish()
    }
}

mod base64_der {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(de::Error::custom)
    }
}

/// Encrypt PKCS#8 DER under `passphrase` with a fresh salt and IV.
pub fn encrypt_private_key(
    private_key: &SecretDocument,
    passphrase: &str,
    iterations: u32,
) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let info = PrivateKeyInfo::try_from(private_key.as_bytes())
        .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
    let encrypted = info
        .encrypt_with_params(params, passphrase)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(encrypted.as_bytes().to_vec())
}

/// A freshly generated key pair.
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: EncryptedPrivateKey,
}

impl KeyPair {
    /// Generate a key pair with the registry's preferred scheme for
    /// `algorithm`, encrypting the private half under `passphrase`.
    pub fn generate(
        registry: &AlgorithmRegistry,
        algorithm: KeyAlgorithm,
        passphrase: &str,
        iterations: u32,
    ) -> Result<Self, CryptoError> {
        let scheme = registry.preferred_scheme(algorithm)?;
        let (private, public) = scheme.generate()?;
        let public_key = PublicKey::new(algorithm, public);
        let encrypted_key = encrypt_private_key(&private, passphrase, iterations)?;

        Ok(Self {
            private_key: EncryptedPrivateKey {
                key_id: public_key.key_id.clone(),
                algorithm,
                encrypted_key,
            },
            public_key,
        })
    }
}

/// Public keys indexed by id, checked once up front.
///
/// Every key has a supported algorithm, parses for its scheme and carries
/// the id its bytes hash to.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: BTreeMap<KeyId, PublicKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<'a, I>(registry: &AlgorithmRegistry, keys: I) -> Result<Self, CryptoError>
    where
        I: IntoIterator<Item = &'a PublicKey>,
    {
        let mut ring = Self::new();
        for key in keys {
            ring.insert(registry, key.clone())?;
        }
        Ok(ring)
    }

    pub fn from_layout(registry: &AlgorithmRegistry, layout: &Layout) -> Result<Self, CryptoError> {
        Self::from_keys(registry, &layout.keys)
    }

    pub fn insert(&mut self, registry: &AlgorithmRegistry, key: PublicKey) -> Result<(), CryptoError> {
        if !key.has_consistent_id() {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "key id {} does not match its key bytes",
                key.key_id
            )));
        }
        registry.preferred_scheme(key.algorithm)?.check_public_key(&key.key)?;
        self.keys.insert(key.key_id.clone(), key);
        Ok(())
    }

    pub fn get(&self, key_id: &str) -> Option<&PublicKey> {
        self.keys.get(key_id)
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
