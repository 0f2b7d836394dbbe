//! Concrete signature schemes.
//!
//! - `EC` keys sign with ECDSA over P-384 and SHA-384. Public keys are
//!   SubjectPublicKeyInfo DER, signatures are ASN.1 DER.
//! - `ED25519` keys sign with Ed25519 (SHA-512 internally). Public keys are
//!   the raw 32 bytes, signatures the raw 64 bytes.
//!
//! Private keys are always handled as PKCS#8 DER.

use chainwitness_model::{HashAlgorithm, KeyAlgorithm};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, SecretDocument};
use rand::rngs::OsRng;

use super::errors::CryptoError;

/// One (key algorithm, hash algorithm) pair.
pub trait SignatureScheme: Send + Sync {
    fn key_algorithm(&self) -> KeyAlgorithm;

    fn hash_algorithm(&self) -> HashAlgorithm;

    /// Generate a key pair: PKCS#8 private key and encoded public key.
    fn generate(&self) -> Result<(SecretDocument, Vec<u8>), CryptoError>;

    /// Check that `public_key` parses for this scheme.
    fn check_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError>;

    fn sign(&self, private_key: &SecretDocument, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// `Ok(false)` when the signature is undecodable or does not match.
    /// `Err` only when the public key itself is unusable.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;
}

/// ECDSA P-384 with SHA-384.
#[derive(Debug, Default)]
pub struct EcdsaP384Sha384;

impl EcdsaP384Sha384 {
    fn public_key(bytes: &[u8]) -> Result<p384::PublicKey, CryptoError> {
        p384::PublicKey::from_public_key_der(bytes)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("EC public key: {e}")))
    }
}

impl SignatureScheme for EcdsaP384Sha384 {
    fn key_algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ec
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha384
    }

    fn generate(&self) -> Result<(SecretDocument, Vec<u8>), CryptoError> {
        let secret = p384::SecretKey::random(&mut OsRng);
        let private = secret
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let public = secret
            .public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
        Ok((private, public.as_bytes().to_vec()))
    }

    fn check_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError> {
        Self::public_key(public_key).map(|_| ())
    }

    fn sign(&self, private_key: &SecretDocument, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use p384::ecdsa::signature::Signer;

        let secret = p384::SecretKey::from_pkcs8_der(private_key.as_bytes())
            .map_err(|_| CryptoError::Decryption)?;
        let signing_key = p384::ecdsa::SigningKey::from(secret);
        let signature: p384::ecdsa::Signature = signing_key
            .try_sign(message)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        use p384::ecdsa::signature::Verifier;

        let verifying_key = p384::ecdsa::VerifyingKey::from(Self::public_key(public_key)?);
        let Ok(signature) = p384::ecdsa::Signature::from_der(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify(message, &signature).is_ok())
    }
}

/// Ed25519.
#[derive(Debug, Default)]
pub struct Ed25519Sha512;

impl Ed25519Sha512 {
    fn verifying_key(bytes: &[u8]) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        let raw: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyMaterial(format!(
                "ED25519 public key must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(&raw)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("ED25519 public key: {e}")))
    }
}

impl SignatureScheme for Ed25519Sha512 {
    fn key_algorithm(&self) -> KeyAlgorithm {
        KeyAlgorithm::Ed25519
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha512
    }

    fn generate(&self) -> Result<(SecretDocument, Vec<u8>), CryptoError> {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let private = signing_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok((private, signing_key.verifying_key().to_bytes().to_vec()))
    }

    fn check_public_key(&self, public_key: &[u8]) -> Result<(), CryptoError> {
        Self::verifying_key(public_key).map(|_| ())
    }

    fn sign(&self, private_key: &SecretDocument, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use ed25519_dalek::Signer;

        let signing_key = ed25519_dalek::SigningKey::from_pkcs8_der(private_key.as_bytes())
            .map_err(|_| CryptoError::Decryption)?;
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        use ed25519_dalek::Verifier;

        let verifying_key = Self::verifying_key(public_key)?;
        let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(verifying_key.verify(message, &signature).is_ok())
    }
}
