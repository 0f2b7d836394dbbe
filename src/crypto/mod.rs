//! Key management and signatures.

pub mod errors;
pub mod keys;
pub mod registry;
pub mod schemes;
pub mod signer;

pub use errors::CryptoError;
pub use keys::{encrypt_private_key, EncryptedPrivateKey, KeyPair, KeyRing, DEFAULT_PBKDF2_ITERATIONS};
pub use registry::AlgorithmRegistry;
pub use schemes::{EcdsaP384Sha384, Ed25519Sha512, SignatureScheme};
pub use signer::{SignError, SignatureVerifier, Signer};
