//! Chainwitness - supply-chain provenance verification
//!
//! Checks that the artifacts a supply chain released could only have come
//! out of the process its signed layout describes: every step signed by
//! enough authorized keys, every artifact explained by the step's rules,
//! and the final products equal to what is being released.

pub mod config;
pub mod crypto;
pub mod hashing;
pub mod logging;
pub mod verification;

pub use chainwitness_model as model;
pub use chainwitness_rules as rules;

pub use config::{ConfigError, EffectiveConfig, Settings};
pub use crypto::{AlgorithmRegistry, CryptoError, EncryptedPrivateKey, KeyPair, KeyRing, SignError, SignatureVerifier, Signer};
pub use hashing::{create_hash, create_hash_with, hash_file, HashError};
pub use verification::{
    create_release, ReleaseResult, VerificationReport, VerificationRequest, VerificationRunResult, Verifier, VerifyError,
    Violation,
};
