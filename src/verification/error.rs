//! Fatal verification errors.

use chainwitness_model::CanonicalError;
use thiserror::Error;

use crate::crypto::{CryptoError, SignError};

/// Reasons a run could not be evaluated at all.
///
/// A chain that simply fails verification is not an error; it comes back
/// as an invalid [`super::VerificationRunResult`].
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed layout: {0}")]
    MalformedLayout(String),

    #[error("layout signature rejected: {0}")]
    InvalidLayoutSignature(String),

    #[error("invalid approval configuration: {0}")]
    InvalidApproval(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] CanonicalError),
}

impl VerifyError {
    /// Whether this is a cryptographic failure rather than a defect in the
    /// inputs or the encoder.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::InvalidLayoutSignature(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }
}

impl From<SignError> for VerifyError {
    fn from(err: SignError) -> Self {
        match err {
            SignError::Crypto(e) => Self::Crypto(e),
            SignError::Canonical(e) => Self::Canonical(e),
        }
    }
}
