//! Error types for document handling.

use std::io;
use thiserror::Error;

/// Failure to produce the canonical encoding of a document.
///
/// Well-formed documents always encode; hitting this means the document
/// holds a value JSON cannot represent, which is a defect rather than a
/// verification outcome.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JCS canonicalization error: {0}")]
    Jcs(String),

    #[error("canonical output is not UTF-8")]
    NotUtf8,
}

/// Errors loading or saving documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document {path} is {size} bytes, limit is {limit}")]
    TooLarge { path: String, size: u64, limit: u64 },
}
