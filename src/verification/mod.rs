//! Supply-chain verification.

mod error;
mod release;
mod report;
mod result;
mod run;
mod validate;

pub use error::VerifyError;
pub use release::{create_release, release_digest, ReleaseResult};
pub use report::{VerificationReport, REPORT_SCHEMA_ID, REPORT_SCHEMA_VERSION};
pub use result::{ArtifactSide, DiscardReason, VerificationRunResult, Violation};
pub use run::{VerificationRequest, Verifier};
pub use validate::{validate_approvals, validate_layout, verify_layout_signatures};
