//! Artifact rule interpreter.
//!
//! Evaluates a step's ordered rule list against the step's materials or
//! products. Each rule explains ("consumes") part of a shared pool of not yet
//! explained artifacts; a list succeeds only when no rule fails and the pool
//! is empty afterwards. Anything a rule list does not explicitly account for
//! is a failure.

mod context;
mod error;
mod pattern;
mod verify;

pub use context::{
    ArtifactSet, ArtifactsVerificationContext, Side, StepArtifacts, VerifiedSteps,
};
pub use error::RuleError;
pub use pattern::{validate_rule, PathPattern};
pub use verify::{verify_rule, verify_rules, RuleListOutcome};
