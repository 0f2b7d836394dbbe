//! Verification verdicts and the violation trail.

use std::fmt;

use chainwitness_model::{Artifact, KeyId, StepRef};
use serde::{Deserialize, Serialize};

/// Which rule list of a step a violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSide {
    Materials,
    Products,
}

impl fmt::Display for ArtifactSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Materials => write!(f, "materials"),
            Self::Products => write!(f, "products"),
        }
    }
}

/// Why a candidate link was not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Link belongs to another supply chain
    WrongSupplyChain,
    /// Signer is not an authorized key of the step
    UnauthorizedSigner,
    InvalidSignature,
    /// Declared algorithm pair has no scheme, or the key is unusable
    UnusableSignature,
    /// Same artifact listed twice in materials or products
    DuplicateArtifacts,
}

/// One reason a run is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    LinkDiscarded {
        step: StepRef,
        run_id: String,
        key_id: KeyId,
        reason: DiscardReason,
    },
    ThresholdNotMet {
        step: StepRef,
        required: u32,
        /// Largest number of distinct valid signers behind any one link content
        signers: usize,
    },
    ConflictingLinks {
        step: StepRef,
        /// Number of distinct link contents that each met the threshold
        candidates: usize,
    },
    ApprovalMissing {
        step: StepRef,
        key_id: KeyId,
    },
    RuleFailed {
        step: StepRef,
        side: ArtifactSide,
        index: usize,
        rule: String,
    },
    UnexplainedArtifacts {
        step: StepRef,
        side: ArtifactSide,
        artifacts: Vec<Artifact>,
    },
    EndProductRuleFailed {
        index: usize,
        rule: String,
    },
    EndProductsUnexplained {
        artifacts: Vec<Artifact>,
    },
    EndProductMismatch {
        /// Expected by the caller but not produced
        missing: Vec<Artifact>,
        /// Produced but not expected by the caller
        unexpected: Vec<Artifact>,
    },
}

impl Violation {
    /// Whether this violation alone makes the run invalid. Discarded links
    /// are diagnostics; the step only fails if too few signers remain.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::LinkDiscarded { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDiscarded {
                step,
                run_id,
                key_id,
                reason,
            } => write!(f, "{step}: discarded link {run_id} signed by {key_id} ({reason:?})"),
            Self::ThresholdNotMet {
                step,
                required,
                signers,
            } => write!(f, "{step}: {signers} of {required} required signatures"),
            Self::ConflictingLinks { step, candidates } => {
                write!(f, "{step}: {candidates} conflicting links each met the threshold")
            }
            Self::ApprovalMissing { step, key_id } => write!(f, "{step}: missing approval from {key_id}"),
            Self::RuleFailed {
                step,
                side,
                index,
                rule,
            } => write!(f, "{step}: {side} rule #{index} failed: {rule}"),
            Self::UnexplainedArtifacts { step, side, artifacts } => {
                write!(f, "{step}: {} unexplained {side}", artifacts.len())
            }
            Self::EndProductRuleFailed { index, rule } => {
                write!(f, "end product rule #{index} failed: {rule}")
            }
            Self::EndProductsUnexplained { artifacts } => {
                write!(f, "{} unexplained end products", artifacts.len())
            }
            Self::EndProductMismatch { missing, unexpected } => write!(
                f,
                "end products differ from expected: {} missing, {} unexpected",
                missing.len(),
                unexpected.len()
            ),
        }
    }
}

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRunResult {
    pub run_is_valid: bool,

    /// Everything that went wrong, including discarded links on a valid run
    pub violations: Vec<Violation>,
}

impl VerificationRunResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            run_is_valid: !violations.iter().any(Violation::is_fatal),
            violations,
        }
    }

    pub fn fatal_violations(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_fatal())
    }
}
