//! Per-step approval policy.

use serde::{Deserialize, Serialize};

use crate::keys::KeyId;
use crate::layout::StepRef;

/// Names specific signers whose valid signatures a step must carry, on top
/// of the step's own signature threshold.
///
/// Every key listed here must also be an authorized key of the step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalConfiguration {
    pub segment_name: String,

    pub step_name: String,

    pub required_key_ids: Vec<KeyId>,
}

impl ApprovalConfiguration {
    pub fn step_ref(&self) -> StepRef {
        StepRef::new(&self.segment_name, &self.step_name)
    }

    pub fn applies_to(&self, step_ref: &StepRef) -> bool {
        self.segment_name == step_ref.segment_name && self.step_name == step_ref.step_name
    }
}
