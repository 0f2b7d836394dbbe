//! Layouts: the signed declaration of the expected supply chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::DocumentError;
use crate::keys::{KeyId, PublicKey};
use crate::rule::Rule;
use crate::signature::Signature;

/// One stage of the supply chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,

    /// Keys allowed to sign links for this step
    pub authorized_key_ids: Vec<KeyId>,

    /// Minimum number of distinct authorized signers
    pub required_number_of_signatures: u32,

    /// Rules explaining the step's materials, in evaluation order
    pub expected_material_rules: Vec<Rule>,

    /// Rules explaining the step's products, in evaluation order
    pub expected_product_rules: Vec<Rule>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authorized_key_ids: Vec::new(),
            required_number_of_signatures: 1,
            expected_material_rules: Vec::new(),
            expected_product_rules: Vec::new(),
        }
    }

    pub fn is_authorized(&self, key_id: &str) -> bool {
        self.authorized_key_ids.iter().any(|k| k == key_id)
    }
}

/// A named, ordered group of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSegment {
    pub name: String,

    pub steps: Vec<Step>,
}

/// Address of a step inside a layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRef {
    pub segment_name: String,
    pub step_name: String,
}

impl StepRef {
    pub fn new(segment_name: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            segment_name: segment_name.into(),
            step_name: step_name.into(),
        }
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment_name, self.step_name)
    }
}

/// The expected supply chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    /// Every public key referenced by the layout
    pub keys: Vec<PublicKey>,

    /// Keys allowed to sign the layout itself
    pub authorized_key_ids: Vec<KeyId>,

    pub layout_segments: Vec<LayoutSegment>,

    /// Rules the released artifacts must satisfy
    pub expected_end_products: Vec<Rule>,
}

impl Layout {
    pub fn public_key(&self, key_id: &str) -> Option<&PublicKey> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }

    pub fn segment(&self, name: &str) -> Option<&LayoutSegment> {
        self.layout_segments.iter().find(|s| s.name == name)
    }

    pub fn step(&self, step_ref: &StepRef) -> Option<&Step> {
        self.segment(&step_ref.segment_name)?
            .steps
            .iter()
            .find(|s| s.name == step_ref.step_name)
    }

    /// Steps in declared order, with their addresses.
    pub fn steps_in_order(&self) -> impl Iterator<Item = (StepRef, &Step)> {
        self.layout_segments.iter().flat_map(|segment| {
            segment
                .steps
                .iter()
                .map(move |step| (StepRef::new(&segment.name, &step.name), step))
        })
    }

    /// The last step in declared order.
    pub fn final_step(&self) -> Option<StepRef> {
        self.steps_in_order().last().map(|(step_ref, _)| step_ref)
    }
}

/// A layout together with the signatures over its canonical encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetaBlock {
    pub supply_chain_id: String,

    pub layout: Layout,

    pub signatures: Vec<Signature>,
}

impl LayoutMetaBlock {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), DocumentError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_file(path: &Path, max_bytes: u64) -> Result<Self, DocumentError> {
        let json = crate::read_bounded(path, max_bytes)?;
        Ok(Self::from_json(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn two_segment_layout() -> Layout {
        Layout {
            keys: Vec::new(),
            authorized_key_ids: Vec::new(),
            layout_segments: vec![
                LayoutSegment {
                    name: "source".into(),
                    steps: vec![Step::new("checkout"), Step::new("review")],
                },
                LayoutSegment {
                    name: "ci".into(),
                    steps: vec![Step::new("build")],
                },
            ],
            expected_end_products: Vec::new(),
        }
    }

    #[test]
    fn test_steps_in_declared_order() {
        let layout = two_segment_layout();
        let order: Vec<String> = layout.steps_in_order().map(|(r, _)| r.to_string()).collect();
        assert_eq!(order, vec!["source/checkout", "source/review", "ci/build"]);
        assert_eq!(layout.final_step(), Some(StepRef::new("ci", "build")));
    }

    #[test]
    fn test_step_lookup() {
        let layout = two_segment_layout();
        assert!(layout.step(&StepRef::new("source", "review")).is_some());
        assert!(layout.step(&StepRef::new("ci", "review")).is_none());
        assert!(layout.step(&StepRef::new("deploy", "build")).is_none());
    }

    #[test]
    fn test_from_file_enforces_size_limit() {
        let dir = TempDir::new().unwrap();
        let block = LayoutMetaBlock {
            supply_chain_id: "chain-1".into(),
            layout: two_segment_layout(),
            signatures: Vec::new(),
        };
        let path = dir.path().join("layout.json");
        block.write_to_file(&path).unwrap();

        let loaded = LayoutMetaBlock::from_file(&path, 1 << 20).unwrap();
        assert_eq!(loaded.layout, block.layout);

        let err = LayoutMetaBlock::from_file(&path, 8).unwrap_err();
        assert!(matches!(err, DocumentError::TooLarge { limit: 8, .. }));
    }
}
