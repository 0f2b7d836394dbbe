//! Step links: signed records of what one step consumed and produced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::artifact::Artifact;
use crate::error::DocumentError;
use crate::signature::Signature;

/// Observed materials and products of one executed step instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub step_name: String,

    pub run_id: String,

    pub layout_segment_name: String,

    /// Command line the step ran, when the producer recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    pub materials: Vec<Artifact>,

    pub products: Vec<Artifact>,
}

impl Link {
    pub fn new(
        layout_segment_name: impl Into<String>,
        step_name: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            run_id: run_id.into(),
            layout_segment_name: layout_segment_name.into(),
            command: None,
            materials: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn with_materials(mut self, materials: Vec<Artifact>) -> Self {
        self.materials = materials;
        self
    }

    pub fn with_products(mut self, products: Vec<Artifact>) -> Self {
        self.products = products;
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = Some(command);
        self
    }

    /// Artifacts listed more than once on the same side.
    pub fn duplicate_artifacts(&self) -> Vec<&Artifact> {
        let mut duplicates = Vec::new();
        for side in [&self.materials, &self.products] {
            let mut seen = BTreeSet::new();
            for artifact in side {
                if !seen.insert(artifact) {
                    duplicates.push(artifact);
                }
            }
        }
        duplicates
    }
}

/// A link together with the signature over its canonical encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkMetaBlock {
    pub supply_chain_id: String,

    pub link: Link,

    pub signature: Signature,
}

impl LinkMetaBlock {
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

    /// Load from file, refusing documents larger than `max_bytes`.
    pub fn from_file(path: &Path, max_bytes: u64) -> Result<Self, DocumentError> {
        let json = crate::read_bounded(path, max_bytes)?;
        Ok(Self::from_json(&json)?)
    }
}
