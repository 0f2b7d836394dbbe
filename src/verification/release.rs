//! Releases: a verified run over the artifacts being shipped.

use chainwitness_model::{canonicalize, Artifact, LayoutMetaBlock, LinkMetaBlock};
use chainwitness_rules::ArtifactSet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::error::VerifyError;
use super::result::Violation;
use super::run::{VerificationRequest, Verifier};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResult {
    pub supply_chain_id: String,

    pub release_is_valid: bool,

    /// Hex SHA-256 of the canonical encoding of `artifacts`
    pub release_digest: String,

    /// Released artifacts, deduplicated and sorted
    pub artifacts: Vec<Artifact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

/// Verify the chain with the union of `artifact_sets` as the expected end
/// products, and describe the resulting release. Nothing is stored.
pub fn create_release(
    verifier: &Verifier<'_>,
    layout: &LayoutMetaBlock,
    links: &[LinkMetaBlock],
    artifact_sets: &[Vec<Artifact>],
) -> Result<ReleaseResult, VerifyError> {
    let artifacts: Vec<Artifact> = artifact_sets
        .iter()
        .flatten()
        .cloned()
        .collect::<ArtifactSet>()
        .into_iter()
        .collect();

    let result = verifier.verify_run(&VerificationRequest::new(layout, links, &artifacts))?;
    let release_digest = release_digest(&artifacts)?;

    info!(
        supply_chain = %layout.supply_chain_id,
        valid = result.run_is_valid,
        digest = %release_digest,
        "release evaluated"
    );

    Ok(ReleaseResult {
        supply_chain_id: layout.supply_chain_id.clone(),
        release_is_valid: result.run_is_valid,
        release_digest,
        artifacts,
        violations: result.violations,
    })
}

/// Digest identifying a set of released artifacts. `artifacts` must be
/// sorted.
pub fn release_digest(artifacts: &[Artifact]) -> Result<String, VerifyError> {
    let canonical = canonicalize(&artifacts)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
