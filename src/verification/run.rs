//! The verification run.
//!
//! Steps are walked in declared order. For each step the candidate links
//! are checked and grouped by content, the signature threshold is applied,
//! then the material and product rule lists run against the selected link.
//! Verified steps become MATCH destinations for the steps after them.
//! Finally the layout's end-product rules run against the last step's
//! products, which must also equal what the caller expects to release.

use std::collections::{BTreeMap, BTreeSet};

use chainwitness_model::{ApprovalConfiguration, Artifact, KeyId, LayoutMetaBlock, LinkMetaBlock, Step, StepRef};
use chainwitness_rules::{
    verify_rules, ArtifactSet, ArtifactsVerificationContext, RuleListOutcome, Side, StepArtifacts, VerifiedSteps,
};
use tracing::{debug, info, warn};

use super::error::VerifyError;
use super::result::{ArtifactSide, DiscardReason, VerificationRunResult, Violation};
use super::validate::{validate_approvals, validate_layout, verify_layout_signatures};
use crate::crypto::{AlgorithmRegistry, KeyRing, SignatureVerifier};

/// Everything one run looks at.
#[derive(Debug, Clone, Copy)]
pub struct VerificationRequest<'a> {
    pub layout: &'a LayoutMetaBlock,

    /// Every link recorded for the supply chain
    pub links: &'a [LinkMetaBlock],

    /// What the caller intends to release
    pub expected_end_products: &'a [Artifact],

    pub approvals: &'a [ApprovalConfiguration],
}

impl<'a> VerificationRequest<'a> {
    pub fn new(
        layout: &'a LayoutMetaBlock,
        links: &'a [LinkMetaBlock],
        expected_end_products: &'a [Artifact],
    ) -> Self {
        Self {
            layout,
            links,
            expected_end_products,
            approvals: &[],
        }
    }

    pub fn with_approvals(mut self, approvals: &'a [ApprovalConfiguration]) -> Self {
        self.approvals = approvals;
        self
    }
}

/// Runs verifications against a fixed algorithm registry.
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'r> {
    registry: &'r AlgorithmRegistry,
}

impl<'r> Verifier<'r> {
    pub fn new(registry: &'r AlgorithmRegistry) -> Self {
        Self { registry }
    }

    /// Verify one run.
    ///
    /// Returns `Err` when the layout itself cannot be trusted or used:
    /// bad layout signature, unusable layout keys, malformed structure.
    /// Everything else ends up in the returned result.
    ///
    /// The layout signature is checked before the structure, so a signed
    /// layout edited into a malformed shape is reported as tampering.
    pub fn verify_run(&self, request: &VerificationRequest<'_>) -> Result<VerificationRunResult, VerifyError> {
        let block = request.layout;
        let layout = &block.layout;
        let signatures = SignatureVerifier::new(self.registry);

        let keys = KeyRing::from_layout(self.registry, layout)?;
        verify_layout_signatures(block, &keys, &signatures)?;
        validate_layout(layout)?;
        validate_approvals(layout, request.approvals)?;

        info!(
            supply_chain = %block.supply_chain_id,
            links = request.links.len(),
            "verifying run"
        );

        let mut run = RunState {
            supply_chain_id: &block.supply_chain_id,
            keys: &keys,
            signatures,
            verified: VerifiedSteps::new(),
            violations: Vec::new(),
        };

        for (step_ref, step) in layout.steps_in_order() {
            if !run.verify_step(&step_ref, step, request)? {
                return Ok(run.finish());
            }
        }

        run.verify_end_products(block, request.expected_end_products);
        Ok(run.finish())
    }
}

struct RunState<'a> {
    supply_chain_id: &'a str,
    keys: &'a KeyRing,
    signatures: SignatureVerifier<'a>,
    verified: VerifiedSteps,
    violations: Vec<Violation>,
}

impl RunState<'_> {
    /// `Ok(false)` once the step has failed; later steps are not evaluated.
    fn verify_step(
        &mut self,
        step_ref: &StepRef,
        step: &Step,
        request: &VerificationRequest<'_>,
    ) -> Result<bool, VerifyError> {
        let groups = self.signed_groups(step_ref, step, request.links)?;
        let required = step.required_number_of_signatures as usize;

        let mut qualifying = groups
            .into_iter()
            .filter(|(_, signers)| signers.len() >= required)
            .collect::<Vec<_>>();

        let (artifacts, signers) = match qualifying.len() {
            1 => qualifying.remove(0),
            0 => {
                let signers = self.best_signer_count(step_ref, step, request.links)?;
                warn!(step = %step_ref, required, signers, "signature threshold not met");
                self.violations.push(Violation::ThresholdNotMet {
                    step: step_ref.clone(),
                    required: step.required_number_of_signatures,
                    signers,
                });
                return Ok(false);
            }
            n => {
                warn!(step = %step_ref, candidates = n, "conflicting links met the threshold");
                self.violations.push(Violation::ConflictingLinks {
                    step: step_ref.clone(),
                    candidates: n,
                });
                return Ok(false);
            }
        };
        debug!(step = %step_ref, signers = signers.len(), required, "threshold met");

        let mut approved = true;
        for approval in request.approvals.iter().filter(|a| a.applies_to(step_ref)) {
            for key_id in approval.required_key_ids.iter().filter(|id| !signers.contains(*id)) {
                warn!(step = %step_ref, key_id = %key_id, "required approval missing");
                self.violations.push(Violation::ApprovalMissing {
                    step: step_ref.clone(),
                    key_id: key_id.clone(),
                });
                approved = false;
            }
        }
        if !approved {
            return Ok(false);
        }

        let materials_ok = self.check_rules(step_ref, &step.expected_material_rules, &artifacts, Side::Materials);
        if !materials_ok
            || !self.check_rules(step_ref, &step.expected_product_rules, &artifacts, Side::Products)
        {
            return Ok(false);
        }

        info!(step = %step_ref, "step verified");
        self.verified.insert(step_ref.clone(), artifacts);
        Ok(true)
    }

    /// Valid candidate links for the step, grouped by content, with the
    /// distinct keys that signed each content.
    fn signed_groups(
        &mut self,
        step_ref: &StepRef,
        step: &Step,
        links: &[LinkMetaBlock],
    ) -> Result<BTreeMap<StepArtifacts, BTreeSet<KeyId>>, VerifyError> {
        let mut groups: BTreeMap<StepArtifacts, BTreeSet<KeyId>> = BTreeMap::new();

        for block in candidates(step_ref, links) {
            if let Some(reason) = self.check_candidate(step, block)? {
                warn!(
                    step = %step_ref,
                    run_id = %block.link.run_id,
                    key_id = %block.signature.key_id,
                    ?reason,
                    "discarding link"
                );
                self.violations.push(Violation::LinkDiscarded {
                    step: step_ref.clone(),
                    run_id: block.link.run_id.clone(),
                    key_id: block.signature.key_id.clone(),
                    reason,
                });
                continue;
            }

            let content = StepArtifacts::new(
                block.link.materials.iter().cloned().collect(),
                block.link.products.iter().cloned().collect(),
            );
            groups
                .entry(content)
                .or_default()
                .insert(block.signature.key_id.clone());
        }

        Ok(groups)
    }

    /// Why a candidate link cannot count, if it cannot.
    fn check_candidate(&self, step: &Step, block: &LinkMetaBlock) -> Result<Option<DiscardReason>, VerifyError> {
        if block.supply_chain_id != self.supply_chain_id {
            return Ok(Some(DiscardReason::WrongSupplyChain));
        }
        if !block.link.duplicate_artifacts().is_empty() {
            return Ok(Some(DiscardReason::DuplicateArtifacts));
        }

        let signature = &block.signature;
        let public_key = match self.keys.get(&signature.key_id) {
            Some(key) if step.is_authorized(&signature.key_id) => key,
            _ => return Ok(Some(DiscardReason::UnauthorizedSigner)),
        };

        match self.signatures.is_valid(&block.link, signature, public_key) {
            Ok(true) => Ok(None),
            Ok(false) => Ok(Some(DiscardReason::InvalidSignature)),
            Err(crate::crypto::SignError::Crypto(e)) => {
                debug!(key_id = %signature.key_id, error = %e, "link signature unusable");
                Ok(Some(DiscardReason::UnusableSignature))
            }
            Err(crate::crypto::SignError::Canonical(e)) => Err(VerifyError::Canonical(e)),
        }
    }

    /// Signer count of the best-supported content, for diagnostics only.
    fn best_signer_count(
        &mut self,
        step_ref: &StepRef,
        step: &Step,
        links: &[LinkMetaBlock],
    ) -> Result<usize, VerifyError> {
        // Re-grouping would record the discards twice.
        let recorded = self.violations.len();
        let best = self
            .signed_groups(step_ref, step, links)?
            .values()
            .map(BTreeSet::len)
            .max()
            .unwrap_or(0);
        self.violations.truncate(recorded);
        Ok(best)
    }

    fn check_rules(
        &mut self,
        step_ref: &StepRef,
        rules: &[chainwitness_model::Rule],
        artifacts: &StepArtifacts,
        side: Side,
    ) -> bool {
        let context = ArtifactsVerificationContext::for_side(side, &artifacts.materials, &artifacts.products, &self.verified);
        let side = match side {
            Side::Materials => ArtifactSide::Materials,
            Side::Products => ArtifactSide::Products,
        };

        match verify_rules(rules, context) {
            RuleListOutcome::Explained => true,
            RuleListOutcome::RuleFailed { index, rule } => {
                warn!(step = %step_ref, %side, index, rule = %rule, "rule failed");
                self.violations.push(Violation::RuleFailed {
                    step: step_ref.clone(),
                    side,
                    index,
                    rule: rule.to_string(),
                });
                false
            }
            RuleListOutcome::Unexplained { artifacts } => {
                warn!(step = %step_ref, %side, count = artifacts.len(), "unexplained artifacts");
                self.violations.push(Violation::UnexplainedArtifacts {
                    step: step_ref.clone(),
                    side,
                    artifacts,
                });
                false
            }
        }
    }

    fn verify_end_products(&mut self, block: &LayoutMetaBlock, expected: &[Artifact]) {
        let layout = &block.layout;
        let final_artifacts = layout
            .final_step()
            .and_then(|step_ref| self.verified.get(&step_ref))
            .cloned()
            .unwrap_or_default();

        if !layout.expected_end_products.is_empty() {
            let context = ArtifactsVerificationContext::for_side(
                Side::Products,
                &final_artifacts.materials,
                &final_artifacts.products,
                &self.verified,
            );
            match verify_rules(&layout.expected_end_products, context) {
                RuleListOutcome::Explained => {}
                RuleListOutcome::RuleFailed { index, rule } => {
                    warn!(index, rule = %rule, "end product rule failed");
                    self.violations.push(Violation::EndProductRuleFailed {
                        index,
                        rule: rule.to_string(),
                    });
                }
                RuleListOutcome::Unexplained { artifacts } => {
                    warn!(count = artifacts.len(), "unexplained end products");
                    self.violations.push(Violation::EndProductsUnexplained { artifacts });
                }
            }
        }

        let expected: ArtifactSet = expected.iter().cloned().collect();
        let observed = &final_artifacts.products;
        let missing: Vec<Artifact> = expected.difference(observed).cloned().collect();
        let unexpected: Vec<Artifact> = observed.difference(&expected).cloned().collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            warn!(
                missing = missing.len(),
                unexpected = unexpected.len(),
                "end products differ from expected"
            );
            self.violations.push(Violation::EndProductMismatch { missing, unexpected });
        }
    }

    fn finish(self) -> VerificationRunResult {
        let result = VerificationRunResult::from_violations(self.violations);
        info!(
            supply_chain = %self.supply_chain_id,
            valid = result.run_is_valid,
            violations = result.violations.len(),
            "verification finished"
        );
        result
    }
}

fn candidates<'l>(step_ref: &'l StepRef, links: &'l [LinkMetaBlock]) -> impl Iterator<Item = &'l LinkMetaBlock> {
    links.iter().filter(move |block| {
        block.link.layout_segment_name == step_ref.segment_name && block.link.step_name == step_ref.step_name
    })
}
