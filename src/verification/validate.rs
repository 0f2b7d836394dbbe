//! Layout checks that run before any step is evaluated.

use std::collections::BTreeSet;

use chainwitness_model::{ApprovalConfiguration, Layout, LayoutMetaBlock, Rule, StepRef};
use chainwitness_rules::validate_rule;
use tracing::{debug, warn};

use super::error::VerifyError;
use crate::crypto::{KeyRing, SignatureVerifier};

/// Check that the layout is well formed.
pub fn validate_layout(layout: &Layout) -> Result<(), VerifyError> {
    if layout.layout_segments.is_empty() {
        return Err(malformed("layout has no segments"));
    }

    let key_ids: BTreeSet<&str> = layout.keys.iter().map(|k| k.key_id.as_str()).collect();
    if key_ids.len() != layout.keys.len() {
        return Err(malformed("layout lists the same key twice"));
    }

    let mut segment_names = BTreeSet::new();
    for segment in &layout.layout_segments {
        if !segment_names.insert(segment.name.as_str()) {
            return Err(malformed(format!("duplicate segment {:?}", segment.name)));
        }
        if segment.steps.is_empty() {
            return Err(malformed(format!("segment {:?} has no steps", segment.name)));
        }

        let mut step_names = BTreeSet::new();
        for step in &segment.steps {
            let step_ref = StepRef::new(&segment.name, &step.name);
            if !step_names.insert(step.name.as_str()) {
                return Err(malformed(format!("duplicate step {step_ref}")));
            }

            let authorized: BTreeSet<&str> = step.authorized_key_ids.iter().map(String::as_str).collect();
            let required = step.required_number_of_signatures as usize;
            if required == 0 || required > authorized.len() {
                return Err(malformed(format!(
                    "{step_ref}: requires {required} signatures from {} authorized keys",
                    authorized.len()
                )));
            }
            if let Some(missing) = authorized.iter().find(|id| !key_ids.contains(*id)) {
                return Err(malformed(format!("{step_ref}: authorized key {missing} is not in the layout")));
            }

            for rule in step
                .expected_material_rules
                .iter()
                .chain(&step.expected_product_rules)
            {
                check_rule(layout, rule).map_err(|reason| malformed(format!("{step_ref}: {reason}")))?;
            }
        }
    }

    for rule in &layout.expected_end_products {
        check_rule(layout, rule).map_err(|reason| malformed(format!("end products: {reason}")))?;
    }

    if let Some(missing) = layout
        .authorized_key_ids
        .iter()
        .find(|id| !key_ids.contains(id.as_str()))
    {
        return Err(malformed(format!("layout signer {missing} is not in the layout keys")));
    }

    Ok(())
}

fn check_rule(layout: &Layout, rule: &Rule) -> Result<(), String> {
    validate_rule(rule).map_err(|e| e.to_string())?;
    if let Rule::Match(m) = rule {
        let destination = StepRef::new(&m.destination_segment_name, &m.destination_step_name);
        if layout.step(&destination).is_none() {
            return Err(format!("MATCH destination {destination} does not exist"));
        }
    }
    Ok(())
}

/// Require at least one signature on the layout, each from an authorized
/// layout key and each valid.
pub fn verify_layout_signatures(
    block: &LayoutMetaBlock,
    keys: &KeyRing,
    verifier: &SignatureVerifier<'_>,
) -> Result<(), VerifyError> {
    let layout = &block.layout;
    if block.signatures.is_empty() {
        return Err(VerifyError::InvalidLayoutSignature("layout is not signed".to_string()));
    }

    for signature in &block.signatures {
        if !layout.authorized_key_ids.contains(&signature.key_id) {
            warn!(key_id = %signature.key_id, "layout signed by unauthorized key");
            return Err(VerifyError::InvalidLayoutSignature(format!(
                "key {} may not sign the layout",
                signature.key_id
            )));
        }
        let Some(public_key) = keys.get(&signature.key_id) else {
            return Err(VerifyError::InvalidLayoutSignature(format!(
                "key {} is not in the layout",
                signature.key_id
            )));
        };
        if !verifier.is_valid(layout, signature, public_key)? {
            warn!(key_id = %signature.key_id, "layout signature does not verify");
            return Err(VerifyError::InvalidLayoutSignature(format!(
                "signature by {} does not match the layout",
                signature.key_id
            )));
        }
        debug!(key_id = %signature.key_id, "layout signature verified");
    }

    Ok(())
}

/// Every approval must name an existing step and keys authorized for it.
pub fn validate_approvals(layout: &Layout, approvals: &[ApprovalConfiguration]) -> Result<(), VerifyError> {
    for approval in approvals {
        let step_ref = approval.step_ref();
        let Some(step) = layout.step(&step_ref) else {
            return Err(VerifyError::InvalidApproval(format!("no step {step_ref}")));
        };
        if let Some(key_id) = approval.required_key_ids.iter().find(|id| !step.is_authorized(id)) {
            return Err(VerifyError::InvalidApproval(format!(
                "{step_ref}: key {key_id} is not authorized for the step"
            )));
        }
    }
    Ok(())
}

fn malformed(reason: impl Into<String>) -> VerifyError {
    VerifyError::MalformedLayout(reason.into())
}
