//! Rule semantics.
//!
//! Each rule either succeeds and consumes what it explains, or fails and
//! leaves the pool untouched. Membership tests compare uri and hash unless
//! a rule is explicitly about the same path changing content.

use chainwitness_model::{Artifact, MatchRule, Rule, StepRef};
use tracing::{debug, warn};

use crate::context::{ArtifactSet, ArtifactsVerificationContext};
use crate::pattern::{normalize_prefix, PathPattern};

/// Result of evaluating one rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleListOutcome {
    /// Every rule passed and nothing was left over
    Explained,
    /// The rule at `index` failed; later rules were not evaluated
    RuleFailed { index: usize, rule: Rule },
    /// All rules passed but these artifacts were never accounted for
    Unexplained { artifacts: Vec<Artifact> },
}

impl RuleListOutcome {
    pub fn is_explained(&self) -> bool {
        matches!(self, Self::Explained)
    }
}

/// Evaluate `rules` in order against `context`, stopping at the first rule
/// that fails.
pub fn verify_rules(rules: &[Rule], mut context: ArtifactsVerificationContext<'_>) -> RuleListOutcome {
    for (index, rule) in rules.iter().enumerate() {
        if !verify_rule(rule, &mut context) {
            debug!(index, rule = %rule, "rule failed");
            return RuleListOutcome::RuleFailed {
                index,
                rule: rule.clone(),
            };
        }
    }

    let remaining = context.into_unexplained();
    if remaining.is_empty() {
        RuleListOutcome::Explained
    } else {
        debug!(count = remaining.len(), "artifacts left unexplained");
        RuleListOutcome::Unexplained {
            artifacts: remaining.into_iter().collect(),
        }
    }
}

/// Evaluate a single rule, consuming what it explains on success.
pub fn verify_rule(rule: &Rule, context: &mut ArtifactsVerificationContext<'_>) -> bool {
    let pattern = match PathPattern::for_rule(rule) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "rule pattern does not compile");
            return false;
        }
    };

    match rule {
        Rule::Match(m) => verify_match(m, &pattern, context),
        Rule::Create(_) => verify_create(&pattern, context),
        Rule::Delete(_) => verify_delete(&pattern, context),
        Rule::Modify(_) => verify_modify(&pattern, context),
        Rule::CreateOrModify(_) => verify_create_or_modify(&pattern, context),
        Rule::Allow(_) => {
            let filtered = context.filtered_artifacts(&pattern);
            context.consume(&filtered);
            true
        }
        Rule::Disallow(_) => context.filtered_artifacts(&pattern).is_empty(),
        Rule::Require(_) => {
            let filtered = context.filtered_artifacts(&pattern);
            if filtered.is_empty() {
                return false;
            }
            context.consume(&filtered);
            true
        }
    }
}

fn verify_create(pattern: &PathPattern, context: &mut ArtifactsVerificationContext<'_>) -> bool {
    let filtered = context.filtered_artifacts(pattern);
    let created = filtered
        .iter()
        .all(|a| context.products().contains(a) && !context.materials().contains(a));
    if created {
        context.consume(&filtered);
    }
    created
}

fn verify_delete(pattern: &PathPattern, context: &mut ArtifactsVerificationContext<'_>) -> bool {
    let filtered = context.filtered_artifacts(pattern);
    let deleted = filtered
        .iter()
        .all(|a| context.materials().contains(a) && !context.products().contains(a));
    if deleted {
        context.consume(&filtered);
    }
    deleted
}

fn find_by_uri<'s>(set: &'s ArtifactSet, uri: &str) -> Option<&'s Artifact> {
    set.iter().find(|a| a.uri == uri)
}

/// Whether the path exists on both sides and every material/product pair
/// at that path differs in content.
fn path_modified(context: &ArtifactsVerificationContext<'_>, uri: &str) -> bool {
    let materials: Vec<_> = context.materials().iter().filter(|a| a.uri == uri).collect();
    let products: Vec<_> = context.products().iter().filter(|a| a.uri == uri).collect();
    !materials.is_empty()
        && !products.is_empty()
        && materials
            .iter()
            .all(|m| products.iter().all(|p| m.hash != p.hash))
}

fn verify_modify(pattern: &PathPattern, context: &mut ArtifactsVerificationContext<'_>) -> bool {
    let filtered = context.filtered_artifacts(pattern);
    if !filtered.iter().all(|a| path_modified(context, &a.uri)) {
        return false;
    }

    // Both sides of every modified path count as explained.
    let mut explained = filtered.clone();
    for a in &filtered {
        explained.extend(context.materials().iter().filter(|m| m.uri == a.uri).cloned());
        explained.extend(context.products().iter().filter(|p| p.uri == a.uri).cloned());
    }
    context.consume(&explained);
    true
}

fn verify_create_or_modify(
    pattern: &PathPattern,
    context: &mut ArtifactsVerificationContext<'_>,
) -> bool {
    let filtered = context.filtered_artifacts(pattern);
    let explained = filtered.iter().all(|a| {
        if context.materials().contains(a) && context.products().contains(a) {
            // unchanged
            return false;
        }
        let has_product = find_by_uri(context.products(), &a.uri).is_some();
        let has_material = find_by_uri(context.materials(), &a.uri).is_some();
        match (has_material, has_product) {
            (false, true) => true,
            (true, true) => path_modified(context, &a.uri),
            // A material with no product at its path was deleted, which is
            // neither a creation nor a modification.
            (_, false) => false,
        }
    });
    if explained {
        context.consume(&filtered);
    }
    explained
}

fn verify_match(
    rule: &MatchRule,
    pattern: &PathPattern,
    context: &mut ArtifactsVerificationContext<'_>,
) -> bool {
    let destination_ref = StepRef::new(&rule.destination_segment_name, &rule.destination_step_name);
    let Some(destination) = context.verified_steps().get(&destination_ref) else {
        debug!(destination = %destination_ref, "MATCH destination has not been verified");
        return false;
    };
    let destination_set = destination.side(rule.destination_type);

    let source_prefix = normalize_prefix(rule.source_path_prefix.as_deref());
    let destination_prefix = normalize_prefix(rule.destination_path_prefix.as_deref());

    let filtered = context.filtered_under_prefix(rule.source_path_prefix.as_deref(), pattern);
    let matched = filtered.iter().all(|a| {
        let relative = a.uri.strip_prefix(source_prefix.as_str()).unwrap_or(&a.uri);
        let expected = Artifact::new(format!("{destination_prefix}{relative}"), a.hash.clone());
        destination_set.contains(&expected)
    });
    if matched {
        context.consume(&filtered);
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Side, StepArtifacts, VerifiedSteps};
    use chainwitness_model::{DestinationType, MatchRule};

    fn set(items: &[(&str, &str)]) -> ArtifactSet {
        items.iter().map(|(u, h)| Artifact::new(*u, *h)).collect()
    }

    fn products_ctx<'a>(
        materials: &'a ArtifactSet,
        products: &'a ArtifactSet,
        steps: &'a VerifiedSteps,
    ) -> ArtifactsVerificationContext<'a> {
        ArtifactsVerificationContext::for_side(Side::Products, materials, products, steps)
    }

    #[test]
    fn test_create_vacuous_on_empty_filter() {
        let materials = set(&[("a.txt", "1")]);
        let products = set(&[("a.txt", "1")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);

        assert!(verify_rule(&Rule::create("*.jar"), &mut ctx));
        assert_eq!(ctx.unexplained(), &products);
    }

    #[test]
    fn test_create_rejects_preexisting_artifact() {
        let a = set(&[("a.txt", "1")]);
        let steps = VerifiedSteps::new();
        let mut ctx = ArtifactsVerificationContext::with_pool(&a, &a, a.clone(), &steps);

        assert!(!verify_rule(&Rule::create("*"), &mut ctx));
        assert_eq!(ctx.unexplained(), &a);
    }

    #[test]
    fn test_create_accepts_new_product() {
        let materials = set(&[("src.c", "1")]);
        let products = set(&[("app.bin", "2")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);

        assert!(verify_rule(&Rule::create("*.bin"), &mut ctx));
        assert!(ctx.unexplained().is_empty());
    }

    #[test]
    fn test_delete_is_dual_of_create() {
        let materials = set(&[("tmp.o", "1"), ("keep.c", "2")]);
        let products = set(&[("keep.c", "2")]);
        let steps = VerifiedSteps::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        assert!(verify_rule(&Rule::delete("*.o"), &mut ctx));
        assert!(!verify_rule(&Rule::delete("*.c"), &mut ctx));
        assert_eq!(ctx.unexplained(), &set(&[("keep.c", "2")]));
    }

    #[test]
    fn test_modify_requires_changed_hash() {
        let materials = set(&[("conf.ini", "1"), ("same.txt", "5")]);
        let products = set(&[("conf.ini", "2"), ("same.txt", "5")]);
        let steps = VerifiedSteps::new();

        let mut ctx = products_ctx(&materials, &products, &steps);
        assert!(verify_rule(&Rule::modify("*.ini"), &mut ctx));
        assert_eq!(ctx.unexplained(), &set(&[("same.txt", "5")]));

        let mut ctx = products_ctx(&materials, &products, &steps);
        assert!(!verify_rule(&Rule::modify("*.txt"), &mut ctx));
        assert_eq!(ctx.unexplained().len(), 2);
    }

    #[test]
    fn test_modify_fails_for_created_file() {
        let materials = ArtifactSet::new();
        let products = set(&[("new.ini", "1")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);
        assert!(!verify_rule(&Rule::modify("*.ini"), &mut ctx));
    }

    #[test]
    fn test_create_or_modify_mixed_batch() {
        let materials = set(&[("u1", "h1")]);
        let products = set(&[("u1", "h1-new"), ("u2", "h2")]);
        let pool = set(&[("u1", "h1"), ("u1", "h1-new"), ("u2", "h2")]);
        let steps = VerifiedSteps::new();
        let mut ctx = ArtifactsVerificationContext::with_pool(&materials, &products, pool, &steps);

        assert!(verify_rule(&Rule::create_or_modify("*"), &mut ctx));
        assert!(ctx.unexplained().is_empty());
    }

    #[test]
    fn test_create_or_modify_rejects_unchanged() {
        let materials = set(&[("u1", "h1")]);
        let products = set(&[("u1", "h1"), ("u2", "h2")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);

        assert!(!verify_rule(&Rule::create_or_modify("*"), &mut ctx));
        assert_eq!(ctx.unexplained(), &products);
    }

    #[test]
    fn test_create_or_modify_rejects_deletion_shape() {
        let materials = set(&[("gone", "h1")]);
        let products = ArtifactSet::new();
        let steps = VerifiedSteps::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        assert!(!verify_rule(&Rule::create_or_modify("*"), &mut ctx));
    }

    #[test]
    fn test_allow_consumes_and_disallow_never_does() {
        let materials = ArtifactSet::new();
        let products = set(&[("a.log", "1"), ("b.bin", "2")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);

        assert!(!verify_rule(&Rule::disallow("*.log"), &mut ctx));
        assert!(verify_rule(&Rule::allow("*.log"), &mut ctx));
        assert!(verify_rule(&Rule::disallow("*.log"), &mut ctx));
        assert_eq!(ctx.unexplained(), &set(&[("b.bin", "2")]));
    }

    #[test]
    fn test_require_exact_uri() {
        let materials = ArtifactSet::new();
        let products = set(&[("dist/app.tar", "1")]);
        let steps = VerifiedSteps::new();
        let mut ctx = products_ctx(&materials, &products, &steps);

        assert!(!verify_rule(&Rule::require("dist/*.tar"), &mut ctx));
        assert!(verify_rule(&Rule::require("dist/app.tar"), &mut ctx));
        assert!(ctx.unexplained().is_empty());
        // already explained, so a second REQUIRE finds nothing
        assert!(!verify_rule(&Rule::require("dist/app.tar"), &mut ctx));
    }

    fn build_step() -> VerifiedSteps {
        let mut steps = VerifiedSteps::new();
        steps.insert(
            StepRef::new("ci", "build"),
            StepArtifacts::new(set(&[("src/main.c", "s1")]), set(&[("out/app.jar", "j1")])),
        );
        steps
    }

    #[test]
    fn test_match_against_destination_products() {
        let steps = build_step();
        let materials = set(&[("app.jar", "j1")]);
        let products = ArtifactSet::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        let rule = Rule::Match(MatchRule {
            pattern: "*.jar".into(),
            source_path_prefix: None,
            destination_type: DestinationType::Products,
            destination_path_prefix: Some("out".into()),
            destination_segment_name: "ci".into(),
            destination_step_name: "build".into(),
        });
        assert!(verify_rule(&rule, &mut ctx));
        assert!(ctx.unexplained().is_empty());
    }

    #[test]
    fn test_match_strips_source_prefix_and_adds_destination_prefix() {
        let steps = build_step();
        let materials = set(&[("vendor/app.jar", "j1"), ("app.jar", "j1")]);
        let products = ArtifactSet::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        let rule = Rule::Match(MatchRule {
            pattern: "*.jar".into(),
            source_path_prefix: Some("vendor".into()),
            destination_type: DestinationType::Products,
            destination_path_prefix: Some("out/".into()),
            destination_segment_name: "ci".into(),
            destination_step_name: "build".into(),
        });
        assert!(verify_rule(&rule, &mut ctx));
        // only the artifact under the source prefix is explained
        assert_eq!(ctx.unexplained(), &set(&[("app.jar", "j1")]));

        let wrong_hash = set(&[("vendor/app.jar", "j2")]);
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &wrong_hash, &products, &steps);
        assert!(!verify_rule(&rule, &mut ctx));
        assert_eq!(ctx.unexplained(), &wrong_hash);
    }

    #[test]
    fn test_match_rejects_hash_mismatch() {
        let steps = build_step();
        let materials = set(&[("out/app.jar", "tampered")]);
        let products = ArtifactSet::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        let rule = Rule::match_in("**/*.jar", DestinationType::Products, "ci", "build");
        assert!(!verify_rule(&rule, &mut ctx));
        assert_eq!(ctx.unexplained(), &materials);
    }

    #[test]
    fn test_match_unknown_destination_fails() {
        let steps = VerifiedSteps::new();
        let materials = set(&[("app.jar", "j1")]);
        let products = ArtifactSet::new();
        let mut ctx = ArtifactsVerificationContext::for_side(Side::Materials, &materials, &products, &steps);

        let rule = Rule::match_in("*.jar", DestinationType::Products, "ci", "build");
        assert!(!verify_rule(&rule, &mut ctx));
    }

    #[test]
    fn test_list_short_circuits_on_failure() {
        let materials = ArtifactSet::new();
        let products = set(&[("a.log", "1")]);
        let steps = VerifiedSteps::new();

        let outcome = verify_rules(
            &[Rule::disallow("*.log"), Rule::allow("**")],
            products_ctx(&materials, &products, &steps),
        );
        assert_eq!(
            outcome,
            RuleListOutcome::RuleFailed {
                index: 0,
                rule: Rule::disallow("*.log")
            }
        );
    }

    #[test]
    fn test_disallow_catch_all_closes_list() {
        let materials = ArtifactSet::new();
        let products = set(&[("app.bin", "1"), ("debug.log", "2")]);
        let steps = VerifiedSteps::new();

        let strict = [Rule::create("*.bin"), Rule::disallow("**")];
        let outcome = verify_rules(&strict, products_ctx(&materials, &products, &steps));
        assert!(matches!(outcome, RuleListOutcome::RuleFailed { index: 1, .. }));

        let lenient = [Rule::create("*.bin"), Rule::allow("*.log"), Rule::disallow("**")];
        let outcome = verify_rules(&lenient, products_ctx(&materials, &products, &steps));
        assert!(outcome.is_explained());
    }

    #[test]
    fn test_leftover_artifacts_reported() {
        let materials = ArtifactSet::new();
        let products = set(&[("app.bin", "1"), ("extra.txt", "2")]);
        let steps = VerifiedSteps::new();

        let outcome = verify_rules(&[Rule::create("*.bin")], products_ctx(&materials, &products, &steps));
        assert_eq!(
            outcome,
            RuleListOutcome::Unexplained {
                artifacts: vec![Artifact::new("extra.txt", "2")]
            }
        );
    }

    #[test]
    fn test_empty_list_requires_empty_pool() {
        let empty = ArtifactSet::new();
        let steps = VerifiedSteps::new();
        assert!(verify_rules(&[], products_ctx(&empty, &empty, &steps)).is_explained());
    }
}
