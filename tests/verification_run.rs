//! End-to-end verification runs
//!
//! A two-step chain: `build` compiles sources into a jar, `deploy` ships
//! the jar it received from `build`.

use chainwitness::model::{
    Artifact, DestinationType, KeyAlgorithm, Layout, LayoutMetaBlock, LayoutSegment, Link, LinkMetaBlock, Rule, Step,
};
use chainwitness::verification::{ArtifactSide, DiscardReason, Violation};
use chainwitness::{create_release, AlgorithmRegistry, KeyPair, Signer, VerificationRequest, Verifier, VerifyError};

const PASS: &str = "correct horse";
const SUPPLY_CHAIN: &str = "shop-backend";
const JAR_HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

struct Chain {
    registry: AlgorithmRegistry,
    owner: KeyPair,
    builders: Vec<KeyPair>,
    deployer: KeyPair,
}

impl Chain {
    fn new(builders: usize) -> Self {
        let registry = AlgorithmRegistry::with_defaults();
        let generate = |registry: &AlgorithmRegistry| KeyPair::generate(registry, KeyAlgorithm::Ec, PASS, 1_000).unwrap();
        Self {
            owner: generate(&registry),
            builders: (0..builders).map(|_| generate(&registry)).collect(),
            deployer: generate(&registry),
            registry,
        }
    }

    fn build_step(&self, threshold: u32) -> Step {
        let mut step = Step::new("build");
        step.authorized_key_ids = self.builders.iter().map(|k| k.public_key.key_id.clone()).collect();
        step.required_number_of_signatures = threshold;
        step.expected_material_rules = vec![Rule::allow("src/**"), Rule::disallow("**")];
        step.expected_product_rules = vec![Rule::create("*.jar"), Rule::disallow("**")];
        step
    }

    fn deploy_step(&self) -> Step {
        let mut step = Step::new("deploy");
        step.authorized_key_ids = vec![self.deployer.public_key.key_id.clone()];
        step.expected_material_rules = vec![
            Rule::match_in("*.jar", DestinationType::Products, "ci", "build"),
            Rule::disallow("**"),
        ];
        step.expected_product_rules = vec![Rule::allow("*.jar"), Rule::disallow("**")];
        step
    }

    fn layout(&self, threshold: u32) -> LayoutMetaBlock {
        let mut keys = vec![self.owner.public_key.clone(), self.deployer.public_key.clone()];
        keys.extend(self.builders.iter().map(|k| k.public_key.clone()));

        let layout = Layout {
            keys,
            authorized_key_ids: vec![self.owner.public_key.key_id.clone()],
            layout_segments: vec![LayoutSegment {
                name: "ci".into(),
                steps: vec![self.build_step(threshold), self.deploy_step()],
            }],
            expected_end_products: vec![
                Rule::match_in("*.jar", DestinationType::Products, "ci", "build"),
                Rule::disallow("**"),
            ],
        };
        let signature = Signer::new(&self.registry)
            .sign(&self.owner.private_key, PASS, &layout)
            .unwrap();
        LayoutMetaBlock {
            supply_chain_id: SUPPLY_CHAIN.into(),
            layout,
            signatures: vec![signature],
        }
    }

    fn sign(&self, key: &KeyPair, link: Link) -> LinkMetaBlock {
        let signature = Signer::new(&self.registry).sign(&key.private_key, PASS, &link).unwrap();
        LinkMetaBlock {
            supply_chain_id: SUPPLY_CHAIN.into(),
            link,
            signature,
        }
    }

    fn verify(&self, layout: &LayoutMetaBlock, links: &[LinkMetaBlock], expected: &[Artifact]) -> chainwitness::VerificationRunResult {
        Verifier::new(&self.registry)
            .verify_run(&VerificationRequest::new(layout, links, expected))
            .unwrap()
    }
}

fn jar() -> Artifact {
    Artifact::new("app.jar", JAR_HASH)
}

fn build_link(run_id: &str) -> Link {
    Link::new("ci", "build", run_id)
        .with_command(vec!["mvn".into(), "package".into()])
        .with_materials(vec![
            Artifact::new("src/Main.java", "aa11"),
            Artifact::new("src/util/Strings.java", "bb22"),
        ])
        .with_products(vec![jar()])
}

fn deploy_link(jar: Artifact) -> Link {
    Link::new("ci", "deploy", "deploy-1")
        .with_materials(vec![jar.clone()])
        .with_products(vec![jar])
}

#[test]
fn test_two_step_chain_verifies() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let links = vec![
        chain.sign(&chain.builders[0], build_link("build-1")),
        chain.sign(&chain.deployer, deploy_link(jar())),
    ];

    let result = chain.verify(&layout, &links, &[jar()]);
    assert!(result.run_is_valid, "{:?}", result.violations);
    assert!(result.violations.is_empty());
}

#[test]
fn test_tampered_jar_in_deploy_materials_fails() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let tampered = Artifact::new("app.jar", "0000");
    let links = vec![
        chain.sign(&chain.builders[0], build_link("build-1")),
        chain.sign(&chain.deployer, deploy_link(tampered.clone())),
    ];

    let result = chain.verify(&layout, &links, &[tampered]);
    assert!(!result.run_is_valid);
    assert!(result.violations.iter().any(|v| matches!(
        v,
        Violation::RuleFailed {
            side: ArtifactSide::Materials,
            index: 0,
            ..
        }
    )));
}

#[test]
fn test_link_edited_after_signing_is_discarded() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let mut deploy = chain.sign(&chain.deployer, deploy_link(jar()));
    deploy.link.products.push(Artifact::new("backdoor.jar", "ee"));
    let links = vec![chain.sign(&chain.builders[0], build_link("build-1")), deploy];

    let result = chain.verify(&layout, &links, &[jar()]);
    assert!(!result.run_is_valid);
    assert!(result.violations.iter().any(|v| matches!(
        v,
        Violation::LinkDiscarded {
            reason: DiscardReason::InvalidSignature,
            ..
        }
    )));
    assert!(result
        .violations
        .iter()
        .any(|v| matches!(v, Violation::ThresholdNotMet { signers: 0, .. })));
}

#[test]
fn test_unexpected_build_output_caught_by_disallow() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let build = build_link("build-1").with_products(vec![jar(), Artifact::new("debug.log", "cc")]);
    let links = vec![
        chain.sign(&chain.builders[0], build),
        chain.sign(&chain.deployer, deploy_link(jar())),
    ];

    let result = chain.verify(&layout, &links, &[jar()]);
    assert!(!result.run_is_valid);
    assert!(matches!(
        &result.violations[0],
        Violation::RuleFailed { side: ArtifactSide::Products, index: 1, rule, .. } if rule.starts_with("DISALLOW")
    ));
}

#[test]
fn test_two_of_three_threshold() {
    let chain = Chain::new(3);
    let layout = chain.layout(2);
    let deploy = chain.sign(&chain.deployer, deploy_link(jar()));

    let one_signer = vec![chain.sign(&chain.builders[0], build_link("b-1")), deploy.clone()];
    let result = chain.verify(&layout, &one_signer, &[jar()]);
    assert!(!result.run_is_valid);
    assert!(matches!(
        result.violations[0],
        Violation::ThresholdNotMet {
            required: 2,
            signers: 1,
            ..
        }
    ));

    // Independent rebuilds of the same content by two builders.
    let two_signers = vec![
        chain.sign(&chain.builders[0], build_link("b-1")),
        chain.sign(&chain.builders[2], build_link("b-2")),
        deploy,
    ];
    let result = chain.verify(&layout, &two_signers, &[jar()]);
    assert!(result.run_is_valid, "{:?}", result.violations);
}

#[test]
fn test_caller_expectation_must_match_end_products() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let links = vec![
        chain.sign(&chain.builders[0], build_link("build-1")),
        chain.sign(&chain.deployer, deploy_link(jar())),
    ];

    let result = chain.verify(&layout, &links, &[jar(), Artifact::new("extra.jar", "12")]);
    assert!(!result.run_is_valid);
    assert!(matches!(
        &result.violations[..],
        [Violation::EndProductMismatch { missing, unexpected }]
            if missing.len() == 1 && unexpected.is_empty()
    ));
}

#[test]
fn test_layout_signed_by_non_owner_is_fatal() {
    let chain = Chain::new(1);
    let mut layout = chain.layout(1);
    layout.signatures = vec![Signer::new(&chain.registry)
        .sign(&chain.deployer.private_key, PASS, &layout.layout)
        .unwrap()];

    let err = Verifier::new(&chain.registry)
        .verify_run(&VerificationRequest::new(&layout, &[], &[]))
        .unwrap_err();
    assert!(matches!(err, VerifyError::InvalidLayoutSignature(_)));
}

#[test]
fn test_release_of_verified_chain() {
    let chain = Chain::new(1);
    let layout = chain.layout(1);
    let links = vec![
        chain.sign(&chain.builders[0], build_link("build-1")),
        chain.sign(&chain.deployer, deploy_link(jar())),
    ];

    let release = create_release(&Verifier::new(&chain.registry), &layout, &links, &[vec![jar()], vec![jar()]]).unwrap();
    assert!(release.release_is_valid);
    assert_eq!(release.supply_chain_id, SUPPLY_CHAIN);
    assert_eq!(release.artifacts, vec![jar()]);
    assert_eq!(release.release_digest.len(), 64);
}
