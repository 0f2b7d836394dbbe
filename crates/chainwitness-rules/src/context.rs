//! Working state for one rule-list evaluation.

use chainwitness_model::{Artifact, DestinationType, StepRef};
use std::collections::{BTreeMap, BTreeSet};

use crate::pattern::{normalize_prefix, PathPattern};

/// A deduplicated, uri-ordered artifact set.
pub type ArtifactSet = BTreeSet<Artifact>;

/// Which artifact list a rule list explains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Materials,
    Products,
}

/// Materials and products a step was verified with.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct StepArtifacts {
    pub materials: ArtifactSet,
    pub products: ArtifactSet,
}

impl StepArtifacts {
    pub fn new(materials: ArtifactSet, products: ArtifactSet) -> Self {
        Self { materials, products }
    }

    pub fn side(&self, destination: DestinationType) -> &ArtifactSet {
        match destination {
            DestinationType::Materials => &self.materials,
            DestinationType::Products => &self.products,
        }
    }
}

/// Steps that already passed verification, available to MATCH rules.
pub type VerifiedSteps = BTreeMap<StepRef, StepArtifacts>;

/// State threaded through the rules of one list.
///
/// `materials` and `products` are the step's full artifact sets and never
/// change. `unexplained` starts as one of them and shrinks as rules consume
/// what they explain.
#[derive(Debug)]
pub struct ArtifactsVerificationContext<'a> {
    materials: &'a ArtifactSet,
    products: &'a ArtifactSet,
    unexplained: ArtifactSet,
    verified_steps: &'a VerifiedSteps,
}

impl<'a> ArtifactsVerificationContext<'a> {
    /// Context whose pool starts as the full `side` set.
    pub fn for_side(
        side: Side,
        materials: &'a ArtifactSet,
        products: &'a ArtifactSet,
        verified_steps: &'a VerifiedSteps,
    ) -> Self {
        let unexplained = match side {
            Side::Materials => materials.clone(),
            Side::Products => products.clone(),
        };
        Self::with_pool(materials, products, unexplained, verified_steps)
    }

    /// Context with an explicit starting pool.
    pub fn with_pool(
        materials: &'a ArtifactSet,
        products: &'a ArtifactSet,
        unexplained: ArtifactSet,
        verified_steps: &'a VerifiedSteps,
    ) -> Self {
        Self {
            materials,
            products,
            unexplained,
            verified_steps,
        }
    }

    pub fn materials(&self) -> &'a ArtifactSet {
        self.materials
    }

    pub fn products(&self) -> &'a ArtifactSet {
        self.products
    }

    pub fn unexplained(&self) -> &ArtifactSet {
        &self.unexplained
    }

    pub fn verified_steps(&self) -> &'a VerifiedSteps {
        self.verified_steps
    }

    /// Unexplained artifacts whose uri matches `pattern`.
    pub fn filtered_artifacts(&self, pattern: &PathPattern) -> ArtifactSet {
        self.unexplained
            .iter()
            .filter(|a| pattern.is_match(&a.uri))
            .cloned()
            .collect()
    }

    /// Unexplained artifacts under `prefix` whose remaining path matches
    /// `pattern`.
    pub fn filtered_under_prefix(&self, prefix: Option<&str>, pattern: &PathPattern) -> ArtifactSet {
        let prefix = normalize_prefix(prefix);
        self.unexplained
            .iter()
            .filter(|a| {
                a.uri
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| pattern.is_match(rest))
            })
            .cloned()
            .collect()
    }

    /// Mark `explained` as accounted for. Artifacts not in the pool are
    /// ignored.
    pub fn consume<'b, I>(&mut self, explained: I)
    where
        I: IntoIterator<Item = &'b Artifact>,
    {
        for artifact in explained {
            self.unexplained.remove(artifact);
        }
    }

    pub fn into_unexplained(self) -> ArtifactSet {
        self.unexplained
    }
}
