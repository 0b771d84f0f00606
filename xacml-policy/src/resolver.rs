//! Policy references, policy providers, and the root policy evaluator.
//!
//! References come in two flavors:
//! - **Static**: resolved to a concrete `Arc` target at load time. Cycles
//!   are impossible by construction (a reference can only point at an
//!   already-built tree) and nesting depth is validated when the root
//!   evaluator is assembled.
//! - **Dynamic**: resolved through a [`PolicyProvider`] at evaluation time.
//!   The reference carries the chain of ancestor reference ids recorded at
//!   load, so cycles and depth overflows on the evaluation path fail with
//!   a processing-error Indeterminate.

use crate::policy::{Policy, PolicyChild, PolicySet};
use crate::version::{PolicyVersion, VersionConstraints};
use crate::Decidable;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;
use xacml_core::{DecisionResult, EvalError, XacmlError};
use xacml_eval::EvaluationContext;

/// A resolved policy tree: the target of a reference or the root.
#[derive(Debug, Clone)]
pub enum PolicyElement {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
}

impl Decidable for PolicyElement {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self {
            PolicyElement::Policy(p) => p.evaluate(ctx),
            PolicyElement::PolicySet(ps) => ps.evaluate(ctx),
        }
    }

    fn is_applicable_by_target(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        match self {
            PolicyElement::Policy(p) => p.is_applicable_by_target(ctx),
            PolicyElement::PolicySet(ps) => ps.is_applicable_by_target(ctx),
        }
    }
}

/// Supplies policies by id and version constraints.
///
/// Resolution must be deterministic for a given (id, constraints): when
/// multiple versions match, the highest wins.
pub trait PolicyProvider: Send + Sync {
    fn get_policy(&self, id: &str, constraints: &VersionConstraints) -> Option<Arc<Policy>>;

    fn get_policy_set(&self, id: &str, constraints: &VersionConstraints)
        -> Option<Arc<PolicySet>>;

    /// Release resources. Called from the engine's `close()` cascade.
    fn close(&self) {}
}

#[derive(Debug)]
enum RefMode {
    Static(PolicyElement),
    Dynamic {
        provider: Arc<dyn PolicyProvider>,
        is_policy_set: bool,
        /// Ancestor reference ids on the path from the root to this
        /// reference, recorded at load time
        chain: Vec<String>,
        max_depth: usize,
    },
}

impl std::fmt::Debug for dyn PolicyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PolicyProvider")
    }
}

/// A PolicyIdReference / PolicySetIdReference.
#[derive(Debug)]
pub struct PolicyRef {
    id: String,
    constraints: VersionConstraints,
    mode: RefMode,
}

impl PolicyRef {
    /// Reference resolved at load time.
    pub fn fixed(id: impl Into<String>, target: PolicyElement) -> Self {
        Self {
            id: id.into(),
            constraints: VersionConstraints::default(),
            mode: RefMode::Static(target),
        }
    }

    /// Reference resolved per request through a provider.
    pub fn dynamic(
        id: impl Into<String>,
        constraints: VersionConstraints,
        is_policy_set: bool,
        provider: Arc<dyn PolicyProvider>,
        ancestor_chain: Vec<String>,
        max_depth: usize,
    ) -> Self {
        Self {
            id: id.into(),
            constraints,
            mode: RefMode::Dynamic {
                provider,
                is_policy_set,
                chain: ancestor_chain,
                max_depth,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn resolve(&self) -> Result<PolicyElement, EvalError> {
        match &self.mode {
            RefMode::Static(target) => Ok(target.clone()),
            RefMode::Dynamic {
                provider,
                is_policy_set,
                chain,
                max_depth,
            } => {
                if chain.iter().any(|ancestor| ancestor == &self.id) {
                    return Err(EvalError::processing(format!(
                        "policy reference cycle: {} -> {}",
                        chain.join(" -> "),
                        self.id
                    )));
                }
                if chain.len() + 1 > *max_depth {
                    return Err(EvalError::processing(format!(
                        "policy reference depth {} exceeds limit {max_depth}",
                        chain.len() + 1
                    )));
                }
                let resolved = if *is_policy_set {
                    provider
                        .get_policy_set(&self.id, &self.constraints)
                        .map(PolicyElement::PolicySet)
                } else {
                    provider
                        .get_policy(&self.id, &self.constraints)
                        .map(PolicyElement::Policy)
                };
                debug!(reference = %self.id, resolved = resolved.is_some(), "dynamic policy reference");
                resolved.ok_or_else(|| {
                    EvalError::processing(format!("unresolvable policy reference: {}", self.id))
                })
            }
        }
    }
}

impl Decidable for PolicyRef {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self.resolve() {
            Ok(target) => target.evaluate(ctx),
            Err(e) => DecisionResult::indeterminate(
                xacml_core::ExtendedIndeterminate::DenyPermit,
                &e,
            ),
        }
    }

    fn is_applicable_by_target(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        self.resolve()?.is_applicable_by_target(ctx)
    }
}

/// In-memory policy provider: versions are kept per id, the highest
/// matching version wins.
#[derive(Default)]
pub struct StaticPolicyProvider {
    policies: FxHashMap<String, Vec<Arc<Policy>>>,
    policy_sets: FxHashMap<String, Vec<Arc<PolicySet>>>,
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_policy(&mut self, policy: Arc<Policy>) {
        self.policies
            .entry(policy.id().to_string())
            .or_default()
            .push(policy);
    }

    pub fn add_policy_set(&mut self, policy_set: Arc<PolicySet>) {
        self.policy_sets
            .entry(policy_set.id().to_string())
            .or_default()
            .push(policy_set);
    }
}

fn best_version<T, F>(items: &[T], constraints: &VersionConstraints, version_of: F) -> Option<T>
where
    T: Clone,
    F: Fn(&T) -> PolicyVersion,
{
    items
        .iter()
        .filter(|item| constraints.matches(&version_of(item)))
        .max_by_key(|item| version_of(item))
        .cloned()
}

impl PolicyProvider for StaticPolicyProvider {
    fn get_policy(&self, id: &str, constraints: &VersionConstraints) -> Option<Arc<Policy>> {
        best_version(self.policies.get(id)?, constraints, |p| p.version().clone())
    }

    fn get_policy_set(
        &self,
        id: &str,
        constraints: &VersionConstraints,
    ) -> Option<Arc<PolicySet>> {
        best_version(self.policy_sets.get(id)?, constraints, |p| {
            p.version().clone()
        })
    }
}

/// Finds and evaluates the root policy for each individual request.
pub struct RootPolicyEvaluator {
    root: PolicyElement,
    provider: Option<Arc<dyn PolicyProvider>>,
}

impl RootPolicyEvaluator {
    /// Root over an already-built tree.
    pub fn new(root: PolicyElement) -> Self {
        Self {
            root,
            provider: None,
        }
    }

    /// Resolve the root by id from a provider; a PolicySet is tried first,
    /// then a Policy. Static reference depth inside the resolved tree is
    /// validated against `max_ref_depth`.
    pub fn from_provider(
        provider: Arc<dyn PolicyProvider>,
        root_id: &str,
        constraints: &VersionConstraints,
        max_ref_depth: usize,
    ) -> Result<Self, XacmlError> {
        let root = provider
            .get_policy_set(root_id, constraints)
            .map(PolicyElement::PolicySet)
            .or_else(|| {
                provider
                    .get_policy(root_id, constraints)
                    .map(PolicyElement::Policy)
            })
            .ok_or_else(|| XacmlError::UnresolvableReference {
                id: root_id.to_string(),
            })?;

        let depth = static_ref_depth(&root);
        if depth > max_ref_depth {
            return Err(XacmlError::ReferenceDepth {
                limit: max_ref_depth,
                chain: root_id.to_string(),
            });
        }

        Ok(Self {
            root,
            provider: Some(provider),
        })
    }

    /// Evaluate the root against one individual decision request.
    pub fn find_and_evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        self.root.evaluate(ctx)
    }

    pub fn close(&self) {
        if let Some(provider) = &self.provider {
            provider.close();
        }
    }
}

/// Longest chain of static references in the tree.
fn static_ref_depth(element: &PolicyElement) -> usize {
    match element {
        PolicyElement::Policy(_) => 0,
        PolicyElement::PolicySet(set) => set
            .children()
            .iter()
            .map(|child| match child {
                PolicyChild::Policy(_) => 0,
                PolicyChild::PolicySet(ps) => {
                    static_ref_depth(&PolicyElement::PolicySet(Arc::clone(ps)))
                }
                PolicyChild::Reference(r) => match &r.mode {
                    RefMode::Static(target) => 1 + static_ref_depth(target),
                    // Dynamic depth is enforced on the evaluation path
                    RefMode::Dynamic { .. } => 1,
                },
            })
            .max()
            .unwrap_or(0),
    }
}
