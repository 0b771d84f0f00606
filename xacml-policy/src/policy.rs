//! Policy and PolicySet evaluation (XACML 7.12 - 7.13).
//!
//! Both evaluators share one skeleton: evaluate the target, run the
//! combining algorithm over the children, then (on Permit/Deny) evaluate
//! the element's own obligation/advice expressions for the matching effect
//! and append them after the children's, preserving depth-first document
//! order across the tree.

use crate::combining::{combine, CombiningAlgId};
use crate::pep_action::PepActionExpressions;
use crate::resolver::PolicyRef;
use crate::rule::Rule;
use crate::target::{evaluate_target, Target};
use crate::version::PolicyVersion;
use crate::Decidable;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, info};
use xacml_core::{
    Decision, DecisionResult, Effect, EvalError, ExtendedIndeterminate, PolicyIdentifier,
    XacmlError,
};
use xacml_eval::{EvaluationContext, Expression, VariableDef};

/// Per-policy variable definitions with define-before-use resolution.
///
/// A `VariableReference` is resolved against this scope at parse time, so
/// cycles are impossible by construction (a definition can only reference
/// definitions that already exist). Nesting depth is bounded by
/// `max_ref_depth`.
#[derive(Debug)]
pub struct VariableScope {
    defs: FxHashMap<String, (Arc<VariableDef>, usize)>,
    max_ref_depth: usize,
}

impl VariableScope {
    pub fn new(max_ref_depth: usize) -> Self {
        Self {
            defs: FxHashMap::default(),
            max_ref_depth,
        }
    }

    /// Register a VariableDefinition.
    pub fn define(
        &mut self,
        id: impl Into<String>,
        expr: Expression,
    ) -> Result<Arc<VariableDef>, XacmlError> {
        let id = id.into();
        if self.defs.contains_key(&id) {
            return Err(XacmlError::syntax(format!(
                "duplicate VariableDefinition: {id}"
            )));
        }
        let depth = 1 + self.max_ref_depth_of(&expr);
        if depth > self.max_ref_depth {
            return Err(XacmlError::syntax(format!(
                "VariableDefinition '{id}' exceeds max reference depth {}",
                self.max_ref_depth
            )));
        }
        let def = Arc::new(VariableDef { id: id.clone(), expr });
        self.defs.insert(id, (Arc::clone(&def), depth));
        Ok(def)
    }

    /// Resolve a VariableReference to its definition.
    pub fn reference(&self, id: &str) -> Result<Expression, XacmlError> {
        self.defs
            .get(id)
            .map(|(def, _)| Expression::VariableRef(Arc::clone(def)))
            .ok_or_else(|| XacmlError::UndefinedVariable { id: id.to_string() })
    }

    fn max_ref_depth_of(&self, expr: &Expression) -> usize {
        match expr {
            Expression::VariableRef(def) => {
                self.defs.get(&def.id).map(|(_, d)| *d).unwrap_or(0)
            }
            Expression::Apply(apply) => apply
                .args()
                .iter()
                .map(|a| self.max_ref_depth_of(a))
                .max()
                .unwrap_or(0),
            _ => 0,
        }
    }
}

/// A XACML Policy: a target over an ordered list of rules.
#[derive(Debug)]
pub struct Policy {
    id: String,
    version: PolicyVersion,
    target: Option<Target>,
    rules: Vec<Rule>,
    alg: CombiningAlgId,
    pep_actions: PepActionExpressions,
}

impl Policy {
    pub fn new(
        id: impl Into<String>,
        version: PolicyVersion,
        target: Option<Target>,
        alg: CombiningAlgId,
        rules: Vec<Rule>,
        pep_actions: PepActionExpressions,
    ) -> Result<Self, XacmlError> {
        if alg.policy_only() {
            return Err(XacmlError::UnknownCombiningAlgorithm {
                uri: alg.rule_uri(),
            });
        }
        Ok(Self {
            id: id.into(),
            version,
            target,
            rules,
            alg,
            pep_actions,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }

    fn identifier(&self) -> PolicyIdentifier {
        PolicyIdentifier {
            id: self.id.clone(),
            version: self.version.as_str().to_string(),
            is_policy_set: false,
        }
    }
}

impl Decidable for Policy {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        evaluate_policy_element(
            "policy",
            &self.id,
            self.identifier(),
            self.target.as_ref(),
            self.alg,
            &self.rules,
            &self.pep_actions,
            ctx,
        )
    }

    fn is_applicable_by_target(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        evaluate_target(self.target.as_ref(), ctx)
    }
}

/// A child of a PolicySet.
#[derive(Debug)]
pub enum PolicyChild {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
    Reference(PolicyRef),
}

impl Decidable for PolicyChild {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match self {
            PolicyChild::Policy(p) => p.evaluate(ctx),
            PolicyChild::PolicySet(ps) => ps.evaluate(ctx),
            PolicyChild::Reference(r) => r.evaluate(ctx),
        }
    }

    fn is_applicable_by_target(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        match self {
            PolicyChild::Policy(p) => p.is_applicable_by_target(ctx),
            PolicyChild::PolicySet(ps) => ps.is_applicable_by_target(ctx),
            PolicyChild::Reference(r) => r.is_applicable_by_target(ctx),
        }
    }
}

/// A XACML PolicySet: a target over policies, policy sets, and references.
#[derive(Debug)]
pub struct PolicySet {
    id: String,
    version: PolicyVersion,
    target: Option<Target>,
    children: Vec<PolicyChild>,
    alg: CombiningAlgId,
    pep_actions: PepActionExpressions,
}

impl PolicySet {
    pub fn new(
        id: impl Into<String>,
        version: PolicyVersion,
        target: Option<Target>,
        alg: CombiningAlgId,
        children: Vec<PolicyChild>,
        pep_actions: PepActionExpressions,
    ) -> Result<Self, XacmlError> {
        if alg == CombiningAlgId::OnPermitApplySecond && children.len() != 2 {
            return Err(XacmlError::syntax(format!(
                "on-permit-apply-second requires exactly two children, got {}",
                children.len()
            )));
        }
        Ok(Self {
            id: id.into(),
            version,
            target,
            children,
            alg,
            pep_actions,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }

    pub fn children(&self) -> &[PolicyChild] {
        &self.children
    }

    fn identifier(&self) -> PolicyIdentifier {
        PolicyIdentifier {
            id: self.id.clone(),
            version: self.version.as_str().to_string(),
            is_policy_set: true,
        }
    }
}

impl Decidable for PolicySet {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        evaluate_policy_element(
            "policy-set",
            &self.id,
            self.identifier(),
            self.target.as_ref(),
            self.alg,
            &self.children,
            &self.pep_actions,
            ctx,
        )
    }

    fn is_applicable_by_target(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        evaluate_target(self.target.as_ref(), ctx)
    }
}

/// The shared Policy/PolicySet evaluation skeleton.
#[allow(clippy::too_many_arguments)]
fn evaluate_policy_element<C: Decidable>(
    kind: &str,
    id: &str,
    identifier: PolicyIdentifier,
    target: Option<&Target>,
    alg: CombiningAlgId,
    children: &[C],
    pep_actions: &PepActionExpressions,
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    if let Err(e) = ctx.check_deadline() {
        return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e);
    }

    match evaluate_target(target, ctx) {
        Ok(true) => debug!(%kind, %id, "target -> match"),
        Ok(false) => {
            debug!(%kind, %id, "target -> no-match");
            return DecisionResult::not_applicable();
        }
        Err(e) => {
            // A policy-level target failure could have hidden either
            // outcome: Indeterminate{DP}
            info!(%kind, %id, error = %e, "target -> indeterminate");
            return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e);
        }
    }

    let mut result = combine(alg, children, ctx);

    let effect = match result.decision {
        Decision::Permit => Effect::Permit,
        Decision::Deny => Effect::Deny,
        _ => {
            debug!(%kind, %id, decision = %result, "evaluated");
            return result;
        }
    };

    if !pep_actions.is_empty() {
        match pep_actions.evaluate(effect, ctx) {
            // Children-first ordering: this element's actions follow the
            // combined children's
            Ok(own) => result.pep_actions.extend(own),
            Err(e) => {
                // 7.18: a failed assignment turns the decision just
                // obtained into Indeterminate{that decision}
                info!(%kind, %id, error = %e, "obligation/advice -> indeterminate");
                return DecisionResult::indeterminate(effect.as_extended_indeterminate(), &e);
            }
        }
    }

    if ctx.return_policy_id_list() {
        result.applicable_policies.push(identifier);
    }

    debug!(%kind, %id, decision = %result, "evaluated");
    result
}
