//! # XACML Policy
//!
//! The policy evaluation tree for the XACML 3.0 policy decision engine:
//!
//! - **Targeting**: AnyOf/AllOf/Match trees with 7.11 Indeterminate rules
//! - **Rules**: target + condition + effect + effect-filtered PEP actions
//! - **Combining**: the standard rule/policy combining algorithms
//! - **Policies**: Policy and PolicySet evaluation with obligation/advice
//!   assembly in depth-first document order
//! - **References**: static and dynamic Policy(Set)IdReference resolution
//!   with cycle and depth limits, version matching, and the root policy
//!   evaluator
//!
//! Parsed policies are immutable and freely shared across concurrent
//! evaluations; everything mutable lives in the per-request
//! [`xacml_eval::EvaluationContext`].

pub mod combining;
pub mod condition;
pub mod pep_action;
pub mod policy;
pub mod resolver;
pub mod rule;
pub mod target;
pub mod version;

use xacml_core::{DecisionResult, EvalError};
use xacml_eval::EvaluationContext;

/// Anything that can be evaluated to a decision: rules, policies, policy
/// sets, and policy references.
pub trait Decidable {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult;

    /// Applicability by target alone, used by `only-one-applicable`.
    /// Meaningful for policies and policy sets; rules never see it because
    /// the algorithm is restricted to policy children at load time.
    fn is_applicable_by_target(
        &self,
        _ctx: &mut EvaluationContext<'_>,
    ) -> Result<bool, EvalError> {
        Err(EvalError::processing(
            "applicability check is not defined for this element",
        ))
    }
}

pub use combining::{combine, CombiningAlgId};
pub use condition::{evaluate_condition, Condition};
pub use pep_action::{AssignmentExpression, PepActionExpression, PepActionExpressions};
pub use policy::{Policy, PolicyChild, PolicySet, VariableScope};
pub use resolver::{
    PolicyElement, PolicyProvider, PolicyRef, RootPolicyEvaluator, StaticPolicyProvider,
};
pub use rule::Rule;
pub use target::{evaluate_target, AllOf, AnyOf, Match, Target};
pub use version::{PolicyVersion, VersionConstraints, VersionMatch};
