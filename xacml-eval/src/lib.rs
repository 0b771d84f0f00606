//! # XACML Eval
//!
//! Expression model, function library, and evaluation context for the XACML
//! 3.0 policy decision engine.
//!
//! This crate provides:
//! - [`Expression`]: the closed expression sum (constants, designators,
//!   selectors, variable references, applies, function references) with
//!   construction-time signature checking
//! - [`FunctionId`]: the standard first-order and higher-order function set,
//!   dispatched by family module
//! - [`EvaluationContext`]: per-request attribute lookup with memoization,
//!   attribute-provider delegation, and deadline checking
//!
//! Evaluation is synchronous and never panics: every failure is an
//! [`xacml_core::EvalError`] that the policy layer turns into an
//! Indeterminate decision.

pub mod context;
pub mod expression;
pub mod function;
pub mod provider;
pub mod xpath;

pub use context::{ContextBuilder, EvaluationContext};
pub use expression::{
    Apply, AttributeDesignator, AttributeSelector, ExprValue, Expression, VariableDef,
};
pub use function::{
    CompareOp, CustomFunction, FunctionId, FunctionKind, FunctionRegistry, Signature,
};
pub use provider::{AttributeDesignatorType, AttributeProvider, RequestAttributes};
pub use xpath::XPathEvaluator;
