//! # XACML Core
//!
//! Core data model for the XACML 3.0 policy decision engine.
//!
//! This crate provides:
//! - The sixteen standard primitive datatypes and their canonical lexical forms
//! - `AttributeValue`: the typed, immutable attribute value union
//! - `Bag`: unordered multisets of one primitive datatype, with an optional
//!   evaluation-failure cause slot
//! - `AttributeFqn`: fully-qualified attribute names (category, id, issuer)
//! - `Decision`, `DecisionResult`, `Status`: the outcome model shared by the
//!   evaluators and the PDP engine
//!
//! ## Design Principles
//!
//! 1. **Values, not references**: everything here is an immutable value type,
//!    freely shared across concurrent evaluations
//! 2. **Disjoint datatypes**: no implicit widening; cross-type operations are
//!    explicit functions in the evaluation layer
//! 3. **Canonical forms**: equality and hashing follow the XACML canonical
//!    lexical representation of each datatype

pub mod attribute;
pub mod bag;
pub mod datatype;
pub mod decision;
pub mod error;
pub mod temporal;
pub mod value;

// Re-export main types
pub use attribute::{names, AttributeFqn};
pub use bag::Bag;
pub use datatype::{Datatype, ValueType};
pub use decision::{
    Advice, AttributeAssignment, Decision, DecisionResult, Effect, ExtendedIndeterminate,
    MissingAttributeDetail, Obligation, PepActions, PolicyIdentifier, Status, StatusCode,
};
pub use error::{EvalError, Result, XacmlError};
pub use temporal::{Date, DateTime, DayTimeDuration, Time, YearMonthDuration};
pub use value::{Rfc822Name, X500Name};
pub use value::AttributeValue;
