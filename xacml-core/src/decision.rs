//! Decision model: decisions, status, obligations/advice, results.
//!
//! This module defines the fundamental outcome types shared by every
//! evaluator and the PDP engine:
//! - `Decision` / `ExtendedIndeterminate`: the four decisions plus the
//!   {D, P, DP} annotation carried by Indeterminate
//! - `Status` / `StatusCode`: XACML status reporting
//! - `Obligation` / `Advice` / `PepActions`: instructions for the PEP
//! - `DecisionResult`: the immutable outcome of one (sub-)evaluation

use crate::attribute::AttributeFqn;
use crate::datatype::Datatype;
use crate::error::EvalError;
use crate::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rule's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    /// The decision this effect produces when a rule applies.
    pub fn as_decision(self) -> Decision {
        match self {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }

    /// The extended-indeterminate annotation for failures scoped to this
    /// effect (XACML 7.11: a failed Permit rule is Indeterminate{P}).
    pub fn as_extended_indeterminate(self) -> ExtendedIndeterminate {
        match self {
            Effect::Permit => ExtendedIndeterminate::Permit,
            Effect::Deny => ExtendedIndeterminate::Deny,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Permit => f.write_str("Permit"),
            Effect::Deny => f.write_str("Deny"),
        }
    }
}

/// An authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
    Indeterminate,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Permit => "Permit",
            Decision::Deny => "Deny",
            Decision::NotApplicable => "NotApplicable",
            Decision::Indeterminate => "Indeterminate",
        };
        f.write_str(s)
    }
}

/// The set of decisions an Indeterminate could have been (XACML 7.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtendedIndeterminate {
    /// Indeterminate{D}: could only have been Deny
    Deny,
    /// Indeterminate{P}: could only have been Permit
    Permit,
    /// Indeterminate{DP}: could have been either
    DenyPermit,
}

impl ExtendedIndeterminate {
    /// Least upper bound: combining a {D} and a {P} potential gives {DP}.
    pub fn join(self, other: ExtendedIndeterminate) -> ExtendedIndeterminate {
        if self == other {
            self
        } else {
            ExtendedIndeterminate::DenyPermit
        }
    }
}

impl fmt::Display for ExtendedIndeterminate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtendedIndeterminate::Deny => "{D}",
            ExtendedIndeterminate::Permit => "{P}",
            ExtendedIndeterminate::DenyPermit => "{DP}",
        };
        f.write_str(s)
    }
}

/// XACML status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// urn:oasis:names:tc:xacml:1.0:status:ok
    Ok,
    /// urn:oasis:names:tc:xacml:1.0:status:missing-attribute
    MissingAttribute,
    /// urn:oasis:names:tc:xacml:1.0:status:syntax-error
    SyntaxError,
    /// urn:oasis:names:tc:xacml:1.0:status:processing-error
    ProcessingError,
}

impl StatusCode {
    /// The status-code URN.
    pub fn uri(self) -> &'static str {
        match self {
            StatusCode::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            StatusCode::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            StatusCode::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            StatusCode::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// The designator that failed to resolve, attached to missing-attribute
/// statuses so the PEP can see which attribute to supply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissingAttributeDetail {
    pub category: String,
    pub attribute_id: String,
    pub datatype: Datatype,
    pub issuer: Option<String>,
}

impl MissingAttributeDetail {
    pub fn new(fqn: &AttributeFqn, datatype: Datatype) -> Self {
        Self {
            category: fqn.category().to_string(),
            attribute_id: fqn.id().to_string(),
            datatype,
            issuer: fqn.issuer().map(str::to_string),
        }
    }
}

/// Result status: code, optional message, optional missing-attribute detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: Option<String>,
    pub missing_attribute_detail: Option<MissingAttributeDetail>,
}

impl Status {
    /// The ok status (no message).
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: None,
            missing_attribute_detail: None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.code, msg),
            None => write!(f, "{}", self.code),
        }
    }
}

/// One evaluated AttributeAssignment inside an obligation or advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAssignment {
    pub attribute_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub value: AttributeValue,
}

/// An obligation the PEP must fulfil.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    pub id: String,
    pub assignments: Vec<AttributeAssignment>,
}

/// Advice the PEP may consider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    pub id: String,
    pub assignments: Vec<AttributeAssignment>,
}

/// Ordered obligations and advice accumulated along the winning path.
///
/// Order is depth-first document order of the source policies; children's
/// actions come before the enclosing policy's own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PepActions {
    pub obligations: Vec<Obligation>,
    pub advices: Vec<Advice>,
}

impl PepActions {
    pub fn new(obligations: Vec<Obligation>, advices: Vec<Advice>) -> Self {
        Self {
            obligations,
            advices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty() && self.advices.is_empty()
    }

    /// Append `other`'s actions after this one's, preserving order.
    pub fn extend(&mut self, other: PepActions) {
        self.obligations.extend(other.obligations);
        self.advices.extend(other.advices);
    }
}

/// Identifier of a policy or policy set that contributed to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyIdentifier {
    pub id: String,
    pub version: String,
    /// True for a PolicySet, false for a Policy
    pub is_policy_set: bool,
}

/// The immutable outcome of evaluating a rule, policy, policy set, or an
/// entire individual decision request.
///
/// `extended` is `Some` exactly when `decision` is `Indeterminate`;
/// `status` is `Some` for Indeterminate results and optional elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedIndeterminate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "PepActions::is_empty", default)]
    pub pep_actions: PepActions,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub applicable_policies: Vec<PolicyIdentifier>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub used_attributes: Vec<AttributeFqn>,
}

impl DecisionResult {
    /// NotApplicable, no status.
    pub fn not_applicable() -> Self {
        Self {
            decision: Decision::NotApplicable,
            extended: None,
            status: None,
            pep_actions: PepActions::default(),
            applicable_policies: Vec::new(),
            used_attributes: Vec::new(),
        }
    }

    /// Permit or Deny with the given PEP actions.
    pub fn applicable(effect: Effect, pep_actions: PepActions) -> Self {
        Self {
            decision: effect.as_decision(),
            extended: None,
            status: None,
            pep_actions,
            applicable_policies: Vec::new(),
            used_attributes: Vec::new(),
        }
    }

    /// Permit with no PEP actions.
    pub fn simple_permit() -> Self {
        Self::applicable(Effect::Permit, PepActions::default())
    }

    /// Deny with no PEP actions.
    pub fn simple_deny() -> Self {
        Self::applicable(Effect::Deny, PepActions::default())
    }

    /// Indeterminate with the given potential-decision annotation and the
    /// failure that caused it.
    pub fn indeterminate(extended: ExtendedIndeterminate, error: &EvalError) -> Self {
        Self {
            decision: Decision::Indeterminate,
            extended: Some(extended),
            status: Some(error.to_status()),
            pep_actions: PepActions::default(),
            applicable_policies: Vec::new(),
            used_attributes: Vec::new(),
        }
    }

    pub fn is_permit(&self) -> bool {
        self.decision == Decision::Permit
    }

    pub fn is_deny(&self) -> bool {
        self.decision == Decision::Deny
    }

    pub fn is_not_applicable(&self) -> bool {
        self.decision == Decision::NotApplicable
    }

    pub fn is_indeterminate(&self) -> bool {
        self.decision == Decision::Indeterminate
    }

    /// The extended-indeterminate annotation; an Indeterminate without one
    /// reads as {DP}.
    pub fn extended_indeterminate(&self) -> ExtendedIndeterminate {
        self.extended.unwrap_or(ExtendedIndeterminate::DenyPermit)
    }
}

impl fmt::Display for DecisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.decision, self.extended) {
            (Decision::Indeterminate, Some(ext)) => write!(f, "Indeterminate{ext}"),
            (decision, _) => write!(f, "{decision}"),
        }
    }
}
