//! The abstract decision-response model.

use crate::request::RequestCategory;
use serde::{Deserialize, Serialize};
use xacml_core::{
    Advice, AttributeFqn, Decision, DecisionResult, Obligation, PolicyIdentifier, Status,
};

/// One Result element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub obligations: Vec<Obligation>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub advices: Vec<Advice>,
    /// Request attributes echoed back via IncludeInResult
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub attributes: Vec<RequestCategory>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub applicable_policies: Vec<PolicyIdentifier>,
    /// Attributes actually consumed during evaluation, when tracing was on
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub used_attributes: Vec<AttributeFqn>,
}

impl ResultItem {
    /// Build from an evaluation outcome plus the request's echo block.
    pub fn from_decision(result: DecisionResult, attributes: Vec<RequestCategory>) -> Self {
        Self {
            decision: result.decision,
            status: result.status,
            obligations: result.pep_actions.obligations,
            advices: result.pep_actions.advices,
            attributes,
            applicable_policies: result.applicable_policies,
            used_attributes: result.used_attributes,
        }
    }

    /// A Result carrying only an Indeterminate status (invalid requests,
    /// internal failures).
    pub fn indeterminate(status: Status) -> Self {
        Self {
            decision: Decision::Indeterminate,
            status: Some(status),
            obligations: Vec::new(),
            advices: Vec::new(),
            attributes: Vec::new(),
            applicable_policies: Vec::new(),
            used_attributes: Vec::new(),
        }
    }
}

/// A decision response: one Result per individual decision request, or a
/// single combined Result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub results: Vec<ResultItem>,
}

impl Response {
    pub fn new(results: Vec<ResultItem>) -> Self {
        Self { results }
    }

    /// Response holding one Indeterminate Result.
    pub fn indeterminate(status: Status) -> Self {
        Self {
            results: vec![ResultItem::indeterminate(status)],
        }
    }
}
