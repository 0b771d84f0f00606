//! The abstract decision-request model.
//!
//! This is the shape the wire parsers (XML per the OASIS core schema, JSON
//! per the XACML JSON profile) produce; the parsers themselves live
//! outside this crate. Attribute values arrive already typed (datatype URI
//! plus lexical form, validated at deserialization).

use serde::{Deserialize, Serialize};
use xacml_core::{AttributeFqn, AttributeValue, Bag, EvalError};

/// One attribute within a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestAttribute {
    #[serde(rename = "attributeId")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issuer: Option<String>,
    pub values: Vec<AttributeValue>,
    #[serde(rename = "includeInResult", default)]
    pub include_in_result: bool,
}

/// One Attributes block: a category with its attributes and optional
/// Content XML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCategory {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    pub attributes: Vec<RequestAttribute>,
}

/// A decision request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "returnPolicyIdList", default)]
    pub return_policy_id_list: bool,
    #[serde(rename = "combinedDecision", default)]
    pub combined_decision: bool,
    pub categories: Vec<RequestCategory>,
    /// Set by a parser that encountered a `MultiRequests` element; the
    /// optional `RequestReference` feature is not evaluated and the
    /// preprocessor rejects such requests
    #[serde(rename = "multiRequests", default)]
    pub has_multi_requests: bool,
}

/// One individual decision request after preprocessing: the unit of
/// evaluation, caching, and result assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualDecisionRequest {
    /// Attribute bags in request order (the context merges duplicates)
    pub named_attributes: Vec<(AttributeFqn, Bag)>,
    /// Per-category Content XML
    pub contents: Vec<(String, String)>,
    pub return_policy_id_list: bool,
    /// Categories echoing the attributes flagged IncludeInResult
    pub echo: Vec<RequestCategory>,
}

impl IndividualDecisionRequest {
    /// Build from one Attributes block per (possibly repeated) category.
    pub fn from_categories(
        request: &Request,
        categories: &[&RequestCategory],
    ) -> Result<Self, EvalError> {
        let mut named_attributes = Vec::new();
        let mut contents = Vec::new();
        let mut echo = Vec::new();

        for cat in categories {
            for attr in &cat.attributes {
                let Some(first) = attr.values.first() else {
                    return Err(EvalError::syntax(format!(
                        "attribute '{}' in category '{}' has no value",
                        attr.id, cat.category
                    )));
                };
                let datatype = first.datatype();
                if attr.values.iter().any(|v| v.datatype() != datatype) {
                    return Err(EvalError::syntax(format!(
                        "attribute '{}' in category '{}' mixes datatypes",
                        attr.id, cat.category
                    )));
                }
                let fqn = AttributeFqn::with_issuer(
                    cat.category.clone(),
                    attr.id.clone(),
                    attr.issuer.clone(),
                );
                named_attributes.push((fqn, Bag::new(datatype, attr.values.clone())));
            }

            if let Some(content) = &cat.content {
                contents.push((cat.category.clone(), content.clone()));
            }

            let echoed: Vec<RequestAttribute> = cat
                .attributes
                .iter()
                .filter(|a| a.include_in_result)
                .cloned()
                .collect();
            if !echoed.is_empty() {
                echo.push(RequestCategory {
                    category: cat.category.clone(),
                    content: None,
                    attributes: echoed,
                });
            }
        }

        Ok(Self {
            named_attributes,
            contents,
            return_policy_id_list: request.return_policy_id_list,
            echo,
        })
    }
}
