//! Error types.
//!
//! Two error channels, matching the two failure regimes of the engine:
//!
//! - [`XacmlError`]: load-time errors (malformed policy, unknown datatype or
//!   function, reference cycles). Fatal for the artifact being loaded.
//! - [`EvalError`]: runtime evaluation failures. Never fatal: every
//!   `EvalError` eventually becomes an Indeterminate `DecisionResult` with
//!   an XACML status. `Clone` because failures are memoized in designator
//!   caches and carried as bag causes.

use crate::decision::{MissingAttributeDetail, Status, StatusCode};
use thiserror::Error;

/// Load-time errors: policy/request artifacts that cannot be used at all.
#[derive(Debug, Error)]
pub enum XacmlError {
    /// Malformed artifact content
    #[error("syntax error: {message}")]
    Syntax { message: String },

    /// Datatype URI not in the standard set
    #[error("unknown datatype: {uri}")]
    UnknownDatatype { uri: String },

    /// Function URI not in the standard set or the extension registry
    #[error("unknown function: {uri}")]
    UnknownFunction { uri: String },

    /// Combining-algorithm URI not in the standard set
    #[error("unknown combining algorithm: {uri}")]
    UnknownCombiningAlgorithm { uri: String },

    /// Function applied to the wrong number or types of arguments
    #[error("invalid arguments to {function}: {message}")]
    InvalidArguments { function: String, message: String },

    /// VariableReference to an undefined VariableDefinition
    #[error("undefined variable: {id}")]
    UndefinedVariable { id: String },

    /// VariableDefinitions that reference each other cyclically
    #[error("variable reference cycle involving '{id}'")]
    VariableCycle { id: String },

    /// Policy(Set)IdReference chain exceeding the configured depth
    #[error("policy reference depth exceeds limit of {limit}: {chain}")]
    ReferenceDepth { limit: usize, chain: String },

    /// Policy(Set)IdReference cycle
    #[error("policy reference cycle: {chain}")]
    ReferenceCycle { chain: String },

    /// Referenced policy not available from any provider
    #[error("unresolvable policy reference: {id}")]
    UnresolvableReference { id: String },

    /// Engine configuration rejected at bootstrap
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl XacmlError {
    pub fn syntax(message: impl Into<String>) -> Self {
        XacmlError::Syntax {
            message: message.into(),
        }
    }

    pub fn invalid_arguments(function: impl Into<String>, message: impl Into<String>) -> Self {
        XacmlError::InvalidArguments {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// A runtime evaluation failure on its way to becoming an Indeterminate.
///
/// Carries the status code, a message, and (for missing attributes) the
/// designator that failed to resolve.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}: {message}", code.uri())]
pub struct EvalError {
    code: StatusCode,
    message: String,
    missing_attribute_detail: Option<MissingAttributeDetail>,
}

impl EvalError {
    /// `urn:...:status:processing-error`
    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::ProcessingError,
            message: message.into(),
            missing_attribute_detail: None,
        }
    }

    /// `urn:...:status:syntax-error`
    pub fn syntax(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::SyntaxError,
            message: message.into(),
            missing_attribute_detail: None,
        }
    }

    /// `urn:...:status:missing-attribute`, without designator detail
    /// (selector misses, provider timeouts).
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::MissingAttribute,
            message: message.into(),
            missing_attribute_detail: None,
        }
    }

    /// `urn:...:status:missing-attribute` with the offending designator
    /// attached for the status detail.
    pub fn missing_attribute(detail: MissingAttributeDetail) -> Self {
        Self {
            code: StatusCode::MissingAttribute,
            message: format!(
                "no value found for attribute '{}' in category '{}'",
                detail.attribute_id, detail.category
            ),
            missing_attribute_detail: Some(detail),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convert to the wire-facing status.
    pub fn to_status(&self) -> Status {
        Status {
            code: self.code,
            message: Some(self.message.clone()),
            missing_attribute_detail: self.missing_attribute_detail.clone(),
        }
    }
}

/// Result alias for load-time operations.
pub type Result<T> = std::result::Result<T, XacmlError>;
