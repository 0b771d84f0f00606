//! Attribute provider (PIP) trait.
//!
//! Providers supply attribute values the request did not carry. They are
//! consulted in registration order after the request attributes, first
//! non-empty result wins, and results are memoized for the rest of the
//! evaluation (see [`crate::context::EvaluationContext::resolve_designator`]).
//!
//! Providers run synchronously on the calling thread. A provider that
//! cannot answer in time should return a missing-attribute error rather
//! than block past the evaluation deadline.

use rustc_hash::FxHashMap;
use xacml_core::{AttributeFqn, Bag, Datatype, EvalError};

/// A designator shape a provider declares it can serve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeDesignatorType {
    pub category: String,
    pub id: String,
    pub datatype: Datatype,
    /// `None` covers requests for any issuer
    pub issuer: Option<String>,
}

impl AttributeDesignatorType {
    pub fn new(category: impl Into<String>, id: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            datatype,
            issuer: None,
        }
    }

    /// True when this declaration covers the requested designator.
    pub fn matches(&self, fqn: &AttributeFqn, datatype: Datatype) -> bool {
        if self.category != fqn.category() || self.id != fqn.id() || self.datatype != datatype {
            return false;
        }
        match (&self.issuer, fqn.issuer()) {
            (None, _) => true,
            (Some(declared), Some(requested)) => declared == requested,
            (Some(_), None) => false,
        }
    }
}

/// Read-only view of the request's named attributes, handed to providers so
/// dependent lookups (provider B keyed off an attribute provider A serves)
/// can see request data without mutating the context.
pub struct RequestAttributes<'a> {
    map: &'a FxHashMap<AttributeFqn, Bag>,
}

impl<'a> RequestAttributes<'a> {
    pub(crate) fn new(map: &'a FxHashMap<AttributeFqn, Bag>) -> Self {
        Self { map }
    }

    pub fn get(&self, fqn: &AttributeFqn) -> Option<&Bag> {
        self.map.get(fqn)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeFqn, &Bag)> {
        self.map.iter()
    }
}

/// A policy information point.
pub trait AttributeProvider: Send + Sync {
    /// The designators this provider can serve.
    fn provided_attributes(&self) -> &[AttributeDesignatorType];

    /// Designators this provider itself depends on (served by the request
    /// or another provider). The registry resolves the resulting provider
    /// dependency graph at initialization and rejects cycles.
    fn required_attributes(&self) -> &[AttributeDesignatorType] {
        &[]
    }

    /// True when any declaration covers the requested designator.
    fn covers(&self, fqn: &AttributeFqn, datatype: Datatype) -> bool {
        self.provided_attributes()
            .iter()
            .any(|d| d.matches(fqn, datatype))
    }

    /// Resolve the designator. An empty bag means "looked, found nothing";
    /// an error becomes the empty result's cause (and the evaluation's
    /// Indeterminate when the designator is `mustBePresent`).
    fn resolve(
        &self,
        fqn: &AttributeFqn,
        datatype: Datatype,
        request: &RequestAttributes<'_>,
    ) -> Result<Bag, EvalError>;

    /// Release any resources (caches, connections). Called from the
    /// engine's `close()` cascade.
    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_matching() {
        let decl = AttributeDesignatorType::new("cat", "attr", Datatype::String);
        assert!(decl.matches(&AttributeFqn::new("cat", "attr"), Datatype::String));
        assert!(!decl.matches(&AttributeFqn::new("cat", "attr"), Datatype::Integer));
        assert!(!decl.matches(&AttributeFqn::new("cat", "other"), Datatype::String));
        // issuer-less declaration covers issuered requests
        let issued = AttributeFqn::with_issuer("cat", "attr", Some("issuer-a"));
        assert!(decl.matches(&issued, Datatype::String));

        let strict = AttributeDesignatorType {
            issuer: Some("issuer-a".into()),
            ..decl
        };
        assert!(strict.matches(&issued, Datatype::String));
        assert!(!strict.matches(&AttributeFqn::new("cat", "attr"), Datatype::String));
    }
}
