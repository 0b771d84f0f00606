//! Fully-qualified attribute names and standard XACML URN constants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Standard XACML 3.0 category and attribute-id URNs.
///
/// Organized by vocabulary:
/// - `category` - attribute categories (subject, resource, action, environment)
/// - `attribute` - standard attribute ids
/// - `status` - status code URNs (see [`crate::decision::StatusCode`])
pub mod names {
    /// Attribute category URNs
    pub mod category {
        /// The access subject (requester)
        pub const ACCESS_SUBJECT: &str =
            "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";

        /// The resource being accessed
        pub const RESOURCE: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";

        /// The action being performed
        pub const ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";

        /// The request environment
        pub const ENVIRONMENT: &str =
            "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";
    }

    /// Standard attribute-id URNs
    pub mod attribute {
        /// subject-id
        pub const SUBJECT_ID: &str = "urn:oasis:names:tc:xacml:1.0:subject:subject-id";

        /// resource-id
        pub const RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";

        /// action-id
        pub const ACTION_ID: &str = "urn:oasis:names:tc:xacml:1.0:action:action-id";

        /// environment current-time (PDP-issued)
        pub const CURRENT_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-time";

        /// environment current-date (PDP-issued)
        pub const CURRENT_DATE: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-date";

        /// environment current-dateTime (PDP-issued)
        pub const CURRENT_DATETIME: &str =
            "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";
    }
}

/// Fully-qualified attribute name: (category, attribute id, optional issuer).
///
/// Category and id are `Arc<str>` because the same names recur across every
/// request, designator, and cache key; cloning an fqn is two pointer bumps.
///
/// Equality is component-wise. A designator with no issuer matches request
/// attributes of any issuer (XACML 5.29) unless the engine is configured
/// for strict issuer matching; that widening happens at lookup, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeFqn {
    category: Arc<str>,
    id: Arc<str>,
    issuer: Option<Arc<str>>,
}

impl AttributeFqn {
    /// Create an fqn without an issuer.
    pub fn new(category: impl Into<Arc<str>>, id: impl Into<Arc<str>>) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            issuer: None,
        }
    }

    /// Create an fqn with an optional issuer.
    pub fn with_issuer(
        category: impl Into<Arc<str>>,
        id: impl Into<Arc<str>>,
        issuer: Option<impl Into<Arc<str>>>,
    ) -> Self {
        Self {
            category: category.into(),
            id: id.into(),
            issuer: issuer.map(Into::into),
        }
    }

    /// Attribute category URI.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Attribute id URI.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Issuer, if any.
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// The same name with the issuer dropped (used for XACML 5.29
    /// any-issuer matching).
    pub fn without_issuer(&self) -> Self {
        Self {
            category: Arc::clone(&self.category),
            id: Arc::clone(&self.id),
            issuer: None,
        }
    }
}

impl fmt::Display for AttributeFqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issuer {
            Some(issuer) => write!(f, "{}#{} (issuer={})", self.category, self.id, issuer),
            None => write!(f, "{}#{}", self.category, self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqn_equality_is_component_wise() {
        let a = AttributeFqn::new(names::category::ACCESS_SUBJECT, names::attribute::SUBJECT_ID);
        let b = AttributeFqn::new(names::category::ACCESS_SUBJECT, names::attribute::SUBJECT_ID);
        assert_eq!(a, b);

        let c = AttributeFqn::with_issuer(
            names::category::ACCESS_SUBJECT,
            names::attribute::SUBJECT_ID,
            Some("https://issuer.example"),
        );
        assert_ne!(a, c);
        assert_eq!(a, c.without_issuer());
    }
}
