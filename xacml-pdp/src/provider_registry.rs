//! Attribute provider registry.
//!
//! Holds the PIP chain in registration order (the order the evaluation
//! context consults) and validates the inter-provider dependency graph at
//! initialization: provider B requiring an attribute provider A serves
//! creates an edge A -> B, and any cycle is a configuration error.

use std::sync::Arc;
use tracing::debug;
use xacml_core::XacmlError;
use xacml_eval::{AttributeDesignatorType, AttributeProvider};

/// Registry of attribute providers, dependency-checked at construction.
#[derive(Default)]
pub struct AttributeProviderRegistry {
    providers: Vec<Arc<dyn AttributeProvider>>,
}

impl AttributeProviderRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from providers in registration order. Fails on a dependency
    /// cycle between providers.
    pub fn new(providers: Vec<Arc<dyn AttributeProvider>>) -> Result<Self, XacmlError> {
        let registry = Self { providers };
        registry.check_dependency_cycles()?;
        debug!(count = registry.providers.len(), "attribute providers registered");
        Ok(registry)
    }

    /// The provider chain, in registration order.
    pub fn providers(&self) -> &[Arc<dyn AttributeProvider>] {
        &self.providers
    }

    pub fn close(&self) {
        for provider in &self.providers {
            provider.close();
        }
    }

    fn serves(provider: &dyn AttributeProvider, needed: &AttributeDesignatorType) -> bool {
        provider.provided_attributes().iter().any(|p| {
            p.category == needed.category && p.id == needed.id && p.datatype == needed.datatype
        })
    }

    fn check_dependency_cycles(&self) -> Result<(), XacmlError> {
        let n = self.providers.len();
        // edges[i] holds the providers that i depends on
        let edges: Vec<Vec<usize>> = (0..n)
            .map(|i| {
                self.providers[i]
                    .required_attributes()
                    .iter()
                    .flat_map(|needed| {
                        (0..n).filter(move |&j| {
                            j != i && Self::serves(self.providers[j].as_ref(), needed)
                        })
                    })
                    .collect()
            })
            .collect();

        // DFS coloring: 0 = unvisited, 1 = on stack, 2 = done
        fn visit(node: usize, edges: &[Vec<usize>], color: &mut [u8]) -> bool {
            color[node] = 1;
            for &next in &edges[node] {
                let c = color[next];
                match c {
                    1 => return false,
                    0 if !visit(next, edges, color) => return false,
                    _ => {}
                }
            }
            color[node] = 2;
            true
        }

        let mut color = vec![0u8; n];
        for i in 0..n {
            if color[i] == 0 && !visit(i, &edges, &mut color) {
                return Err(XacmlError::Config {
                    message: "attribute provider dependency cycle".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::{AttributeFqn, Bag, Datatype, EvalError};
    use xacml_eval::RequestAttributes;

    struct Declared {
        provides: Vec<AttributeDesignatorType>,
        requires: Vec<AttributeDesignatorType>,
    }

    impl AttributeProvider for Declared {
        fn provided_attributes(&self) -> &[AttributeDesignatorType] {
            &self.provides
        }
        fn required_attributes(&self) -> &[AttributeDesignatorType] {
            &self.requires
        }
        fn resolve(
            &self,
            _fqn: &AttributeFqn,
            datatype: Datatype,
            _request: &RequestAttributes<'_>,
        ) -> Result<Bag, EvalError> {
            Ok(Bag::empty(datatype))
        }
    }

    fn decl(category: &str, id: &str) -> AttributeDesignatorType {
        AttributeDesignatorType::new(category, id, Datatype::String)
    }

    #[test]
    fn test_acyclic_dependencies_accepted() {
        // B depends on A's attribute; A depends on nothing
        let a = Arc::new(Declared {
            provides: vec![decl("subject", "role")],
            requires: vec![],
        });
        let b = Arc::new(Declared {
            provides: vec![decl("subject", "clearance")],
            requires: vec![decl("subject", "role")],
        });
        assert!(AttributeProviderRegistry::new(vec![a, b]).is_ok());
    }

    #[test]
    fn test_dependency_cycle_rejected() {
        let a = Arc::new(Declared {
            provides: vec![decl("subject", "role")],
            requires: vec![decl("subject", "clearance")],
        });
        let b = Arc::new(Declared {
            provides: vec![decl("subject", "clearance")],
            requires: vec![decl("subject", "role")],
        });
        assert!(AttributeProviderRegistry::new(vec![a, b]).is_err());
    }
}
