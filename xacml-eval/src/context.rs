//! Evaluation context for one individual decision request.
//!
//! The `EvaluationContext` provides everything expression evaluation needs:
//! the request's named attributes (plus the PDP-issued environment
//! attributes the engine injects), per-category Content, the attribute
//! provider chain, and memoization of designator/selector lookups and
//! variable values.
//!
//! A context is exclusively owned by the evaluation of one individual
//! decision request. It is never shared across requests or threads, which
//! is why memoization is plain mutable state.

use crate::expression::{AttributeSelector, ExprValue, VariableDef};
use crate::function::FunctionRegistry;
use crate::provider::{AttributeProvider, RequestAttributes};
use crate::xpath::XPathEvaluator;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use xacml_core::{AttributeFqn, Bag, Datatype, EvalError};

/// Memoization key for designator and selector lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LookupKey {
    Designator(AttributeFqn, Datatype),
    Selector(String, String, Option<AttributeFqn>, Datatype),
}

/// Per-request evaluation state.
pub struct EvaluationContext<'a> {
    named_attributes: FxHashMap<AttributeFqn, Bag>,
    extra_contents: FxHashMap<String, String>,
    providers: &'a [Arc<dyn AttributeProvider>],
    functions: &'a FunctionRegistry,
    xpath: Option<&'a dyn XPathEvaluator>,
    xpath_enabled: bool,
    return_policy_id_list: bool,
    deadline: Option<Instant>,

    lookup_cache: FxHashMap<LookupKey, Result<Bag, EvalError>>,
    variable_cache: FxHashMap<usize, Result<ExprValue, EvalError>>,

    track_used: bool,
    used: Vec<AttributeFqn>,
    used_seen: FxHashSet<AttributeFqn>,
}

impl<'a> EvaluationContext<'a> {
    /// The extension-function registry.
    pub fn functions(&self) -> &FunctionRegistry {
        self.functions
    }

    /// True when the request asked for the applicable-policy-id list.
    pub fn return_policy_id_list(&self) -> bool {
        self.return_policy_id_list
    }

    /// Fail with a processing error once the caller-supplied deadline has
    /// passed. Checked at designator resolution and policy boundaries, not
    /// per expression node.
    pub fn check_deadline(&self) -> Result<(), EvalError> {
        match self.deadline {
            Some(deadline) if Instant::now() > deadline => {
                Err(EvalError::processing("deadline exceeded"))
            }
            _ => Ok(()),
        }
    }

    /// Resolve a designator to a bag, memoized for this evaluation.
    ///
    /// Lookup order: cache, request attributes (a datatype mismatch is a
    /// processing error), then providers in registration order with first
    /// non-empty result winning. Every outcome is cached, failures
    /// included, so repeated designators cost one lookup.
    pub fn resolve_designator(
        &mut self,
        fqn: &AttributeFqn,
        datatype: Datatype,
    ) -> Result<Bag, EvalError> {
        let key = LookupKey::Designator(fqn.clone(), datatype);
        if let Some(cached) = self.lookup_cache.get(&key) {
            return cached.clone();
        }
        self.check_deadline()?;

        let result = self.lookup_designator(fqn, datatype);
        self.record_use(fqn);
        self.lookup_cache.insert(key, result.clone());
        result
    }

    fn lookup_designator(&self, fqn: &AttributeFqn, datatype: Datatype) -> Result<Bag, EvalError> {
        if let Some(bag) = self.named_attributes.get(fqn) {
            if bag.datatype() == datatype {
                return Ok(bag.clone());
            }
            return Err(EvalError::processing(format!(
                "attribute {fqn} requested as {} but present as {}",
                datatype.uri(),
                bag.datatype().uri()
            )));
        }

        for provider in self.providers {
            if !provider.covers(fqn, datatype) {
                continue;
            }
            let request = RequestAttributes::new(&self.named_attributes);
            match provider.resolve(fqn, datatype, &request) {
                Ok(bag) if !bag.is_empty() => {
                    debug!(attribute = %fqn, count = bag.len(), "designator resolved by provider");
                    return Ok(bag);
                }
                Ok(_) => {}
                // A provider failure is the empty result's cause, surfaced
                // only when the designator is mustBePresent
                Err(e) => return Ok(Bag::empty_with_cause(datatype, e)),
            }
        }

        Ok(Bag::empty(datatype))
    }

    /// Resolve an AttributeSelector, memoized like designators.
    pub fn resolve_selector(&mut self, selector: &AttributeSelector) -> Result<Bag, EvalError> {
        if !self.xpath_enabled {
            return Err(EvalError::processing(
                "AttributeSelector support is disabled (xpath_enabled = false)",
            ));
        }
        let key = LookupKey::Selector(
            selector.category.clone(),
            selector.path.clone(),
            selector.context_selector.clone(),
            selector.datatype,
        );
        if let Some(cached) = self.lookup_cache.get(&key) {
            return cached.clone();
        }
        self.check_deadline()?;

        let result = self.lookup_selector(selector);
        self.lookup_cache.insert(key, result.clone());
        result
    }

    fn lookup_selector(&self, selector: &AttributeSelector) -> Result<Bag, EvalError> {
        let Some(xpath) = self.xpath else {
            return Err(EvalError::processing("no XPath evaluator registered"));
        };
        let Some(content) = self.extra_contents.get(&selector.category) else {
            return Ok(Bag::empty(selector.datatype));
        };
        let context_node = match &selector.context_selector {
            Some(fqn) => match self.named_attributes.get(fqn).and_then(Bag::single) {
                Some(v) => Some(v.canonical()),
                None => {
                    return Err(EvalError::missing(format!(
                        "ContextSelectorId attribute {fqn} has no single value"
                    )))
                }
            },
            None => None,
        };
        xpath.select(
            content,
            &selector.path,
            context_node.as_deref(),
            selector.datatype,
        )
    }

    /// Resolve a variable reference, evaluating its definition at most once
    /// per context. Keyed by definition identity: definitions are parse-time
    /// values shared via `Arc`, so the pointer is stable for the lifetime
    /// of the policy tree.
    pub fn resolve_variable(&mut self, def: &Arc<VariableDef>) -> Result<ExprValue, EvalError> {
        let key = Arc::as_ptr(def) as usize;
        if let Some(cached) = self.variable_cache.get(&key) {
            return cached.clone();
        }
        let result = def.expr.evaluate(self);
        debug!(variable = %def.id, ok = result.is_ok(), "variable definition evaluated");
        self.variable_cache.insert(key, result.clone());
        result
    }

    fn record_use(&mut self, fqn: &AttributeFqn) {
        if self.track_used && self.used_seen.insert(fqn.clone()) {
            self.used.push(fqn.clone());
        }
    }

    /// Attributes actually consumed during evaluation, in first-use order.
    /// Empty unless tracking was requested at build time.
    pub fn used_attributes(&self) -> &[AttributeFqn] {
        &self.used
    }

    /// Direct read access to a named attribute (engine-side echo of
    /// IncludeInResult attributes; expressions go through
    /// [`Self::resolve_designator`]).
    pub fn named_attribute(&self, fqn: &AttributeFqn) -> Option<&Bag> {
        self.named_attributes.get(fqn)
    }
}

/// Builder for [`EvaluationContext`].
///
/// The engine assembles one per individual decision request: request
/// attributes, PDP-issued environment attributes, Content blocks, provider
/// chain, and the evaluation options.
pub struct ContextBuilder<'a> {
    named_attributes: FxHashMap<AttributeFqn, Bag>,
    extra_contents: FxHashMap<String, String>,
    providers: &'a [Arc<dyn AttributeProvider>],
    xpath: Option<&'a dyn XPathEvaluator>,
    xpath_enabled: bool,
    strict_issuer_match: bool,
    return_policy_id_list: bool,
    track_used: bool,
    deadline: Option<Instant>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new() -> Self {
        Self {
            named_attributes: FxHashMap::default(),
            extra_contents: FxHashMap::default(),
            providers: &[],
            xpath: None,
            xpath_enabled: false,
            strict_issuer_match: false,
            return_policy_id_list: false,
            track_used: false,
            deadline: None,
        }
    }

    /// Add one named attribute bag. Bags arriving under the same fqn merge
    /// when their datatypes agree (values from multiple Attribute elements).
    pub fn attribute(mut self, fqn: AttributeFqn, bag: Bag) -> Self {
        self.merge_attribute(fqn, bag);
        self
    }

    fn merge_attribute(&mut self, fqn: AttributeFqn, bag: Bag) {
        match self.named_attributes.get_mut(&fqn) {
            Some(existing) if existing.datatype() == bag.datatype() => {
                let mut values = existing.values().to_vec();
                values.extend(bag.values().iter().cloned());
                *existing = Bag::new(bag.datatype(), values);
            }
            Some(_) => {
                // Conflicting datatypes under one fqn: first writer wins;
                // the preprocessor rejects this shape before it gets here
            }
            None => {
                self.named_attributes.insert(fqn, bag);
            }
        }
    }

    /// Attach a category's Content XML.
    pub fn content(mut self, category: impl Into<String>, xml: impl Into<String>) -> Self {
        self.extra_contents.insert(category.into(), xml.into());
        self
    }

    pub fn providers(mut self, providers: &'a [Arc<dyn AttributeProvider>]) -> Self {
        self.providers = providers;
        self
    }

    pub fn xpath(mut self, evaluator: &'a dyn XPathEvaluator) -> Self {
        self.xpath = Some(evaluator);
        self.xpath_enabled = true;
        self
    }

    /// Require designator issuers to match exactly (disables the XACML 5.29
    /// any-issuer widening).
    pub fn strict_issuer_match(mut self, strict: bool) -> Self {
        self.strict_issuer_match = strict;
        self
    }

    pub fn return_policy_id_list(mut self, enabled: bool) -> Self {
        self.return_policy_id_list = enabled;
        self
    }

    pub fn track_used_attributes(mut self, enabled: bool) -> Self {
        self.track_used = enabled;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Finalize. Unless strict issuer matching is on, attributes carrying
    /// an issuer are also indexed under their issuer-less name so a
    /// designator without an issuer matches any issuer (XACML 5.29).
    pub fn build(mut self, functions: &'a FunctionRegistry) -> EvaluationContext<'a> {
        if !self.strict_issuer_match {
            let issued: Vec<(AttributeFqn, Bag)> = self
                .named_attributes
                .iter()
                .filter(|(fqn, _)| fqn.issuer().is_some())
                .map(|(fqn, bag)| (fqn.without_issuer(), bag.clone()))
                .collect();
            for (fqn, bag) in issued {
                self.merge_attribute(fqn, bag);
            }
        }

        EvaluationContext {
            named_attributes: self.named_attributes,
            extra_contents: self.extra_contents,
            providers: self.providers,
            functions,
            xpath: self.xpath,
            xpath_enabled: self.xpath_enabled,
            return_policy_id_list: self.return_policy_id_list,
            deadline: self.deadline,
            lookup_cache: FxHashMap::default(),
            variable_cache: FxHashMap::default(),
            track_used: self.track_used,
            used: Vec::new(),
            used_seen: FxHashSet::default(),
        }
    }
}

impl Default for ContextBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::AttributeDesignatorType;
    use xacml_core::AttributeValue;

    fn string_bag(values: &[&str]) -> Bag {
        Bag::new(
            Datatype::String,
            values
                .iter()
                .map(|s| AttributeValue::String((*s).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_request_attribute_lookup_and_memoization() {
        let registry = FunctionRegistry::standard();
        let fqn = AttributeFqn::new("cat", "attr");
        let mut ctx = ContextBuilder::new()
            .attribute(fqn.clone(), string_bag(&["v1"]))
            .build(&registry);

        let bag = ctx.resolve_designator(&fqn, Datatype::String).unwrap();
        assert_eq!(bag, string_bag(&["v1"]));
        // idempotent across repeated resolution within one context
        let again = ctx.resolve_designator(&fqn, Datatype::String).unwrap();
        assert_eq!(bag, again);
    }

    #[test]
    fn test_datatype_mismatch_is_processing_error() {
        let registry = FunctionRegistry::standard();
        let fqn = AttributeFqn::new("cat", "attr");
        let mut ctx = ContextBuilder::new()
            .attribute(fqn.clone(), string_bag(&["v1"]))
            .build(&registry);
        assert!(ctx.resolve_designator(&fqn, Datatype::Integer).is_err());
    }

    #[test]
    fn test_any_issuer_matching() {
        let registry = FunctionRegistry::standard();
        let issued = AttributeFqn::with_issuer("cat", "attr", Some("issuer-a"));
        let mut ctx = ContextBuilder::new()
            .attribute(issued.clone(), string_bag(&["v1"]))
            .build(&registry);

        let bare = AttributeFqn::new("cat", "attr");
        let bag = ctx.resolve_designator(&bare, Datatype::String).unwrap();
        assert_eq!(bag.len(), 1);

        // strict mode: no widening
        let mut strict_ctx = ContextBuilder::new()
            .attribute(issued, string_bag(&["v1"]))
            .strict_issuer_match(true)
            .build(&registry);
        let empty = strict_ctx.resolve_designator(&bare, Datatype::String).unwrap();
        assert!(empty.is_empty());
    }

    struct FixedProvider {
        declared: Vec<AttributeDesignatorType>,
        value: &'static str,
    }

    impl AttributeProvider for FixedProvider {
        fn provided_attributes(&self) -> &[AttributeDesignatorType] {
            &self.declared
        }
        fn resolve(
            &self,
            _fqn: &AttributeFqn,
            _datatype: Datatype,
            _request: &RequestAttributes<'_>,
        ) -> Result<Bag, EvalError> {
            Ok(Bag::singleton(AttributeValue::String(self.value.into())))
        }
    }

    #[test]
    fn test_provider_consulted_after_request() {
        let registry = FunctionRegistry::standard();
        let providers: Vec<Arc<dyn AttributeProvider>> = vec![Arc::new(FixedProvider {
            declared: vec![AttributeDesignatorType::new("cat", "pip-attr", Datatype::String)],
            value: "from-pip",
        })];
        let mut ctx = ContextBuilder::new().providers(&providers).build(&registry);

        let fqn = AttributeFqn::new("cat", "pip-attr");
        let bag = ctx.resolve_designator(&fqn, Datatype::String).unwrap();
        assert_eq!(bag, string_bag(&["from-pip"]));

        // uncovered designator: empty bag, no error
        let other = AttributeFqn::new("cat", "unknown");
        assert!(ctx.resolve_designator(&other, Datatype::String).unwrap().is_empty());
    }

    #[test]
    fn test_used_attribute_trace() {
        let registry = FunctionRegistry::standard();
        let fqn = AttributeFqn::new("cat", "attr");
        let mut ctx = ContextBuilder::new()
            .attribute(fqn.clone(), string_bag(&["v"]))
            .track_used_attributes(true)
            .build(&registry);
        let _ = ctx.resolve_designator(&fqn, Datatype::String);
        let _ = ctx.resolve_designator(&fqn, Datatype::String);
        assert_eq!(ctx.used_attributes(), &[fqn]);
    }
}
