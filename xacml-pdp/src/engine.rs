//! The PDP engine: preprocess, evaluate per individual request, cache,
//! post-process.
//!
//! `evaluate` never fails across the public API: invalid requests become a
//! Response holding a single Indeterminate Result, and every internal
//! evaluation failure is already a Result with an XACML status by the time
//! it reaches the response assembly.
//!
//! The engine is immutable after construction and safe to share across
//! threads; each individual request gets its own evaluation context.

use crate::cache::{fingerprint, DecisionCache, MemoryDecisionCache};
use crate::config::{PdpConfig, StandardEnvAttributeSource};
use crate::postprocess::{DefaultPostprocessor, ResultPostprocessor};
use crate::preprocess::{DefaultPreprocessor, RequestPreprocessor};
use crate::provider_registry::AttributeProviderRegistry;
use crate::request::{IndividualDecisionRequest, Request};
use crate::response::Response;
use chrono::{DateTime as ChronoDateTime, SecondsFormat, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use xacml_core::{names, AttributeFqn, AttributeValue, Bag, DecisionResult};
use xacml_policy::RootPolicyEvaluator;
use xacml_eval::{ContextBuilder, FunctionRegistry, XPathEvaluator};

/// PDP-issued environment attributes, all derived from one snapshot so
/// current-time, current-date, and current-dateTime agree.
fn pdp_issued_attributes(now: ChronoDateTime<Utc>) -> Vec<(AttributeFqn, Bag)> {
    let datetime_lexical = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let date_lexical = now.format("%Y-%m-%dZ").to_string();
    let time_lexical = now.format("%H:%M:%S%.3fZ").to_string();

    let parse = |dt, lexical: &str| {
        AttributeValue::parse(dt, lexical).expect("formatted snapshot lexical form")
    };
    vec![
        (
            AttributeFqn::new(names::category::ENVIRONMENT, names::attribute::CURRENT_DATETIME),
            Bag::singleton(parse(xacml_core::Datatype::DateTime, &datetime_lexical)),
        ),
        (
            AttributeFqn::new(names::category::ENVIRONMENT, names::attribute::CURRENT_DATE),
            Bag::singleton(parse(xacml_core::Datatype::Date, &date_lexical)),
        ),
        (
            AttributeFqn::new(names::category::ENVIRONMENT, names::attribute::CURRENT_TIME),
            Bag::singleton(parse(xacml_core::Datatype::Time, &time_lexical)),
        ),
    ]
}

fn is_standard_env_attribute(fqn: &AttributeFqn) -> bool {
    fqn.category() == names::category::ENVIRONMENT
        && matches!(
            fqn.id(),
            names::attribute::CURRENT_TIME
                | names::attribute::CURRENT_DATE
                | names::attribute::CURRENT_DATETIME
        )
}

/// Builder for [`PdpEngine`].
pub struct PdpEngineBuilder {
    root: RootPolicyEvaluator,
    config: PdpConfig,
    providers: AttributeProviderRegistry,
    functions: FunctionRegistry,
    preprocessor: Option<Box<dyn RequestPreprocessor>>,
    postprocessor: Box<dyn ResultPostprocessor>,
    cache: Option<Box<dyn DecisionCache>>,
    xpath: Option<Box<dyn XPathEvaluator>>,
}

impl PdpEngineBuilder {
    pub fn new(root: RootPolicyEvaluator) -> Self {
        Self {
            root,
            config: PdpConfig::default(),
            providers: AttributeProviderRegistry::empty(),
            functions: FunctionRegistry::standard(),
            preprocessor: None,
            postprocessor: Box::new(DefaultPostprocessor),
            cache: None,
            xpath: None,
        }
    }

    pub fn config(mut self, config: PdpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn attribute_providers(mut self, providers: AttributeProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    pub fn request_preprocessor(mut self, preprocessor: Box<dyn RequestPreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn result_postprocessor(mut self, postprocessor: Box<dyn ResultPostprocessor>) -> Self {
        self.postprocessor = postprocessor;
        self
    }

    pub fn decision_cache(mut self, cache: Box<dyn DecisionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn xpath_evaluator(mut self, xpath: Box<dyn XPathEvaluator>) -> Self {
        self.xpath = Some(xpath);
        self
    }

    pub fn build(self) -> PdpEngine {
        let supports_combined = self.postprocessor.supports_combined_decision();
        let preprocessor = self
            .preprocessor
            .unwrap_or_else(|| Box::new(DefaultPreprocessor::new(supports_combined)));
        let cache = self.cache.or_else(|| {
            self.config
                .decision_cache_capacity
                .map(|cap| Box::new(MemoryDecisionCache::new(cap)) as Box<dyn DecisionCache>)
        });
        PdpEngine {
            root: self.root,
            config: self.config,
            providers: self.providers,
            functions: self.functions,
            preprocessor,
            postprocessor: self.postprocessor,
            cache,
            xpath: self.xpath,
        }
    }
}

/// The policy decision point.
pub struct PdpEngine {
    root: RootPolicyEvaluator,
    config: PdpConfig,
    providers: AttributeProviderRegistry,
    functions: FunctionRegistry,
    preprocessor: Box<dyn RequestPreprocessor>,
    postprocessor: Box<dyn ResultPostprocessor>,
    cache: Option<Box<dyn DecisionCache>>,
    xpath: Option<Box<dyn XPathEvaluator>>,
}

impl PdpEngine {
    pub fn builder(root: RootPolicyEvaluator) -> PdpEngineBuilder {
        PdpEngineBuilder::new(root)
    }

    /// Evaluate a request against the policy tree.
    pub fn evaluate(&self, request: &Request) -> Response {
        self.evaluate_at(request, Utc::now())
    }

    /// Evaluate with an explicit environment snapshot (deterministic
    /// replay and testing).
    pub fn evaluate_at(&self, request: &Request, now: ChronoDateTime<Utc>) -> Response {
        let individuals = match self.preprocessor.preprocess(request) {
            Ok(individuals) => individuals,
            Err(e) => {
                info!(error = %e, "request rejected by preprocessor");
                return Response::indeterminate(e.to_status());
            }
        };
        debug!(count = individuals.len(), "individual decision requests");

        let env = pdp_issued_attributes(now);

        let mut results: Vec<Option<DecisionResult>> = match &self.cache {
            Some(cache) => cache.get_all(&individuals),
            None => vec![None; individuals.len()],
        };

        let mut fresh = Vec::new();
        for (individual, slot) in individuals.iter().zip(results.iter_mut()) {
            if slot.is_none() {
                let result = self.evaluate_individual(individual, &env);
                if self.cache.is_some() {
                    fresh.push((fingerprint(individual), result.clone()));
                }
                *slot = Some(result);
            }
        }
        if let (Some(cache), false) = (&self.cache, fresh.is_empty()) {
            cache.put_all(fresh);
        }

        let paired = individuals
            .into_iter()
            .zip(results)
            .map(|(individual, result)| (individual, result.expect("slot filled above")))
            .collect();
        self.postprocessor.process(paired, request.combined_decision)
    }

    fn evaluate_individual(
        &self,
        individual: &IndividualDecisionRequest,
        env: &[(AttributeFqn, Bag)],
    ) -> DecisionResult {
        let mut builder = ContextBuilder::new()
            .strict_issuer_match(self.config.strict_attribute_issuer_match)
            .return_policy_id_list(individual.return_policy_id_list)
            .track_used_attributes(self.config.track_used_attributes)
            .providers(self.providers.providers());

        if self.config.xpath_enabled {
            if let Some(xpath) = &self.xpath {
                builder = builder.xpath(xpath.as_ref());
            }
        }
        if let Some(ms) = self.config.evaluation_timeout_ms {
            builder = builder.deadline(Instant::now() + Duration::from_millis(ms));
        }

        let pdp_wins = self.config.std_env_attribute_source == StandardEnvAttributeSource::PdpOnly;
        for (fqn, bag) in &individual.named_attributes {
            if pdp_wins && is_standard_env_attribute(fqn) {
                continue;
            }
            builder = builder.attribute(fqn.clone(), bag.clone());
        }
        match self.config.std_env_attribute_source {
            StandardEnvAttributeSource::RequestOnly => {}
            StandardEnvAttributeSource::PdpOnly => {
                for (fqn, bag) in env {
                    builder = builder.attribute(fqn.clone(), bag.clone());
                }
            }
            StandardEnvAttributeSource::RequestElsePdp => {
                for (fqn, bag) in env {
                    let in_request = individual
                        .named_attributes
                        .iter()
                        .any(|(req_fqn, _)| req_fqn == fqn);
                    if !in_request {
                        builder = builder.attribute(fqn.clone(), bag.clone());
                    }
                }
            }
        }
        for (category, xml) in &individual.contents {
            builder = builder.content(category.clone(), xml.clone());
        }

        let mut ctx = builder.build(&self.functions);
        let mut result = self.root.find_and_evaluate(&mut ctx);
        if self.config.track_used_attributes {
            result.used_attributes = ctx.used_attributes().to_vec();
        }
        debug!(decision = %result, "individual decision");
        result
    }

    /// Drop all cached decisions. Must be called when the policy tree the
    /// engine was built from is replaced.
    pub fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Release resources: cascades to the root policy resolver, each
    /// attribute provider, and the decision cache.
    pub fn close(&self) {
        self.root.close();
        self.providers.close();
        if let Some(cache) = &self.cache {
            cache.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdp_issued_attributes_agree() {
        let now = Utc::now();
        let env = pdp_issued_attributes(now);
        assert_eq!(env.len(), 3);
        for (fqn, bag) in &env {
            assert!(is_standard_env_attribute(fqn));
            assert_eq!(bag.len(), 1);
        }
        // date and dateTime derive from the same instant
        let datetime = env[0].1.single().unwrap().canonical();
        let date = env[1].1.single().unwrap().canonical();
        assert!(datetime.starts_with(date.trim_end_matches('Z')));
    }
}
