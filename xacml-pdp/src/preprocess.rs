//! Request preprocessing: Request -> individual decision requests.
//!
//! The default preprocessor is one-to-one: every Attributes block
//! contributes to a single individual request. The repeated-category
//! preprocessor implements the Multiple Decision Profile's
//! repeated-attribute-categories variant: categories whose Attributes
//! block appears more than once fan out into the Cartesian product, one
//! individual request per combination, preserving per-category grouping.
//!
//! Both validate the request envelope first: `MultiRequests` is rejected
//! (the `RequestReference` feature is not evaluated), and
//! `CombinedDecision` is rejected unless the result post-processor
//! declared combining support.

use crate::request::{IndividualDecisionRequest, Request, RequestCategory};
use tracing::debug;
use xacml_core::EvalError;

/// Splits a request into individual decision requests.
pub trait RequestPreprocessor: Send + Sync {
    /// A syntax failure here becomes the response's single Indeterminate
    /// Result; no policy evaluation happens.
    fn preprocess(&self, request: &Request) -> Result<Vec<IndividualDecisionRequest>, EvalError>;
}

fn validate_envelope(request: &Request, supports_combined: bool) -> Result<(), EvalError> {
    if request.has_multi_requests {
        return Err(EvalError::syntax(
            "MultiRequests/RequestReference is not supported",
        ));
    }
    if request.combined_decision && !supports_combined {
        return Err(EvalError::syntax(
            "CombinedDecision is not supported by this PDP",
        ));
    }
    if request.combined_decision && request.return_policy_id_list {
        // Multiple Decision Profile: the two are mutually exclusive
        return Err(EvalError::syntax(
            "CombinedDecision cannot be used with ReturnPolicyIdList",
        ));
    }
    Ok(())
}

/// One-to-one preprocessing; repeated categories merge into the single
/// individual request.
pub struct DefaultPreprocessor {
    supports_combined: bool,
}

impl DefaultPreprocessor {
    pub fn new(supports_combined: bool) -> Self {
        Self { supports_combined }
    }
}

impl RequestPreprocessor for DefaultPreprocessor {
    fn preprocess(&self, request: &Request) -> Result<Vec<IndividualDecisionRequest>, EvalError> {
        validate_envelope(request, self.supports_combined)?;
        let refs: Vec<&RequestCategory> = request.categories.iter().collect();
        Ok(vec![IndividualDecisionRequest::from_categories(
            request, &refs,
        )?])
    }
}

/// Repeated-attribute-categories fan-out (Multiple Decision Profile 2.3).
pub struct RepeatedCategoryPreprocessor {
    supports_combined: bool,
}

impl RepeatedCategoryPreprocessor {
    pub fn new(supports_combined: bool) -> Self {
        Self { supports_combined }
    }
}

impl RequestPreprocessor for RepeatedCategoryPreprocessor {
    fn preprocess(&self, request: &Request) -> Result<Vec<IndividualDecisionRequest>, EvalError> {
        validate_envelope(request, self.supports_combined)?;

        // Group Attributes blocks by category, in first-appearance order
        let mut groups: Vec<(&str, Vec<&RequestCategory>)> = Vec::new();
        for cat in &request.categories {
            match groups.iter_mut().find(|(name, _)| *name == cat.category) {
                Some((_, members)) => members.push(cat),
                None => groups.push((cat.category.as_str(), vec![cat])),
            }
        }

        let combination_count: usize = groups.iter().map(|(_, m)| m.len()).product();
        debug!(
            categories = groups.len(),
            combinations = combination_count,
            "repeated-category fan-out"
        );

        // Cartesian product over the groups, rightmost group varying fastest
        let mut individuals = Vec::with_capacity(combination_count);
        let mut indices = vec![0usize; groups.len()];
        loop {
            let selection: Vec<&RequestCategory> = groups
                .iter()
                .zip(&indices)
                .map(|((_, members), &i)| members[i])
                .collect();
            individuals.push(IndividualDecisionRequest::from_categories(
                request, &selection,
            )?);

            let mut pos = groups.len();
            loop {
                if pos == 0 {
                    return Ok(individuals);
                }
                pos -= 1;
                indices[pos] += 1;
                if indices[pos] < groups[pos].1.len() {
                    break;
                }
                indices[pos] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestAttribute;
    use xacml_core::AttributeValue;

    fn category(name: &str, attr_value: &str) -> RequestCategory {
        RequestCategory {
            category: name.into(),
            content: None,
            attributes: vec![RequestAttribute {
                id: format!("{name}-id"),
                issuer: None,
                values: vec![AttributeValue::String(attr_value.into())],
                include_in_result: false,
            }],
        }
    }

    #[test]
    fn test_default_is_one_to_one() {
        let request = Request {
            categories: vec![category("subject", "alice"), category("resource", "doc1")],
            ..Request::default()
        };
        let out = DefaultPreprocessor::new(false).preprocess(&request).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].named_attributes.len(), 2);
    }

    #[test]
    fn test_multi_requests_rejected() {
        let request = Request {
            has_multi_requests: true,
            ..Request::default()
        };
        assert!(DefaultPreprocessor::new(false).preprocess(&request).is_err());
    }

    #[test]
    fn test_combined_decision_requires_support() {
        let request = Request {
            combined_decision: true,
            ..Request::default()
        };
        assert!(DefaultPreprocessor::new(false).preprocess(&request).is_err());
        assert!(DefaultPreprocessor::new(true).preprocess(&request).is_ok());
    }

    #[test]
    fn test_repeated_category_cartesian_product() {
        let request = Request {
            categories: vec![
                category("resource", "doc1"),
                category("resource", "doc2"),
                category("subject", "alice"),
                category("action", "read"),
                category("action", "write"),
            ],
            ..Request::default()
        };
        let out = RepeatedCategoryPreprocessor::new(false)
            .preprocess(&request)
            .unwrap();
        // 2 resources x 1 subject x 2 actions
        assert_eq!(out.len(), 4);

        // each individual keeps exactly one block per category
        for individual in &out {
            assert_eq!(individual.named_attributes.len(), 3);
        }

        // rightmost category (action) varies fastest
        let action_of = |i: usize| {
            out[i]
                .named_attributes
                .iter()
                .find(|(fqn, _)| fqn.category() == "action")
                .map(|(_, bag)| bag.values()[0].canonical())
                .unwrap()
        };
        assert_eq!(action_of(0), "read");
        assert_eq!(action_of(1), "write");
        assert_eq!(action_of(2), "read");
    }

    #[test]
    fn test_no_repeats_single_individual() {
        let request = Request {
            categories: vec![category("subject", "alice")],
            ..Request::default()
        };
        let out = RepeatedCategoryPreprocessor::new(false)
            .preprocess(&request)
            .unwrap();
        assert_eq!(out.len(), 1);
    }
}
