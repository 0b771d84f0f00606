//! Result post-processing: decision results -> Response.
//!
//! The default post-processor maps each individual result to one Result
//! element. The combined-decision post-processor additionally implements
//! the Multiple Decision Profile's `CombinedDecision`: all individual
//! decisions collapse into a single Result when they agree and carry no
//! obligations or advice; anything else is a processing-error
//! Indeterminate.

use crate::request::IndividualDecisionRequest;
use crate::response::{Response, ResultItem};
use xacml_core::{DecisionResult, EvalError};

/// Assembles the response from evaluated individual requests.
pub trait ResultPostprocessor: Send + Sync {
    /// Whether requests may set `CombinedDecision`; validated by the
    /// preprocessor before evaluation.
    fn supports_combined_decision(&self) -> bool {
        false
    }

    fn process(
        &self,
        results: Vec<(IndividualDecisionRequest, DecisionResult)>,
        combined_decision: bool,
    ) -> Response;
}

fn one_result_per_individual(
    results: Vec<(IndividualDecisionRequest, DecisionResult)>,
) -> Response {
    Response::new(
        results
            .into_iter()
            .map(|(individual, decision)| ResultItem::from_decision(decision, individual.echo))
            .collect(),
    )
}

/// Identity post-processing: one Result per individual decision request.
#[derive(Debug, Default)]
pub struct DefaultPostprocessor;

impl ResultPostprocessor for DefaultPostprocessor {
    fn process(
        &self,
        results: Vec<(IndividualDecisionRequest, DecisionResult)>,
        _combined_decision: bool,
    ) -> Response {
        one_result_per_individual(results)
    }
}

/// Post-processor implementing `CombinedDecision` aggregation.
#[derive(Debug, Default)]
pub struct CombinedDecisionPostprocessor;

impl ResultPostprocessor for CombinedDecisionPostprocessor {
    fn supports_combined_decision(&self) -> bool {
        true
    }

    fn process(
        &self,
        results: Vec<(IndividualDecisionRequest, DecisionResult)>,
        combined_decision: bool,
    ) -> Response {
        if !combined_decision {
            return one_result_per_individual(results);
        }

        let mut combined: Option<DecisionResult> = None;
        for (_, result) in &results {
            if !result.pep_actions.is_empty() {
                return Response::indeterminate(
                    EvalError::processing(
                        "cannot combine decisions carrying obligations or advice",
                    )
                    .to_status(),
                );
            }
            match &combined {
                None => combined = Some(result.clone()),
                Some(first) if first.decision == result.decision => {}
                Some(_) => {
                    return Response::indeterminate(
                        EvalError::processing("individual decisions differ").to_status(),
                    )
                }
            }
        }

        match combined {
            Some(result) => Response::new(vec![ResultItem::from_decision(result, Vec::new())]),
            None => Response::indeterminate(
                EvalError::processing("no individual decisions to combine").to_status(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::{Decision, Obligation, PepActions};

    fn individual() -> IndividualDecisionRequest {
        IndividualDecisionRequest {
            named_attributes: vec![],
            contents: vec![],
            return_policy_id_list: false,
            echo: vec![],
        }
    }

    #[test]
    fn test_combined_agreeing_decisions() {
        let results = vec![
            (individual(), DecisionResult::simple_permit()),
            (individual(), DecisionResult::simple_permit()),
        ];
        let response = CombinedDecisionPostprocessor.process(results, true);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].decision, Decision::Permit);
    }

    #[test]
    fn test_combined_differing_decisions_indeterminate() {
        let results = vec![
            (individual(), DecisionResult::simple_permit()),
            (individual(), DecisionResult::simple_deny()),
        ];
        let response = CombinedDecisionPostprocessor.process(results, true);
        assert_eq!(response.results[0].decision, Decision::Indeterminate);
    }

    #[test]
    fn test_combined_rejects_obligations() {
        let mut with_ob = DecisionResult::simple_permit();
        with_ob.pep_actions = PepActions::new(
            vec![Obligation {
                id: "log".into(),
                assignments: vec![],
            }],
            vec![],
        );
        let response =
            CombinedDecisionPostprocessor.process(vec![(individual(), with_ob)], true);
        assert_eq!(response.results[0].decision, Decision::Indeterminate);
    }
}
