//! Rule evaluation (XACML 7.10 - 7.11).

use crate::condition::{evaluate_condition, Condition};
use crate::pep_action::{PepActionExpression, PepActionExpressions};
use crate::target::{evaluate_target, Target};
use crate::Decidable;
use tracing::{debug, info};
use xacml_core::{DecisionResult, Effect};
use xacml_eval::EvaluationContext;

/// A XACML Rule: target, condition, effect, and the effect-matching PEP
/// action expressions.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    effect: Effect,
    target: Option<Target>,
    condition: Option<Condition>,
    pep_actions: PepActionExpressions,
}

impl Rule {
    /// Create a rule. Obligation/advice expressions whose FulfillOn or
    /// AppliesTo does not match `effect` are dropped here with a warning.
    pub fn new(
        id: impl Into<String>,
        effect: Effect,
        target: Option<Target>,
        condition: Option<Condition>,
        obligations: Vec<PepActionExpression>,
        advices: Vec<PepActionExpression>,
    ) -> Self {
        let id = id.into();
        let pep_actions = PepActionExpressions::effect_filtered(
            &format!("Rule[{id}]"),
            effect,
            obligations,
            advices,
        );
        Self {
            id,
            effect,
            target,
            condition,
            pep_actions,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }
}

impl Decidable for Rule {
    /// Evaluate the rule against the supplied context: check the target,
    /// then the condition, then produce the effect with the rule's PEP
    /// actions. A rule with no target inherits its parent's match (the
    /// policy tree only reaches this rule when the parent target matched).
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> DecisionResult {
        match evaluate_target(self.target.as_ref(), ctx) {
            Ok(false) => {
                debug!(rule = %self.id, "target -> no-match");
                return DecisionResult::not_applicable();
            }
            Ok(true) => debug!(rule = %self.id, "target -> match"),
            Err(e) => {
                // Extended Indeterminate per 7.11: the rule's own effect
                info!(rule = %self.id, error = %e, "target -> indeterminate");
                return DecisionResult::indeterminate(self.effect.as_extended_indeterminate(), &e);
            }
        }

        match evaluate_condition(self.condition.as_ref(), ctx) {
            Ok(true) => debug!(rule = %self.id, "condition -> true"),
            Ok(false) => {
                debug!(rule = %self.id, "condition -> false");
                return DecisionResult::not_applicable();
            }
            Err(e) => {
                info!(rule = %self.id, error = %e, "condition -> indeterminate");
                return DecisionResult::indeterminate(self.effect.as_extended_indeterminate(), &e);
            }
        }

        // Already filtered to this rule's effect at construction; a failed
        // assignment makes the whole rule Indeterminate (7.18)
        let pep_actions = match self.pep_actions.evaluate(self.effect, ctx) {
            Ok(actions) => actions,
            Err(e) => {
                info!(rule = %self.id, error = %e, "obligation/advice -> indeterminate");
                return DecisionResult::indeterminate(self.effect.as_extended_indeterminate(), &e);
            }
        };

        let result = DecisionResult::applicable(self.effect, pep_actions);
        debug!(rule = %self.id, decision = %result, "rule evaluated");
        result
    }
}
