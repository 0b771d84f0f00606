//! PEP action expressions: obligations and advice (XACML 5.34 - 5.41, 7.18).
//!
//! Rule-scoped expressions are filtered to the rule's effect at parse time;
//! a non-matching FulfillOn/AppliesTo is dropped with a warning, exactly
//! once, instead of being re-checked per request. Policy-scoped expressions
//! keep both effects and are filtered by the combined decision at
//! evaluation time.

use tracing::warn;
use xacml_core::{
    Advice, AttributeAssignment, Effect, EvalError, Obligation, PepActions, XacmlError,
};
use xacml_eval::{EvaluationContext, ExprValue, Expression};

/// One AttributeAssignmentExpression.
#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub attribute_id: String,
    pub category: Option<String>,
    pub issuer: Option<String>,
    pub expr: Expression,
}

impl AssignmentExpression {
    pub fn new(attribute_id: impl Into<String>, expr: Expression) -> Result<Self, XacmlError> {
        if expr.return_type().is_none() {
            return Err(XacmlError::syntax(
                "AttributeAssignmentExpression cannot be a function reference",
            ));
        }
        Ok(Self {
            attribute_id: attribute_id.into(),
            category: None,
            issuer: None,
            expr,
        })
    }

    /// Evaluate to zero or more AttributeAssignments: a bag result fans out
    /// into one assignment per element, an empty bag into none.
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<Vec<AttributeAssignment>, EvalError> {
        let values = match self.expr.evaluate(ctx)? {
            ExprValue::Primitive(v) => vec![v],
            ExprValue::Bag(bag) => bag.into_iter().collect(),
        };
        Ok(values
            .into_iter()
            .map(|value| AttributeAssignment {
                attribute_id: self.attribute_id.clone(),
                category: self.category.clone(),
                issuer: self.issuer.clone(),
                value,
            })
            .collect())
    }
}

/// One ObligationExpression or AdviceExpression.
#[derive(Debug, Clone)]
pub struct PepActionExpression {
    pub id: String,
    /// FulfillOn (obligations) / AppliesTo (advice)
    pub applies_to: Effect,
    pub assignments: Vec<AssignmentExpression>,
}

impl PepActionExpression {
    pub fn new(
        id: impl Into<String>,
        applies_to: Effect,
        assignments: Vec<AssignmentExpression>,
    ) -> Self {
        Self {
            id: id.into(),
            applies_to,
            assignments,
        }
    }

    fn evaluate_assignments(
        &self,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<Vec<AttributeAssignment>, EvalError> {
        let mut out = Vec::with_capacity(self.assignments.len());
        for a in &self.assignments {
            out.extend(a.evaluate(ctx)?);
        }
        Ok(out)
    }
}

/// The obligation/advice expressions attached to one rule or policy.
#[derive(Debug, Clone, Default)]
pub struct PepActionExpressions {
    obligations: Vec<PepActionExpression>,
    advices: Vec<PepActionExpression>,
}

impl PepActionExpressions {
    /// Policy-scoped set: keeps every expression, filtered per decision at
    /// evaluation time.
    pub fn new(
        obligations: Vec<PepActionExpression>,
        advices: Vec<PepActionExpression>,
    ) -> Self {
        Self {
            obligations,
            advices,
        }
    }

    /// Rule-scoped set: expressions whose effect does not match the rule's
    /// are discarded here, once, at parse time.
    pub fn effect_filtered(
        scope: &str,
        effect: Effect,
        obligations: Vec<PepActionExpression>,
        advices: Vec<PepActionExpression>,
    ) -> Self {
        let keep = |kind: &str, exprs: Vec<PepActionExpression>| -> Vec<PepActionExpression> {
            exprs
                .into_iter()
                .filter(|e| {
                    if e.applies_to == effect {
                        true
                    } else {
                        warn!(
                            scope,
                            id = %e.id,
                            "ignored {kind} expression: applies-to {} does not match effect {effect}",
                            e.applies_to
                        );
                        false
                    }
                })
                .collect()
        };
        Self {
            obligations: keep("obligation", obligations),
            advices: keep("advice", advices),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty() && self.advices.is_empty()
    }

    /// Evaluate the expressions applying to `effect`. Any assignment
    /// failure fails the whole set (XACML 7.18: the enclosing rule/policy
    /// becomes Indeterminate).
    pub fn evaluate(
        &self,
        effect: Effect,
        ctx: &mut EvaluationContext<'_>,
    ) -> Result<PepActions, EvalError> {
        let mut obligations = Vec::new();
        for o in self.obligations.iter().filter(|o| o.applies_to == effect) {
            obligations.push(Obligation {
                id: o.id.clone(),
                assignments: o.evaluate_assignments(ctx)?,
            });
        }
        let mut advices = Vec::new();
        for a in self.advices.iter().filter(|a| a.applies_to == effect) {
            advices.push(Advice {
                id: a.id.clone(),
                assignments: a.evaluate_assignments(ctx)?,
            });
        }
        Ok(PepActions::new(obligations, advices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::AttributeValue;
    use xacml_eval::{ContextBuilder, FunctionRegistry};

    fn obligation(id: &str, applies_to: Effect) -> PepActionExpression {
        PepActionExpression::new(
            id,
            applies_to,
            vec![AssignmentExpression::new(
                "reason",
                Expression::Value(AttributeValue::String("because".into())),
            )
            .unwrap()],
        )
    }

    #[test]
    fn test_rule_scope_drops_mismatched_effect() {
        let actions = PepActionExpressions::effect_filtered(
            "Rule[r1]",
            Effect::Permit,
            vec![obligation("keep", Effect::Permit), obligation("drop", Effect::Deny)],
            vec![],
        );
        let registry = FunctionRegistry::standard();
        let mut ctx = ContextBuilder::new().build(&registry);
        let out = actions.evaluate(Effect::Permit, &mut ctx).unwrap();
        assert_eq!(out.obligations.len(), 1);
        assert_eq!(out.obligations[0].id, "keep");
    }

    #[test]
    fn test_policy_scope_filters_at_evaluation() {
        let actions = PepActionExpressions::new(
            vec![obligation("on-permit", Effect::Permit), obligation("on-deny", Effect::Deny)],
            vec![],
        );
        let registry = FunctionRegistry::standard();
        let mut ctx = ContextBuilder::new().build(&registry);

        let out = actions.evaluate(Effect::Deny, &mut ctx).unwrap();
        assert_eq!(out.obligations.len(), 1);
        assert_eq!(out.obligations[0].id, "on-deny");
    }

    #[test]
    fn test_assignment_bag_fans_out() {
        let registry = FunctionRegistry::standard();
        use xacml_core::Datatype;
        use xacml_eval::{Apply, FunctionId};
        let bag_expr = Expression::apply(
            Apply::new(
                FunctionId::BagOf(Datatype::String),
                vec![
                    Expression::Value(AttributeValue::String("a".into())),
                    Expression::Value(AttributeValue::String("b".into())),
                ],
                &registry,
            )
            .unwrap(),
        );
        let actions = PepActionExpressions::new(
            vec![PepActionExpression::new(
                "multi",
                Effect::Permit,
                vec![AssignmentExpression::new("attr", bag_expr).unwrap()],
            )],
            vec![],
        );
        let mut ctx = ContextBuilder::new().build(&registry);
        let out = actions.evaluate(Effect::Permit, &mut ctx).unwrap();
        assert_eq!(out.obligations[0].assignments.len(), 2);
    }
}
