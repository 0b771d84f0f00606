//! Condition evaluation (XACML 5.25).

use xacml_core::{Datatype, EvalError, ValueType, XacmlError};
use xacml_eval::{EvaluationContext, Expression};

/// A boolean-valued condition wrapping one expression.
#[derive(Debug, Clone)]
pub struct Condition {
    expr: Expression,
}

impl Condition {
    /// Build a condition; the expression must be declared boolean.
    pub fn new(expr: Expression) -> Result<Self, XacmlError> {
        match expr.return_type() {
            Some(ValueType::Primitive(Datatype::Boolean)) => Ok(Self { expr }),
            other => Err(XacmlError::syntax(format!(
                "Condition expression must return boolean, not {other:?}"
            ))),
        }
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
        self.expr.evaluate(ctx)?.expect_bool()
    }
}

/// Evaluate an optional Condition; absent means true.
pub fn evaluate_condition(
    condition: Option<&Condition>,
    ctx: &mut EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    match condition {
        Some(c) => c.evaluate(ctx),
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::AttributeValue;
    use xacml_eval::{ContextBuilder, FunctionRegistry};

    #[test]
    fn test_non_boolean_rejected() {
        let err = Condition::new(Expression::Value(AttributeValue::Integer(1)));
        assert!(err.is_err());
    }

    #[test]
    fn test_absent_condition_is_true() {
        let registry = FunctionRegistry::standard();
        let mut ctx = ContextBuilder::new().build(&registry);
        assert!(evaluate_condition(None, &mut ctx).unwrap());

        let c = Condition::new(Expression::Value(AttributeValue::Boolean(false))).unwrap();
        assert!(!evaluate_condition(Some(&c), &mut ctx).unwrap());
    }
}
