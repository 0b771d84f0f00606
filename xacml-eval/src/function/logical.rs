//! Logical functions (XACML A.3.5).
//!
//! `or`, `and` and `n-of` are short-circuit: arguments are evaluated left
//! to right only as far as needed, and an Indeterminate argument is
//! absorbed whenever later arguments decide the result. `not` is an
//! ordinary eager function.

use super::helpers::{bool_arg, boolean};
use crate::context::EvaluationContext;
use crate::expression::{ExprValue, Expression};
use xacml_core::EvalError;

fn eval_to_bool(
    arg: &Expression,
    ctx: &mut EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    arg.evaluate(ctx)?.expect_bool()
}

/// `or`: true on the first true argument; false when all are false;
/// Indeterminate only when no argument was true and at least one failed.
pub fn eval_or(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    let mut first_error: Option<EvalError> = None;
    for arg in args {
        match eval_to_bool(arg, ctx) {
            Ok(true) => return Ok(boolean(true)),
            Ok(false) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(boolean(false)),
    }
}

/// `and`: false on the first false argument; true when all are true;
/// Indeterminate only when no argument was false and at least one failed.
pub fn eval_and(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    let mut first_error: Option<EvalError> = None;
    for arg in args {
        match eval_to_bool(arg, ctx) {
            Ok(false) => return Ok(boolean(false)),
            Ok(true) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(boolean(true)),
    }
}

/// `n-of(n, b1..bk)`: true once n arguments are true, false as soon as the
/// remaining arguments cannot reach n, Indeterminate only when failed
/// arguments could have tipped the count.
pub fn eval_n_of(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    let n = args[0]
        .evaluate(ctx)?
        .expect_primitive()?
        .as_integer()
        .ok_or_else(|| EvalError::processing("n-of: first argument is not an integer"))?;
    if n < 0 {
        return Err(EvalError::processing("n-of: negative threshold"));
    }
    if n == 0 {
        return Ok(boolean(true));
    }
    let n = n as usize;
    let rest = &args[1..];
    if n > rest.len() {
        return Err(EvalError::processing(format!(
            "n-of: threshold {n} exceeds argument count {}",
            rest.len()
        )));
    }

    let mut trues = 0usize;
    let mut failures = 0usize;
    let mut first_error: Option<EvalError> = None;
    for (i, arg) in rest.iter().enumerate() {
        match eval_to_bool(arg, ctx) {
            Ok(true) => {
                trues += 1;
                if trues >= n {
                    return Ok(boolean(true));
                }
            }
            Ok(false) => {}
            Err(e) => {
                failures += 1;
                first_error.get_or_insert(e);
            }
        }
        let remaining = rest.len() - i - 1;
        // Even if everything left (and every failure) were true, n is out
        // of reach: false regardless of the failures
        if trues + failures + remaining < n {
            return Ok(boolean(false));
        }
    }

    match first_error {
        // Failures could have tipped the count
        Some(e) if trues + failures >= n => Err(e),
        _ => Ok(boolean(false)),
    }
}

/// `not`: eager single-argument negation.
pub fn eval_not(vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    Ok(boolean(!bool_arg(vals, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::expression::AttributeDesignator;
    use crate::function::FunctionRegistry;
    use xacml_core::{AttributeFqn, AttributeValue, Datatype};

    fn t() -> Expression {
        Expression::Value(AttributeValue::Boolean(true))
    }

    fn f() -> Expression {
        Expression::Value(AttributeValue::Boolean(false))
    }

    fn n(v: i64) -> Expression {
        Expression::Value(AttributeValue::Integer(v))
    }

    /// A designator that always fails: mustBePresent on an absent attribute.
    fn failing() -> Expression {
        Expression::Designator(AttributeDesignator::new(
            AttributeFqn::new("cat", "absent"),
            Datatype::Boolean,
            true,
        ))
    }

    fn run(
        f: fn(&[Expression], &mut EvaluationContext<'_>) -> Result<ExprValue, EvalError>,
        args: &[Expression],
    ) -> Result<bool, EvalError> {
        let registry = FunctionRegistry::standard();
        let mut ctx = ContextBuilder::new().build(&registry);
        f(args, &mut ctx).and_then(|v| v.expect_bool())
    }

    #[test]
    fn test_or_short_circuits_past_failure() {
        // or(True, ⊥) = True even though the failing arg would error
        assert!(run(eval_or, &[t(), failing()]).unwrap());
        // failure before a true is still absorbed
        assert!(run(eval_or, &[failing(), t()]).unwrap());
        // no true: the failure surfaces
        assert!(run(eval_or, &[f(), failing()]).is_err());
        assert!(!run(eval_or, &[f(), f()]).unwrap());
        assert!(!run(eval_or, &[]).unwrap());
    }

    #[test]
    fn test_and_short_circuits_past_failure() {
        assert!(!run(eval_and, &[f(), failing()]).unwrap());
        assert!(!run(eval_and, &[failing(), f()]).unwrap());
        assert!(run(eval_and, &[t(), failing()]).is_err());
        assert!(run(eval_and, &[t(), t()]).unwrap());
        assert!(run(eval_and, &[]).unwrap());
    }

    #[test]
    fn test_n_of_reaches_threshold_early() {
        // 2 trues seen before the failing argument is ever evaluated
        assert!(run(eval_n_of, &[n(2), t(), t(), failing()]).unwrap());
    }

    #[test]
    fn test_n_of_unreachable_is_false() {
        // threshold 3 with only 2 potentially-true arguments left
        assert!(!run(eval_n_of, &[n(3), f(), f(), t(), t()]).unwrap());
    }

    #[test]
    fn test_n_of_failure_could_tip() {
        // 1 true + 1 failure against threshold 2: Indeterminate
        assert!(run(eval_n_of, &[n(2), t(), failing(), f()]).is_err());
    }

    #[test]
    fn test_n_of_zero_threshold() {
        assert!(run(eval_n_of, &[n(0), failing()]).unwrap());
    }

    #[test]
    fn test_n_of_threshold_exceeds_args() {
        assert!(run(eval_n_of, &[n(3), t(), t()]).is_err());
    }
}
