//! Higher-order bag functions (XACML A.3.15).
//!
//! Each takes a first-order boolean sub-function reference plus bags, and
//! folds the sub-function's results with `or`/`and` semantics, including
//! their Indeterminate absorption: a failed application is absorbed
//! whenever some other application decides the fold.
//!
//! Bag arguments themselves are evaluated eagerly (a failed bag argument
//! fails the whole call); laziness applies to the sub-function
//! applications.

use crate::context::EvaluationContext;
use crate::expression::{ExprValue, Expression};
use crate::function::{self, FunctionId};
use xacml_core::{AttributeValue, Bag, EvalError};

/// Fold target: `or` decides on true, `and` decides on false.
#[derive(Clone, Copy)]
enum Fold {
    Or,
    And,
}

impl Fold {
    fn decided(self, b: bool) -> bool {
        match self {
            Fold::Or => b,
            Fold::And => !b,
        }
    }

    fn default_result(self) -> bool {
        match self {
            Fold::Or => false,
            Fold::And => true,
        }
    }
}

/// Fold boolean results with short-circuit and Indeterminate absorption.
fn fold_results(
    fold: Fold,
    results: impl Iterator<Item = Result<bool, EvalError>>,
) -> Result<bool, EvalError> {
    let mut first_error: Option<EvalError> = None;
    for r in results {
        match r {
            Ok(b) if fold.decided(b) => return Ok(b),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(fold.default_result()),
    }
}

fn apply_sub(
    sub: &FunctionId,
    parts: &[ExprValue],
    ctx: &EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    function::apply_first_order(sub, parts, ctx)?.expect_bool()
}

/// An evaluated argument: fixed primitive, or a bag to iterate.
enum Slot {
    Fixed(AttributeValue),
    Iterated(Bag),
}

fn evaluate_slots(
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<Vec<Slot>, EvalError> {
    let mut slots = Vec::with_capacity(args.len());
    for arg in args {
        slots.push(match arg.evaluate(ctx)? {
            ExprValue::Primitive(v) => Slot::Fixed(v),
            ExprValue::Bag(b) => Slot::Iterated(b),
        });
    }
    Ok(slots)
}

pub fn eval_higher_order(
    id: &FunctionId,
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    let Some(Expression::FunctionRef(sub)) = args.first() else {
        return Err(EvalError::processing(format!(
            "{id}: first argument is not a function reference"
        )));
    };
    let slots = evaluate_slots(&args[1..], ctx)?;

    match id {
        FunctionId::AnyOf | FunctionId::AllOf => {
            let fold = if *id == FunctionId::AnyOf { Fold::Or } else { Fold::And };
            single_bag_fold(sub, &slots, fold, ctx).map(bool_value)
        }

        FunctionId::AnyOfAny => cross_product_fold(sub, &slots, Fold::Or, ctx).map(bool_value),

        FunctionId::AllOfAny | FunctionId::AnyOfAll | FunctionId::AllOfAll => {
            let (outer, inner) = match id {
                FunctionId::AllOfAny => (Fold::And, Fold::Or),
                FunctionId::AnyOfAll => (Fold::Or, Fold::And),
                _ => (Fold::And, Fold::And),
            };
            let (first, second) = match &slots[..] {
                [Slot::Iterated(a), Slot::Iterated(b)] => (a, b),
                _ => {
                    return Err(EvalError::processing(format!(
                        "{id}: expected exactly two bags"
                    )))
                }
            };
            fold_results(
                outer,
                first.iter().map(|x| {
                    fold_results(
                        inner,
                        second.iter().map(|y| {
                            apply_sub(
                                sub,
                                &[
                                    ExprValue::Primitive(x.clone()),
                                    ExprValue::Primitive(y.clone()),
                                ],
                                ctx,
                            )
                        }),
                    )
                }),
            )
            .map(bool_value)
        }

        FunctionId::Map => {
            let bag_idx = slots
                .iter()
                .position(|s| matches!(s, Slot::Iterated(_)))
                .ok_or_else(|| EvalError::processing("map: no bag argument"))?;
            let Slot::Iterated(bag) = &slots[bag_idx] else {
                unreachable!()
            };
            let mut out = Vec::with_capacity(bag.len());
            let mut elem_type = None;
            for element in bag.iter() {
                let parts = substitute(&slots, bag_idx, element);
                // No absorption in map: any failed application fails the map
                let v = function::apply_first_order(sub, &parts, ctx)?
                    .expect_primitive()?
                    .clone();
                elem_type.get_or_insert(v.datatype());
                out.push(v);
            }
            let datatype = elem_type.unwrap_or_else(|| {
                // Empty input bag: the sub-function's declared return type
                ctx.functions()
                    .signature_of(sub)
                    .map(|sig| sig.ret.datatype())
                    .unwrap_or(bag.datatype())
            });
            Ok(ExprValue::Bag(Bag::new(datatype, out)))
        }

        other => Err(EvalError::processing(format!(
            "non-higher-order function routed to higher-order module: {other}"
        ))),
    }
}

fn bool_value(b: bool) -> ExprValue {
    ExprValue::Primitive(AttributeValue::Boolean(b))
}

/// Argument vector with the iterated slot replaced by one bag element.
fn substitute(slots: &[Slot], bag_idx: usize, element: &AttributeValue) -> Vec<ExprValue> {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            _ if i == bag_idx => ExprValue::Primitive(element.clone()),
            Slot::Fixed(v) => ExprValue::Primitive(v.clone()),
            Slot::Iterated(b) => ExprValue::Bag(b.clone()),
        })
        .collect()
}

/// any-of / all-of: one bag among the arguments, folded element-wise.
fn single_bag_fold(
    sub: &FunctionId,
    slots: &[Slot],
    fold: Fold,
    ctx: &EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    let bag_idx = slots
        .iter()
        .position(|s| matches!(s, Slot::Iterated(_)))
        .ok_or_else(|| EvalError::processing("expected one bag argument"))?;
    let Slot::Iterated(bag) = &slots[bag_idx] else {
        unreachable!()
    };
    fold_results(
        fold,
        bag.iter()
            .map(|element| apply_sub(sub, &substitute(slots, bag_idx, element), ctx)),
    )
}

/// any-of-any: fold over the cross product of every argument (primitives
/// behave as singleton bags).
fn cross_product_fold(
    sub: &FunctionId,
    slots: &[Slot],
    fold: Fold,
    ctx: &EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    let lengths: Vec<usize> = slots
        .iter()
        .map(|s| match s {
            Slot::Fixed(_) => 1,
            Slot::Iterated(b) => b.len(),
        })
        .collect();
    if lengths.iter().any(|&l| l == 0) {
        return Ok(fold.default_result());
    }

    let mut odometer = vec![0usize; slots.len()];
    let mut first_error: Option<EvalError> = None;
    loop {
        let parts: Vec<ExprValue> = slots
            .iter()
            .zip(&odometer)
            .map(|(slot, &i)| match slot {
                Slot::Fixed(v) => ExprValue::Primitive(v.clone()),
                Slot::Iterated(b) => ExprValue::Primitive(b.values()[i].clone()),
            })
            .collect();
        match apply_sub(sub, &parts, ctx) {
            Ok(b) if fold.decided(b) => return Ok(b),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }

        // Advance the odometer, rightmost position fastest
        let mut pos = slots.len();
        loop {
            if pos == 0 {
                return match first_error {
                    Some(e) => Err(e),
                    None => Ok(fold.default_result()),
                };
            }
            pos -= 1;
            odometer[pos] += 1;
            if odometer[pos] < lengths[pos] {
                break;
            }
            odometer[pos] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use crate::function::FunctionRegistry;
    use xacml_core::Datatype;

    fn sub_equal() -> Expression {
        Expression::FunctionRef(FunctionId::Equal(Datatype::String))
    }

    fn strv(s: &str) -> Expression {
        Expression::Value(AttributeValue::String(s.into()))
    }

    /// Constant bag via the `<type>-bag` constructor function.
    fn sbag(values: &[&str]) -> Expression {
        let registry = FunctionRegistry::standard();
        let args: Vec<Expression> = values.iter().map(|s| strv(s)).collect();
        Expression::apply(
            crate::expression::Apply::new(FunctionId::BagOf(Datatype::String), args, &registry)
                .unwrap(),
        )
    }

    fn run(id: FunctionId, args: Vec<Expression>) -> Result<ExprValue, EvalError> {
        let registry = FunctionRegistry::standard();
        let mut ctx = ContextBuilder::new().build(&registry);
        eval_higher_order(&id, &args, &mut ctx)
    }

    #[test]
    fn test_any_of() {
        let out = run(
            FunctionId::AnyOf,
            vec![sub_equal(), strv("b"), sbag(&["a", "b", "c"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(true));

        let out = run(
            FunctionId::AnyOf,
            vec![sub_equal(), strv("z"), sbag(&["a", "b"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(false));
    }

    #[test]
    fn test_all_of() {
        let out = run(
            FunctionId::AllOf,
            vec![sub_equal(), strv("a"), sbag(&["a", "a"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(true));

        let out = run(
            FunctionId::AllOf,
            vec![sub_equal(), strv("a"), sbag(&["a", "b"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(false));
    }

    #[test]
    fn test_two_bag_quantifiers() {
        // all-of-any: every element of bag1 matches something in bag2
        let out = run(
            FunctionId::AllOfAny,
            vec![sub_equal(), sbag(&["a", "b"]), sbag(&["b", "a", "c"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(true));

        // any-of-all: some element of bag1 equals everything in bag2
        let out = run(
            FunctionId::AnyOfAll,
            vec![sub_equal(), sbag(&["a", "b"]), sbag(&["a", "a"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(true));

        let out = run(
            FunctionId::AllOfAll,
            vec![sub_equal(), sbag(&["a"]), sbag(&["a", "b"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(false));
    }

    #[test]
    fn test_any_of_any_cross_product() {
        let out = run(
            FunctionId::AnyOfAny,
            vec![sub_equal(), sbag(&["x", "y"]), sbag(&["z", "y"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(true));

        // empty bag: vacuous false for the or-fold
        let out = run(
            FunctionId::AnyOfAny,
            vec![sub_equal(), sbag(&[]), sbag(&["z"])],
        )
        .unwrap();
        assert_eq!(out, bool_value(false));
    }

    #[test]
    fn test_map() {
        let out = run(
            FunctionId::Map,
            vec![
                Expression::FunctionRef(FunctionId::StringNormalizeToLowerCase),
                sbag(&["Hello", "World"]),
            ],
        )
        .unwrap();
        let expected = Bag::new(
            Datatype::String,
            vec![
                AttributeValue::String("hello".into()),
                AttributeValue::String("world".into()),
            ],
        );
        assert_eq!(out, ExprValue::Bag(expected));
    }
}
