//! Bag functions (XACML A.3.10).
//!
//! `<type>-one-and-only` is the usual bridge from a designator's bag to a
//! primitive function argument; its failure message carries the bag size
//! because that is the single most common policy-authoring error.

use super::helpers::{bag_arg, boolean, primitive};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, Bag, EvalError};

pub fn eval_bag(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::OneAndOnly(_) => {
            let bag = bag_arg(vals, 0)?;
            match bag.single() {
                Some(v) => Ok(ExprValue::Primitive(v.clone())),
                None => Err(match bag.cause() {
                    // Surface why the bag is empty when the lookup recorded it
                    Some(cause) if bag.is_empty() => cause.clone(),
                    _ => EvalError::processing(format!(
                        "one-and-only applied to a bag of {} values",
                        bag.len()
                    )),
                }),
            }
        }
        FunctionId::BagSize(_) => {
            let bag = bag_arg(vals, 0)?;
            Ok(ExprValue::Primitive(AttributeValue::Integer(
                bag.len() as i64
            )))
        }
        FunctionId::IsIn(_) => {
            let v = primitive(vals, 0)?;
            let bag = bag_arg(vals, 1)?;
            Ok(boolean(bag.contains(v)))
        }
        FunctionId::BagOf(dt) => {
            let mut values = Vec::with_capacity(vals.len());
            for val in vals {
                values.push(val.expect_primitive()?.clone());
            }
            Ok(ExprValue::Bag(Bag::new(*dt, values)))
        }
        other => Err(EvalError::processing(format!(
            "non-bag function routed to bag module: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::Datatype;

    fn sbag(values: &[&str]) -> ExprValue {
        ExprValue::Bag(Bag::new(
            Datatype::String,
            values
                .iter()
                .map(|s| AttributeValue::String((*s).to_string()))
                .collect(),
        ))
    }

    fn s(v: &str) -> ExprValue {
        ExprValue::Primitive(AttributeValue::String(v.into()))
    }

    #[test]
    fn test_one_and_only() {
        let id = FunctionId::OneAndOnly(Datatype::String);
        assert_eq!(eval_bag(&id, &[sbag(&["x"])]).unwrap(), s("x"));
        assert!(eval_bag(&id, &[sbag(&[])]).is_err());
        assert!(eval_bag(&id, &[sbag(&["x", "y"])]).is_err());
    }

    #[test]
    fn test_one_and_only_surfaces_cause() {
        let cause = EvalError::missing("pip timed out");
        let bag = ExprValue::Bag(Bag::empty_with_cause(Datatype::String, cause.clone()));
        let err = eval_bag(&FunctionId::OneAndOnly(Datatype::String), &[bag]).unwrap_err();
        assert_eq!(err, cause);
    }

    #[test]
    fn test_bag_size_and_is_in() {
        let out = eval_bag(&FunctionId::BagSize(Datatype::String), &[sbag(&["a", "b"])]).unwrap();
        assert_eq!(out, ExprValue::Primitive(AttributeValue::Integer(2)));

        let id = FunctionId::IsIn(Datatype::String);
        assert_eq!(eval_bag(&id, &[s("a"), sbag(&["a", "b"])]).unwrap(), boolean(true));
        assert_eq!(eval_bag(&id, &[s("z"), sbag(&["a", "b"])]).unwrap(), boolean(false));
    }

    #[test]
    fn test_bag_constructor() {
        let out = eval_bag(&FunctionId::BagOf(Datatype::String), &[s("a"), s("a")]).unwrap();
        match out {
            ExprValue::Bag(b) => assert_eq!(b.len(), 2),
            _ => panic!("expected bag"),
        }
        // empty bag construction is legal
        let out = eval_bag(&FunctionId::BagOf(Datatype::String), &[]).unwrap();
        assert!(matches!(out, ExprValue::Bag(b) if b.is_empty()));
    }
}
