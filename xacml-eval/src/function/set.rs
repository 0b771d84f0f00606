//! Set functions over bags (XACML A.3.11).
//!
//! These treat bags as sets: `intersection` and `union`
//! deduplicate their results, and the membership predicates ignore
//! multiplicity.

use super::helpers::{bag_arg, boolean};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, Bag, EvalError};

fn dedup(values: impl Iterator<Item = AttributeValue>) -> Vec<AttributeValue> {
    let mut out: Vec<AttributeValue> = Vec::new();
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

pub fn eval_set(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    let a = bag_arg(vals, 0)?;
    let b = bag_arg(vals, 1)?;
    match id {
        FunctionId::Intersection(dt) => {
            let values = dedup(a.iter().filter(|v| b.contains(v)).cloned());
            Ok(ExprValue::Bag(Bag::new(*dt, values)))
        }
        FunctionId::Union(dt) => {
            let values = dedup(a.iter().chain(b.iter()).cloned());
            Ok(ExprValue::Bag(Bag::new(*dt, values)))
        }
        FunctionId::AtLeastOneMemberOf(_) => {
            Ok(boolean(a.iter().any(|v| b.contains(v))))
        }
        FunctionId::Subset(_) => Ok(boolean(a.iter().all(|v| b.contains(v)))),
        FunctionId::SetEquals(_) => Ok(boolean(
            a.iter().all(|v| b.contains(v)) && b.iter().all(|v| a.contains(v)),
        )),
        other => Err(EvalError::processing(format!(
            "non-set function routed to set module: {other}"
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

    fn run_bool(id: FunctionId, a: ExprValue, b: ExprValue) -> bool {
        eval_set(&id, &[a, b]).unwrap().expect_bool().unwrap()
    }

    #[test]
    fn test_intersection_dedups() {
        let out = eval_set(
            &FunctionId::Intersection(Datatype::String),
            &[sbag(&["a", "a", "b"]), sbag(&["a", "c", "a"])],
        )
        .unwrap();
        assert_eq!(out, sbag(&["a"]));
    }

    #[test]
    fn test_union_dedups() {
        let out = eval_set(
            &FunctionId::Union(Datatype::String),
            &[sbag(&["a", "b"]), sbag(&["b", "c"])],
        )
        .unwrap();
        assert_eq!(out, sbag(&["a", "b", "c"]));
    }

    #[test]
    fn test_membership_predicates() {
        assert!(run_bool(
            FunctionId::AtLeastOneMemberOf(Datatype::String),
            sbag(&["x", "a"]),
            sbag(&["a", "b"])
        ));
        assert!(!run_bool(
            FunctionId::AtLeastOneMemberOf(Datatype::String),
            sbag(&["x"]),
            sbag(&["a", "b"])
        ));
        assert!(run_bool(
            FunctionId::Subset(Datatype::String),
            sbag(&["a", "a"]),
            sbag(&["a", "b"])
        ));
        // set-equals ignores multiplicity
        assert!(run_bool(
            FunctionId::SetEquals(Datatype::String),
            sbag(&["a", "b", "a"]),
            sbag(&["b", "a"])
        ));
    }
}
