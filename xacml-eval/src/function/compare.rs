//! Ordered comparisons (XACML A.3.6, A.3.8) and `time-in-range`.
//!
//! Comparisons follow each datatype's canonical ordering: numeric for
//! integer/double, codepoint order for strings, normalized instants for
//! the temporal types.

use super::helpers::{boolean, primitive};
use crate::expression::ExprValue;
use crate::function::{CompareOp, FunctionId};
use std::cmp::Ordering;
use xacml_core::{AttributeValue, EvalError};

fn check(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::GreaterThan => ordering == Ordering::Greater,
        CompareOp::GreaterThanOrEqual => ordering != Ordering::Less,
        CompareOp::LessThan => ordering == Ordering::Less,
        CompareOp::LessThanOrEqual => ordering != Ordering::Greater,
    }
}

pub fn eval_compare(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::Compare(_, op) => {
            let a = primitive(vals, 0)?;
            let b = primitive(vals, 1)?;
            let ordering = match (a, b) {
                (AttributeValue::Integer(x), AttributeValue::Integer(y)) => x.cmp(y),
                (AttributeValue::Double(x), AttributeValue::Double(y)) => {
                    // IEEE partial order: comparisons involving NaN fail
                    x.partial_cmp(y).ok_or_else(|| {
                        EvalError::processing("double comparison with NaN")
                    })?
                }
                (AttributeValue::String(x), AttributeValue::String(y)) => x.cmp(y),
                (AttributeValue::Time(x), AttributeValue::Time(y)) => x.cmp(y),
                (AttributeValue::Date(x), AttributeValue::Date(y)) => x.cmp(y),
                (AttributeValue::DateTime(x), AttributeValue::DateTime(y)) => x.cmp(y),
                _ => {
                    return Err(EvalError::processing(format!(
                        "incomparable argument types for {id}"
                    )))
                }
            };
            Ok(boolean(check(*op, ordering)))
        }
        FunctionId::TimeInRange => {
            let (t, lo, hi) = match (primitive(vals, 0)?, primitive(vals, 1)?, primitive(vals, 2)?)
            {
                (
                    AttributeValue::Time(t),
                    AttributeValue::Time(lo),
                    AttributeValue::Time(hi),
                ) => (t, lo, hi),
                _ => return Err(EvalError::processing("time-in-range expects three times")),
            };
            Ok(boolean(t.in_range(lo, hi)))
        }
        other => Err(EvalError::processing(format!(
            "non-comparison function routed to compare module: {other}"
        ))),
    }
}
