//! Equality predicates (XACML A.3.1).
//!
//! `<type>-equal` compares two values of the same datatype by canonical
//! form; the datatype-specific rules (temporal instants, name
//! normalization) live in the `AttributeValue` equality impls.

use super::helpers::{boolean, primitive, string_arg};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, EvalError};

pub fn eval_equality(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::Equal(_) => {
            let a = primitive(vals, 0)?;
            let b = primitive(vals, 1)?;
            // double-equal is IEEE equality: NaN equals nothing, unlike the
            // canonical-form Eq used for bags
            if let (AttributeValue::Double(x), AttributeValue::Double(y)) = (a, b) {
                return Ok(boolean(x == y));
            }
            Ok(boolean(a == b))
        }
        FunctionId::StringEqualIgnoreCase => {
            let a = string_arg(vals, 0)?;
            let b = string_arg(vals, 1)?;
            Ok(boolean(a.to_lowercase() == b.to_lowercase()))
        }
        other => Err(EvalError::processing(format!(
            "non-equality function routed to equality module: {other}"
        ))),
    }
}
