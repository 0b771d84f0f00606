//! Argument accessors shared by the function family modules.
//!
//! Types are checked at `Apply` construction, so a mismatch here means an
//! internal inconsistency; it surfaces as a processing-error Indeterminate
//! rather than a panic.

use crate::expression::ExprValue;
use xacml_core::{AttributeValue, Bag, EvalError};

pub fn primitive<'a>(vals: &'a [ExprValue], i: usize) -> Result<&'a AttributeValue, EvalError> {
    vals.get(i)
        .ok_or_else(|| EvalError::processing(format!("missing argument {i}")))?
        .expect_primitive()
}

pub fn bag_arg<'a>(vals: &'a [ExprValue], i: usize) -> Result<&'a Bag, EvalError> {
    vals.get(i)
        .ok_or_else(|| EvalError::processing(format!("missing argument {i}")))?
        .expect_bag()
}

pub fn string_arg<'a>(vals: &'a [ExprValue], i: usize) -> Result<&'a str, EvalError> {
    primitive(vals, i)?
        .as_str()
        .ok_or_else(|| EvalError::processing(format!("argument {i} is not a string")))
}

pub fn integer_arg(vals: &[ExprValue], i: usize) -> Result<i64, EvalError> {
    primitive(vals, i)?
        .as_integer()
        .ok_or_else(|| EvalError::processing(format!("argument {i} is not an integer")))
}

pub fn double_arg(vals: &[ExprValue], i: usize) -> Result<f64, EvalError> {
    primitive(vals, i)?
        .as_double()
        .ok_or_else(|| EvalError::processing(format!("argument {i} is not a double")))
}

pub fn bool_arg(vals: &[ExprValue], i: usize) -> Result<bool, EvalError> {
    primitive(vals, i)?
        .as_bool()
        .ok_or_else(|| EvalError::processing(format!("argument {i} is not a boolean")))
}

/// Wrap a boolean result.
pub fn boolean(b: bool) -> ExprValue {
    ExprValue::Primitive(AttributeValue::Boolean(b))
}
