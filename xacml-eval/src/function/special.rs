//! Special matching functions (XACML A.3.13, A.3.14).
//!
//! Regular expressions are compiled per evaluation with implicit
//! anchoring: XACML regexp matching is a full match of the value against
//! the pattern, per XML Schema regex semantics.

use super::helpers::{boolean, primitive, string_arg};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use regex::Regex;
use xacml_core::{AttributeValue, EvalError};

fn full_match(pattern: &str, value: &str) -> Result<bool, EvalError> {
    let anchored = format!("^(?:{pattern})$");
    let re = Regex::new(&anchored)
        .map_err(|e| EvalError::processing(format!("invalid regular expression: {e}")))?;
    Ok(re.is_match(value))
}

pub fn eval_special(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::StringRegexpMatch(_) => {
            let pattern = string_arg(vals, 0)?;
            // The subject argument is the family's datatype; match against
            // its canonical lexical form
            let value = primitive(vals, 1)?.canonical();
            full_match(pattern, &value).map(boolean)
        }
        FunctionId::X500NameMatch => {
            match (primitive(vals, 0)?, primitive(vals, 1)?) {
                (AttributeValue::X500Name(base), AttributeValue::X500Name(full)) => {
                    Ok(boolean(base.matches_terminal_of(full)))
                }
                _ => Err(EvalError::processing(
                    "x500Name-match expects two x500Names",
                )),
            }
        }
        FunctionId::Rfc822NameMatch => {
            let pattern = string_arg(vals, 0)?;
            match primitive(vals, 1)? {
                AttributeValue::Rfc822Name(name) => Ok(boolean(name.matches_pattern(pattern))),
                _ => Err(EvalError::processing(
                    "rfc822Name-match expects an rfc822Name subject",
                )),
            }
        }
        other => Err(EvalError::processing(format!(
            "non-matching function routed to special module: {other}"
        ))),
    }
}
