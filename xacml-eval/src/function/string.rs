//! String functions (XACML A.3.9) and string conversions (A.3.3).
//!
//! Substring indices are Unicode codepoint positions, `-1` means
//! "to the end", and out-of-range indices are processing errors.

use super::helpers::{integer_arg, primitive, string_arg};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, EvalError};

fn string(s: String) -> ExprValue {
    ExprValue::Primitive(AttributeValue::String(s))
}

fn boolean(b: bool) -> ExprValue {
    ExprValue::Primitive(AttributeValue::Boolean(b))
}

/// The anyURI string payload of an argument.
fn any_uri_arg<'a>(vals: &'a [ExprValue], i: usize) -> Result<&'a str, EvalError> {
    match primitive(vals, i)? {
        AttributeValue::AnyUri(u) => Ok(u),
        _ => Err(EvalError::processing(format!("argument {i} is not an anyURI"))),
    }
}

/// Codepoint-indexed substring with XACML's `-1 = end` convention.
fn substring(s: &str, start: i64, end: i64) -> Result<String, EvalError> {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let end = if end == -1 { len } else { end };
    if start < 0 || end < start || end > len {
        return Err(EvalError::processing(format!(
            "substring indices [{start}, {end}) out of range for length {len}"
        )));
    }
    Ok(chars[start as usize..end as usize].iter().collect())
}

pub fn eval_string(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::StringConcatenate => {
            let mut out = String::new();
            for i in 0..vals.len() {
                out.push_str(string_arg(vals, i)?);
            }
            Ok(string(out))
        }
        FunctionId::StringStartsWith => {
            Ok(boolean(string_arg(vals, 1)?.starts_with(string_arg(vals, 0)?)))
        }
        FunctionId::StringEndsWith => {
            Ok(boolean(string_arg(vals, 1)?.ends_with(string_arg(vals, 0)?)))
        }
        FunctionId::StringContains => {
            Ok(boolean(string_arg(vals, 1)?.contains(string_arg(vals, 0)?)))
        }
        FunctionId::StringSubstring => {
            let s = string_arg(vals, 0)?;
            substring(s, integer_arg(vals, 1)?, integer_arg(vals, 2)?).map(string)
        }

        FunctionId::AnyUriStartsWith => {
            Ok(boolean(any_uri_arg(vals, 1)?.starts_with(string_arg(vals, 0)?)))
        }
        FunctionId::AnyUriEndsWith => {
            Ok(boolean(any_uri_arg(vals, 1)?.ends_with(string_arg(vals, 0)?)))
        }
        FunctionId::AnyUriContains => {
            Ok(boolean(any_uri_arg(vals, 1)?.contains(string_arg(vals, 0)?)))
        }
        FunctionId::AnyUriSubstring => {
            let s = any_uri_arg(vals, 0)?;
            substring(s, integer_arg(vals, 1)?, integer_arg(vals, 2)?).map(string)
        }

        FunctionId::StringNormalizeSpace => {
            Ok(string(string_arg(vals, 0)?.trim().to_string()))
        }
        FunctionId::StringNormalizeToLowerCase => {
            Ok(string(string_arg(vals, 0)?.to_lowercase()))
        }

        FunctionId::StringFrom(_) => Ok(string(primitive(vals, 0)?.canonical())),
        FunctionId::FromString(dt) => {
            let lexical = string_arg(vals, 0)?;
            // A malformed lexical form at evaluation time is a runtime
            // failure, not a policy-load failure
            AttributeValue::parse(*dt, lexical)
                .map(ExprValue::Primitive)
                .map_err(|e| EvalError::syntax(e.to_string()))
        }

        other => Err(EvalError::processing(format!(
            "non-string function routed to string module: {other}"
        ))),
    }
}
