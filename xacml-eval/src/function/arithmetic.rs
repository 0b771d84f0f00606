//! Arithmetic functions (XACML A.3.2) and numeric conversions (A.3.4).
//!
//! Integer overflow, division by zero, and a double-to-integer conversion
//! outside the i64 range are processing errors, per the XACML evaluation
//! error model.

use super::helpers::{double_arg, integer_arg};
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, EvalError};

fn int(v: i64) -> ExprValue {
    ExprValue::Primitive(AttributeValue::Integer(v))
}

fn double(v: f64) -> ExprValue {
    ExprValue::Primitive(AttributeValue::Double(v))
}

fn overflow(op: &str) -> EvalError {
    EvalError::processing(format!("integer overflow in {op}"))
}

pub fn eval_arithmetic(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    match id {
        FunctionId::IntegerAdd => {
            let mut acc = integer_arg(vals, 0)?;
            for i in 1..vals.len() {
                acc = acc
                    .checked_add(integer_arg(vals, i)?)
                    .ok_or_else(|| overflow("integer-add"))?;
            }
            Ok(int(acc))
        }
        FunctionId::IntegerMultiply => {
            let mut acc = integer_arg(vals, 0)?;
            for i in 1..vals.len() {
                acc = acc
                    .checked_mul(integer_arg(vals, i)?)
                    .ok_or_else(|| overflow("integer-multiply"))?;
            }
            Ok(int(acc))
        }
        FunctionId::IntegerSubtract => {
            let a = integer_arg(vals, 0)?;
            let b = integer_arg(vals, 1)?;
            a.checked_sub(b)
                .map(int)
                .ok_or_else(|| overflow("integer-subtract"))
        }
        FunctionId::IntegerDivide => {
            let a = integer_arg(vals, 0)?;
            let b = integer_arg(vals, 1)?;
            if b == 0 {
                return Err(EvalError::processing("integer-divide: division by zero"));
            }
            a.checked_div(b)
                .map(int)
                .ok_or_else(|| overflow("integer-divide"))
        }
        FunctionId::IntegerMod => {
            let a = integer_arg(vals, 0)?;
            let b = integer_arg(vals, 1)?;
            if b == 0 {
                return Err(EvalError::processing("integer-mod: division by zero"));
            }
            a.checked_rem(b)
                .map(int)
                .ok_or_else(|| overflow("integer-mod"))
        }
        FunctionId::IntegerAbs => {
            let a = integer_arg(vals, 0)?;
            a.checked_abs()
                .map(int)
                .ok_or_else(|| overflow("integer-abs"))
        }

        FunctionId::DoubleAdd => {
            let mut acc = double_arg(vals, 0)?;
            for i in 1..vals.len() {
                acc += double_arg(vals, i)?;
            }
            Ok(double(acc))
        }
        FunctionId::DoubleMultiply => {
            let mut acc = double_arg(vals, 0)?;
            for i in 1..vals.len() {
                acc *= double_arg(vals, i)?;
            }
            Ok(double(acc))
        }
        FunctionId::DoubleSubtract => Ok(double(double_arg(vals, 0)? - double_arg(vals, 1)?)),
        FunctionId::DoubleDivide => {
            let b = double_arg(vals, 1)?;
            if b == 0.0 {
                return Err(EvalError::processing("double-divide: division by zero"));
            }
            Ok(double(double_arg(vals, 0)? / b))
        }
        FunctionId::DoubleAbs => Ok(double(double_arg(vals, 0)?.abs())),
        FunctionId::Round => {
            // XPath fn:round: halves round toward positive infinity
            let v = double_arg(vals, 0)?;
            Ok(double((v + 0.5).floor()))
        }
        FunctionId::Floor => Ok(double(double_arg(vals, 0)?.floor())),

        FunctionId::DoubleToInteger => {
            let v = double_arg(vals, 0)?.trunc();
            if !v.is_finite() || v < i64::MIN as f64 || v > i64::MAX as f64 {
                return Err(EvalError::processing(
                    "double-to-integer: value out of integer range",
                ));
            }
            Ok(int(v as i64))
        }
        FunctionId::IntegerToDouble => Ok(double(integer_arg(vals, 0)? as f64)),

        other => Err(EvalError::processing(format!(
            "non-arithmetic function routed to arithmetic module: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(vs: &[i64]) -> Vec<ExprValue> {
        vs.iter().map(|v| int(*v)).collect()
    }

    #[test]
    fn test_variadic_add() {
        let out = eval_arithmetic(&FunctionId::IntegerAdd, &ints(&[1, 2, 3, 4])).unwrap();
        assert_eq!(out, int(10));
    }

    #[test]
    fn test_divide_by_zero() {
        assert!(eval_arithmetic(&FunctionId::IntegerDivide, &ints(&[1, 0])).is_err());
        assert!(eval_arithmetic(&FunctionId::IntegerMod, &ints(&[1, 0])).is_err());
    }

    #[test]
    fn test_overflow_is_processing_error() {
        assert!(eval_arithmetic(&FunctionId::IntegerAdd, &ints(&[i64::MAX, 1])).is_err());
        assert!(eval_arithmetic(&FunctionId::IntegerAbs, &ints(&[i64::MIN])).is_err());
    }

    #[test]
    fn test_double_to_integer_truncates() {
        let out =
            eval_arithmetic(&FunctionId::DoubleToInteger, &[double(5.9)]).unwrap();
        assert_eq!(out, int(5));
        assert!(eval_arithmetic(&FunctionId::DoubleToInteger, &[double(f64::NAN)]).is_err());
    }

    #[test]
    fn test_round_half_even_edge() {
        let out = eval_arithmetic(&FunctionId::Round, &[double(2.5)]).unwrap();
        assert_eq!(out, double(3.0));
        let out = eval_arithmetic(&FunctionId::Round, &[double(-2.5)]).unwrap();
        assert_eq!(out, double(-2.0));
    }
}
