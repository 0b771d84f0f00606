//! Temporal arithmetic (XACML A.3.7).
//!
//! Subtraction negates the duration; overflow past the representable range
//! is a processing error.

use super::helpers::primitive;
use crate::expression::ExprValue;
use crate::function::FunctionId;
use xacml_core::{AttributeValue, EvalError};

fn out_of_range(op: &str) -> EvalError {
    EvalError::processing(format!("{op}: result out of range"))
}

pub fn eval_datetime(id: &FunctionId, vals: &[ExprValue]) -> Result<ExprValue, EvalError> {
    use FunctionId::*;
    let base = primitive(vals, 0)?;
    let dur = primitive(vals, 1)?;
    match (id, base, dur) {
        (
            DateTimeAddDayTimeDuration | DateTimeSubtractDayTimeDuration,
            AttributeValue::DateTime(dt),
            AttributeValue::DayTimeDuration(d),
        ) => {
            let d = if matches!(id, DateTimeSubtractDayTimeDuration) {
                d.negated()
            } else {
                d.clone()
            };
            dt.add_day_time_duration(&d)
                .map(|v| ExprValue::Primitive(AttributeValue::DateTime(v)))
                .ok_or_else(|| out_of_range("dateTime-add-dayTimeDuration"))
        }
        (
            DateTimeAddYearMonthDuration | DateTimeSubtractYearMonthDuration,
            AttributeValue::DateTime(dt),
            AttributeValue::YearMonthDuration(d),
        ) => {
            let d = if matches!(id, DateTimeSubtractYearMonthDuration) {
                d.negated()
            } else {
                d.clone()
            };
            dt.add_year_month_duration(&d)
                .map(|v| ExprValue::Primitive(AttributeValue::DateTime(v)))
                .ok_or_else(|| out_of_range("dateTime-add-yearMonthDuration"))
        }
        (
            DateAddYearMonthDuration | DateSubtractYearMonthDuration,
            AttributeValue::Date(date),
            AttributeValue::YearMonthDuration(d),
        ) => {
            let d = if matches!(id, DateSubtractYearMonthDuration) {
                d.negated()
            } else {
                d.clone()
            };
            date.add_year_month_duration(&d)
                .map(|v| ExprValue::Primitive(AttributeValue::Date(v)))
                .ok_or_else(|| out_of_range("date-add-yearMonthDuration"))
        }
        _ => Err(EvalError::processing(format!(
            "invalid argument types for {id}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::{Date, DateTime, DayTimeDuration, YearMonthDuration};

    fn dt(s: &str) -> ExprValue {
        ExprValue::Primitive(AttributeValue::DateTime(DateTime::parse(s).unwrap()))
    }

    fn date(s: &str) -> ExprValue {
        ExprValue::Primitive(AttributeValue::Date(Date::parse(s).unwrap()))
    }

    fn dtd(s: &str) -> ExprValue {
        ExprValue::Primitive(AttributeValue::DayTimeDuration(
            DayTimeDuration::parse(s).unwrap(),
        ))
    }

    fn ymd(s: &str) -> ExprValue {
        ExprValue::Primitive(AttributeValue::YearMonthDuration(
            YearMonthDuration::parse(s).unwrap(),
        ))
    }

    #[test]
    fn test_datetime_add_and_subtract() {
        let out = eval_datetime(
            &FunctionId::DateTimeAddDayTimeDuration,
            &[dt("2024-01-15T23:00:00Z"), dtd("PT2H")],
        )
        .unwrap();
        assert_eq!(out, dt("2024-01-16T01:00:00Z"));

        let out = eval_datetime(
            &FunctionId::DateTimeSubtractDayTimeDuration,
            &[dt("2024-01-16T01:00:00Z"), dtd("PT2H")],
        )
        .unwrap();
        assert_eq!(out, dt("2024-01-15T23:00:00Z"));
    }

    #[test]
    fn test_date_year_month_arithmetic() {
        let out = eval_datetime(
            &FunctionId::DateAddYearMonthDuration,
            &[date("2024-05-10"), ymd("P1Y2M")],
        )
        .unwrap();
        assert_eq!(out, date("2025-07-10"));

        let out = eval_datetime(
            &FunctionId::DateSubtractYearMonthDuration,
            &[date("2024-05-10"), ymd("P6M")],
        )
        .unwrap();
        assert_eq!(out, date("2023-11-10"));
    }
}
