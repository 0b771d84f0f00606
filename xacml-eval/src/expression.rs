//! Expression model.
//!
//! `Expression` is the closed sum of everything that can appear where XACML
//! allows an `<Expression>`: constants, attribute designators and selectors,
//! variable references, nested applies, and bare function references (legal
//! only as the first argument of a higher-order function).
//!
//! Arity and argument datatypes are checked when an `Apply` is constructed;
//! evaluation assumes a well-typed tree and treats residual type mismatches
//! as processing errors.

use crate::context::EvaluationContext;
use crate::function::{self, FunctionId, FunctionKind, FunctionRegistry};
use std::sync::Arc;
use xacml_core::{
    AttributeFqn, AttributeValue, Bag, Datatype, EvalError, MissingAttributeDetail, ValueType,
    XacmlError,
};

/// The result of evaluating an expression: a single value or a bag.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Primitive(AttributeValue),
    Bag(Bag),
}

impl ExprValue {
    /// The primitive value, or a processing error for a bag.
    pub fn expect_primitive(&self) -> Result<&AttributeValue, EvalError> {
        match self {
            ExprValue::Primitive(v) => Ok(v),
            ExprValue::Bag(_) => Err(EvalError::processing(
                "expected a primitive value, got a bag",
            )),
        }
    }

    /// The bag, or a processing error for a primitive.
    pub fn expect_bag(&self) -> Result<&Bag, EvalError> {
        match self {
            ExprValue::Bag(b) => Ok(b),
            ExprValue::Primitive(_) => Err(EvalError::processing(
                "expected a bag, got a primitive value",
            )),
        }
    }

    /// The boolean payload, or a processing error.
    pub fn expect_bool(&self) -> Result<bool, EvalError> {
        self.expect_primitive()?
            .as_bool()
            .ok_or_else(|| EvalError::processing("expected a boolean value"))
    }

    /// The type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            ExprValue::Primitive(v) => ValueType::Primitive(v.datatype()),
            ExprValue::Bag(b) => ValueType::Bag(b.datatype()),
        }
    }
}

impl From<AttributeValue> for ExprValue {
    fn from(v: AttributeValue) -> Self {
        ExprValue::Primitive(v)
    }
}

impl From<Bag> for ExprValue {
    fn from(b: Bag) -> Self {
        ExprValue::Bag(b)
    }
}

/// AttributeDesignator: look up a bag of values by fully-qualified name.
#[derive(Debug, Clone)]
pub struct AttributeDesignator {
    pub fqn: AttributeFqn,
    pub datatype: Datatype,
    pub must_be_present: bool,
}

impl AttributeDesignator {
    pub fn new(fqn: AttributeFqn, datatype: Datatype, must_be_present: bool) -> Self {
        Self {
            fqn,
            datatype,
            must_be_present,
        }
    }
}

/// AttributeSelector: evaluate an XPath expression against a category's
/// Content element. The XPath engine itself is supplied by the embedding
/// (see [`crate::xpath::XPathEvaluator`]).
#[derive(Debug, Clone)]
pub struct AttributeSelector {
    pub category: String,
    pub path: String,
    pub datatype: Datatype,
    pub must_be_present: bool,
    /// Optional attribute whose value selects the context node
    pub context_selector: Option<AttributeFqn>,
}

/// A named, per-policy variable definition. `VariableReference`s resolve to
/// the definition at parse time, so evaluation never sees dangling names;
/// values are memoized per evaluation context.
#[derive(Debug)]
pub struct VariableDef {
    pub id: String,
    pub expr: Expression,
}

/// A function application with construction-time-checked arguments.
#[derive(Debug, Clone)]
pub struct Apply {
    function: FunctionId,
    args: Vec<Expression>,
    return_type: ValueType,
}

impl Apply {
    /// Build an `Apply`, validating arity and argument types against the
    /// function's signature (higher-order functions get structural
    /// validation of their sub-function and bag arguments instead).
    pub fn new(
        function: FunctionId,
        args: Vec<Expression>,
        registry: &FunctionRegistry,
    ) -> Result<Self, XacmlError> {
        let return_type = match function.kind() {
            FunctionKind::ShortCircuit => Self::check_short_circuit(&function, &args)?,
            FunctionKind::HigherOrder => Self::check_higher_order(&function, &args, registry)?,
            FunctionKind::FirstOrder(_) => {
                let sig = registry.signature_of(&function).ok_or_else(|| {
                    XacmlError::UnknownFunction {
                        uri: function.uri(),
                    }
                })?;
                Self::check_first_order(&function, &args, &sig)?;
                sig.ret
            }
        };
        Ok(Self {
            function,
            args,
            return_type,
        })
    }

    fn check_first_order(
        function: &FunctionId,
        args: &[Expression],
        sig: &crate::function::Signature,
    ) -> Result<(), XacmlError> {
        if args.len() < sig.min_args() || (sig.variadic.is_none() && args.len() > sig.params.len())
        {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                format!("expected {} argument(s), got {}", sig.min_args(), args.len()),
            ));
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = sig.params.get(i).or(sig.variadic.as_ref()).copied();
            let Some(expected) = expected else {
                break;
            };
            match arg.return_type() {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        format!("argument {i} has type {actual}, expected {expected}"),
                    ))
                }
                None => {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        format!("argument {i} is a function reference"),
                    ))
                }
            }
        }
        Ok(())
    }

    fn check_short_circuit(
        function: &FunctionId,
        args: &[Expression],
    ) -> Result<ValueType, XacmlError> {
        let bool_ty = ValueType::Primitive(Datatype::Boolean);
        let (min, skip) = match function {
            // n-of's first argument is the threshold
            FunctionId::NOf => (1usize, 1usize),
            _ => (0, 0),
        };
        if args.len() < min {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                format!("expected at least {min} argument(s), got {}", args.len()),
            ));
        }
        if *function == FunctionId::NOf
            && args[0].return_type() != Some(ValueType::Primitive(Datatype::Integer))
        {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                "first argument must be an integer".to_string(),
            ));
        }
        for (i, arg) in args.iter().enumerate().skip(skip) {
            if arg.return_type() != Some(bool_ty) {
                return Err(XacmlError::invalid_arguments(
                    function.uri(),
                    format!("argument {i} must be boolean"),
                ));
            }
        }
        Ok(bool_ty)
    }

    fn check_higher_order(
        function: &FunctionId,
        args: &[Expression],
        registry: &FunctionRegistry,
    ) -> Result<ValueType, XacmlError> {
        let Some(Expression::FunctionRef(sub)) = args.first() else {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                "first argument must be a function reference".to_string(),
            ));
        };
        let sub_sig = registry.signature_of(sub).ok_or_else(|| {
            XacmlError::invalid_arguments(function.uri(), "sub-function must be first-order")
        })?;
        if sub_sig.params.iter().any(|t| t.is_bag()) {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                "sub-function must take primitive arguments".to_string(),
            ));
        }
        let rest = &args[1..];
        if rest.len() != sub_sig.params.len() {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                format!(
                    "sub-function takes {} argument(s), got {}",
                    sub_sig.params.len(),
                    rest.len()
                ),
            ));
        }

        let mut bag_count = 0usize;
        for (i, arg) in rest.iter().enumerate() {
            let expected_dt = sub_sig.params[i].datatype();
            match arg.return_type() {
                Some(ValueType::Primitive(dt)) if dt == expected_dt => {}
                Some(ValueType::Bag(dt)) if dt == expected_dt => bag_count += 1,
                other => {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        format!(
                            "argument {} has type {:?}, expected {} or bag thereof",
                            i + 1,
                            other,
                            expected_dt
                        ),
                    ))
                }
            }
        }

        let bool_ret = ValueType::Primitive(Datatype::Boolean);
        match function {
            FunctionId::AnyOf | FunctionId::AllOf => {
                if sub_sig.ret != bool_ret {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        "sub-function must return boolean".to_string(),
                    ));
                }
                if bag_count != 1 {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        format!("expected exactly one bag argument, got {bag_count}"),
                    ));
                }
                Ok(bool_ret)
            }
            FunctionId::AnyOfAny => {
                if sub_sig.ret != bool_ret {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        "sub-function must return boolean".to_string(),
                    ));
                }
                Ok(bool_ret)
            }
            FunctionId::AllOfAny | FunctionId::AnyOfAll | FunctionId::AllOfAll => {
                if sub_sig.ret != bool_ret {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        "sub-function must return boolean".to_string(),
                    ));
                }
                let all_bags = rest
                    .iter()
                    .all(|a| matches!(a.return_type(), Some(ValueType::Bag(_))));
                if rest.len() != 2 || !all_bags {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        "expected exactly two bag arguments".to_string(),
                    ));
                }
                Ok(bool_ret)
            }
            FunctionId::Map => {
                if sub_sig.ret.is_bag() {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        "sub-function must return a primitive".to_string(),
                    ));
                }
                if bag_count != 1 {
                    return Err(XacmlError::invalid_arguments(
                        function.uri(),
                        format!("expected exactly one bag argument, got {bag_count}"),
                    ));
                }
                Ok(ValueType::Bag(sub_sig.ret.datatype()))
            }
            _ => unreachable!("non-higher-order function: {function:?}"),
        }
    }

    pub fn function(&self) -> &FunctionId {
        &self.function
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }
}

/// A XACML expression.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Constant AttributeValue
    Value(AttributeValue),
    /// Bag lookup by (category, id, issuer)
    Designator(AttributeDesignator),
    /// Bag lookup by XPath over a category's Content
    Selector(AttributeSelector),
    /// Reference to a VariableDefinition (resolved at parse time)
    VariableRef(Arc<VariableDef>),
    /// Function application
    Apply(Box<Apply>),
    /// Bare function reference (higher-order sub-function position only)
    FunctionRef(FunctionId),
}

impl Expression {
    /// Constant expression.
    pub fn value(v: AttributeValue) -> Self {
        Expression::Value(v)
    }

    /// Apply expression (boxed).
    pub fn apply(apply: Apply) -> Self {
        Expression::Apply(Box::new(apply))
    }

    /// The declared return type, or `None` for a bare function reference
    /// (which is not a value-producing expression).
    pub fn return_type(&self) -> Option<ValueType> {
        match self {
            Expression::Value(v) => Some(ValueType::Primitive(v.datatype())),
            Expression::Designator(d) => Some(ValueType::Bag(d.datatype)),
            Expression::Selector(s) => Some(ValueType::Bag(s.datatype)),
            Expression::VariableRef(def) => def.expr.return_type(),
            Expression::Apply(apply) => Some(apply.return_type),
            Expression::FunctionRef(_) => None,
        }
    }

    /// Evaluate to a value or bag. The first failing sub-expression
    /// propagates as the whole expression's Indeterminate unless a
    /// short-circuit function absorbs it.
    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<ExprValue, EvalError> {
        match self {
            Expression::Value(v) => Ok(ExprValue::Primitive(v.clone())),
            Expression::Designator(d) => {
                let bag = ctx.resolve_designator(&d.fqn, d.datatype)?;
                finish_bag_lookup(bag, d.must_be_present, || {
                    MissingAttributeDetail::new(&d.fqn, d.datatype)
                })
            }
            Expression::Selector(s) => {
                let bag = ctx.resolve_selector(s)?;
                finish_bag_lookup(bag, s.must_be_present, || MissingAttributeDetail {
                    category: s.category.clone(),
                    attribute_id: s.path.clone(),
                    datatype: s.datatype,
                    issuer: None,
                })
            }
            Expression::VariableRef(def) => ctx.resolve_variable(def),
            Expression::Apply(apply) => function::eval_call(&apply.function, &apply.args, ctx),
            Expression::FunctionRef(f) => Err(EvalError::processing(format!(
                "function reference {f} is not a value"
            ))),
        }
    }
}

/// Shared `mustBePresent` handling for designators and selectors: an empty
/// result with `mustBePresent=true` is a missing-attribute Indeterminate,
/// surfacing the lookup's own failure cause when it recorded one.
fn finish_bag_lookup(
    bag: Bag,
    must_be_present: bool,
    detail: impl FnOnce() -> MissingAttributeDetail,
) -> Result<ExprValue, EvalError> {
    if must_be_present && bag.is_empty() {
        return Err(match bag.cause() {
            Some(cause) => cause.clone(),
            None => EvalError::missing_attribute(detail()),
        });
    }
    Ok(ExprValue::Bag(bag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use xacml_core::Datatype;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::standard()
    }

    fn int(i: i64) -> Expression {
        Expression::Value(AttributeValue::Integer(i))
    }

    fn strv(s: &str) -> Expression {
        Expression::Value(AttributeValue::String(s.into()))
    }

    #[test]
    fn test_apply_checks_arity() {
        let err = Apply::new(FunctionId::IntegerAdd, vec![int(1)], &registry());
        assert!(err.is_err());
        let ok = Apply::new(FunctionId::IntegerAdd, vec![int(1), int(2), int(3)], &registry());
        assert!(ok.is_ok());
    }

    #[test]
    fn test_apply_checks_types() {
        let err = Apply::new(
            FunctionId::Equal(Datatype::Integer),
            vec![int(1), strv("one")],
            &registry(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_apply_return_type() {
        let apply = Apply::new(
            FunctionId::Equal(Datatype::String),
            vec![strv("a"), strv("b")],
            &registry(),
        )
        .unwrap();
        assert_eq!(
            Expression::apply(apply).return_type(),
            Some(ValueType::Primitive(Datatype::Boolean))
        );
    }

    #[test]
    fn test_higher_order_requires_function_ref() {
        let err = Apply::new(FunctionId::AnyOf, vec![int(1), int(2)], &registry());
        assert!(err.is_err());
    }

    #[test]
    fn test_constant_evaluation() {
        let registry = registry();
        let mut ctx = ContextBuilder::new().build(&registry);
        let apply = Apply::new(
            FunctionId::Equal(Datatype::String),
            vec![strv("x"), strv("x")],
            &registry,
        )
        .unwrap();
        let result = Expression::apply(apply).evaluate(&mut ctx).unwrap();
        assert_eq!(result, ExprValue::Primitive(AttributeValue::Boolean(true)));
    }
}
