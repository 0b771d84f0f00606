//! Target matching (XACML 5.5 - 5.8, semantics per 7.11).
//!
//! A Target is a conjunction of AnyOf elements; an AnyOf is a disjunction
//! of AllOf elements; an AllOf is a conjunction of Matches. A Match applies
//! its match function between a literal value (first argument) and each
//! element of the bag its designator/selector produces, true when any
//! element matches.
//!
//! Indeterminate handling follows the logical fold rules: a deciding value
//! (false for conjunctions, true for disjunctions) absorbs failures seen
//! elsewhere; otherwise the first failure surfaces.

use tracing::debug;
use xacml_core::{AttributeValue, Datatype, EvalError, ValueType, XacmlError};
use xacml_eval::{
    EvaluationContext, ExprValue, Expression, FunctionId, FunctionKind, FunctionRegistry,
};

/// A single Match: `matchFn(literal, element)` over the source bag.
#[derive(Debug, Clone)]
pub struct Match {
    function: FunctionId,
    literal: AttributeValue,
    source: Expression,
}

impl Match {
    /// Build a Match, checking that the function is a first-order boolean
    /// function whose parameters accept `(literal, source-element)`.
    pub fn new(
        function: FunctionId,
        literal: AttributeValue,
        source: Expression,
        registry: &FunctionRegistry,
    ) -> Result<Self, XacmlError> {
        let FunctionKind::FirstOrder(_) = function.kind() else {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                "MatchId must name a first-order function",
            ));
        };
        let sig = registry
            .signature_of(&function)
            .ok_or_else(|| XacmlError::UnknownFunction {
                uri: function.uri(),
            })?;
        if sig.ret != ValueType::Primitive(Datatype::Boolean) || sig.params.len() != 2 {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                "MatchId must name a boolean function of two arguments",
            ));
        }
        if sig.params[0] != ValueType::Primitive(literal.datatype()) {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                format!(
                    "literal has datatype {}, expected {}",
                    literal.datatype(),
                    sig.params[0]
                ),
            ));
        }
        let source_dt = match source.return_type() {
            Some(ValueType::Bag(dt)) => dt,
            _ => {
                return Err(XacmlError::syntax(
                    "Match source must be an AttributeDesignator or AttributeSelector",
                ))
            }
        };
        if sig.params[1] != ValueType::Primitive(source_dt) {
            return Err(XacmlError::invalid_arguments(
                function.uri(),
                format!("designator has datatype {source_dt}, expected {}", sig.params[1]),
            ));
        }
        Ok(Self {
            function,
            literal,
            source,
        })
    }

    /// OR over the bag: true when any element matches the literal.
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
        let bag = match self.source.evaluate(ctx)? {
            ExprValue::Bag(bag) => bag,
            ExprValue::Primitive(_) => {
                return Err(EvalError::processing("Match source produced a primitive"))
            }
        };
        let mut first_error: Option<EvalError> = None;
        for element in bag.iter() {
            let args = [
                ExprValue::Primitive(self.literal.clone()),
                ExprValue::Primitive(element.clone()),
            ];
            match xacml_eval::function::apply_first_order(&self.function, &args, ctx)
                .and_then(|v| v.expect_bool())
            {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// Conjunction of Matches.
#[derive(Debug, Clone, Default)]
pub struct AllOf {
    matches: Vec<Match>,
}

impl AllOf {
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
        let mut first_error: Option<EvalError> = None;
        for m in &self.matches {
            match m.evaluate(ctx) {
                Ok(false) => return Ok(false),
                Ok(true) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

/// Disjunction of AllOfs.
#[derive(Debug, Clone, Default)]
pub struct AnyOf {
    all_ofs: Vec<AllOf>,
}

impl AnyOf {
    pub fn new(all_ofs: Vec<AllOf>) -> Self {
        Self { all_ofs }
    }

    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
        let mut first_error: Option<EvalError> = None;
        for a in &self.all_ofs {
            match a.evaluate(ctx) {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }
}

/// A Target: conjunction of AnyOfs. An empty Target matches everything.
#[derive(Debug, Clone, Default)]
pub struct Target {
    any_ofs: Vec<AnyOf>,
}

impl Target {
    pub fn new(any_ofs: Vec<AnyOf>) -> Self {
        Self { any_ofs }
    }

    /// The match-all target.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> Result<bool, EvalError> {
        let mut first_error: Option<EvalError> = None;
        for any_of in &self.any_ofs {
            match any_of.evaluate(ctx) {
                Ok(false) => {
                    debug!("target AnyOf -> no-match");
                    return Ok(false);
                }
                Ok(true) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }
}

/// Evaluate an optional Target; absent means match-all.
pub fn evaluate_target(
    target: Option<&Target>,
    ctx: &mut EvaluationContext<'_>,
) -> Result<bool, EvalError> {
    match target {
        Some(t) => t.evaluate(ctx),
        None => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xacml_core::{AttributeFqn, Bag};
    use xacml_eval::{AttributeDesignator, ContextBuilder};

    fn registry() -> FunctionRegistry {
        FunctionRegistry::standard()
    }

    fn subject_match(value: &str, must_be_present: bool) -> Match {
        Match::new(
            FunctionId::Equal(Datatype::String),
            AttributeValue::String(value.into()),
            Expression::Designator(AttributeDesignator::new(
                AttributeFqn::new("subject", "subject-id"),
                Datatype::String,
                must_be_present,
            )),
            &registry(),
        )
        .unwrap()
    }

    fn ctx_with_subject<'a>(
        registry: &'a FunctionRegistry,
        values: &[&str],
    ) -> EvaluationContext<'a> {
        let bag = Bag::new(
            Datatype::String,
            values
                .iter()
                .map(|s| AttributeValue::String((*s).to_string()))
                .collect(),
        );
        ContextBuilder::new()
            .attribute(AttributeFqn::new("subject", "subject-id"), bag)
            .build(registry)
    }

    #[test]
    fn test_empty_target_matches_all() {
        let registry = registry();
        let mut ctx = ContextBuilder::new().build(&registry);
        assert!(Target::match_all().evaluate(&mut ctx).unwrap());
        assert!(evaluate_target(None, &mut ctx).unwrap());
    }

    #[test]
    fn test_match_is_or_over_bag() {
        let registry = registry();
        let target = Target::new(vec![AnyOf::new(vec![AllOf::new(vec![subject_match(
            "alice", false,
        )])])]);

        let mut ctx = ctx_with_subject(&registry, &["bob", "alice"]);
        assert!(target.evaluate(&mut ctx).unwrap());

        let mut ctx = ctx_with_subject(&registry, &["bob"]);
        assert!(!target.evaluate(&mut ctx).unwrap());
    }

    #[test]
    fn test_all_of_conjunction_any_of_disjunction() {
        let registry = registry();
        // AnyOf( AllOf(alice), AllOf(bob) )
        let target = Target::new(vec![AnyOf::new(vec![
            AllOf::new(vec![subject_match("alice", false)]),
            AllOf::new(vec![subject_match("bob", false)]),
        ])]);
        let mut ctx = ctx_with_subject(&registry, &["bob"]);
        assert!(target.evaluate(&mut ctx).unwrap());

        // AllOf(alice AND bob) cannot match a single-valued different subject
        let target = Target::new(vec![AnyOf::new(vec![AllOf::new(vec![
            subject_match("alice", false),
            subject_match("bob", false),
        ])])]);
        let mut ctx = ctx_with_subject(&registry, &["bob"]);
        assert!(!target.evaluate(&mut ctx).unwrap());
    }

    #[test]
    fn test_false_absorbs_indeterminate_in_all_of() {
        let registry = registry();
        // First match fails (mustBePresent on an absent attribute), second
        // is false: the false decides the AllOf
        let failing = Match::new(
            FunctionId::Equal(Datatype::String),
            AttributeValue::String("x".into()),
            Expression::Designator(AttributeDesignator::new(
                AttributeFqn::new("subject", "absent"),
                Datatype::String,
                true,
            )),
            &registry,
        )
        .unwrap();
        let target = Target::new(vec![AnyOf::new(vec![AllOf::new(vec![
            failing.clone(),
            subject_match("alice", false),
        ])])]);

        let mut ctx = ctx_with_subject(&registry, &["bob"]);
        assert!(!target.evaluate(&mut ctx).unwrap());

        // Without a deciding false, the failure surfaces
        let target = Target::new(vec![AnyOf::new(vec![AllOf::new(vec![
            failing,
            subject_match("bob", false),
        ])])]);
        let mut ctx = ctx_with_subject(&registry, &["bob"]);
        assert!(target.evaluate(&mut ctx).is_err());
    }

    #[test]
    fn test_match_rejects_bad_signature() {
        let registry = registry();
        let err = Match::new(
            FunctionId::Equal(Datatype::Integer),
            AttributeValue::String("x".into()),
            Expression::Designator(AttributeDesignator::new(
                AttributeFqn::new("subject", "subject-id"),
                Datatype::String,
                false,
            )),
            &registry,
        );
        assert!(err.is_err());
    }
}
