//! End-to-end engine tests: policy trees built in code, requests through
//! the full preprocess -> evaluate -> post-process pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use xacml_core::{
    names, AttributeFqn, AttributeValue, Bag, Datatype, Decision, Effect, EvalError, StatusCode,
};
use xacml_eval::{
    Apply, AttributeDesignator, AttributeDesignatorType, AttributeProvider, Expression,
    FunctionId, FunctionRegistry, RequestAttributes,
};
use xacml_policy::{
    AllOf, AnyOf, CombiningAlgId, Condition, Match, PepActionExpression, PepActionExpressions,
    Policy, PolicyChild, PolicyElement, PolicySet, PolicyVersion, RootPolicyEvaluator, Rule,
    Target,
};
use xacml_pdp::{
    AttributeProviderRegistry, CombinedDecisionPostprocessor, PdpConfig, PdpEngine,
    RepeatedCategoryPreprocessor, Request, RequestAttribute, RequestCategory,
};

fn registry() -> FunctionRegistry {
    FunctionRegistry::standard()
}

fn v1() -> PolicyVersion {
    PolicyVersion::parse("1.0").unwrap()
}

fn subject_id_designator() -> Expression {
    Expression::Designator(AttributeDesignator::new(
        AttributeFqn::new(names::category::ACCESS_SUBJECT, names::attribute::SUBJECT_ID),
        Datatype::String,
        false,
    ))
}

fn subject_target(reg: &FunctionRegistry, name: &str) -> Target {
    let m = Match::new(
        FunctionId::Equal(Datatype::String),
        AttributeValue::String(name.into()),
        subject_id_designator(),
        reg,
    )
    .unwrap();
    Target::new(vec![AnyOf::new(vec![AllOf::new(vec![m])])])
}

fn subject_category(name: &str) -> RequestCategory {
    RequestCategory {
        category: names::category::ACCESS_SUBJECT.into(),
        content: None,
        attributes: vec![RequestAttribute {
            id: names::attribute::SUBJECT_ID.into(),
            issuer: None,
            values: vec![AttributeValue::String(name.into())],
            include_in_result: false,
        }],
    }
}

fn int_attr(category: &str, id: &str, value: i64) -> RequestCategory {
    RequestCategory {
        category: category.into(),
        content: None,
        attributes: vec![RequestAttribute {
            id: id.into(),
            issuer: None,
            values: vec![AttributeValue::Integer(value)],
            include_in_result: false,
        }],
    }
}

fn request(categories: Vec<RequestCategory>) -> Request {
    Request {
        categories,
        ..Request::default()
    }
}

fn engine_for(root: PolicyElement) -> PdpEngine {
    PdpEngine::builder(RootPolicyEvaluator::new(root)).build()
}

/// Rule Effect=Permit, Target matches subject-id="Julius Hibbert",
/// Condition absent: Permit.
#[test]
fn permit_rule_with_matching_subject_target() {
    let reg = registry();
    let policy = Policy::new(
        "doctor-access",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new(
            "hibbert-permit",
            Effect::Permit,
            Some(subject_target(&reg, "Julius Hibbert")),
            None,
            vec![],
            vec![],
        )],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::Policy(Arc::new(policy)));

    let response = engine.evaluate(&request(vec![subject_category("Julius Hibbert")]));
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].decision, Decision::Permit);

    let response = engine.evaluate(&request(vec![subject_category("Homer Simpson")]));
    assert_eq!(response.results[0].decision, Decision::NotApplicable);
}

/// PolicySet with permit-overrides over {Deny, Permit, NotApplicable}:
/// Permit with only the Permit child's obligations.
#[test]
fn permit_overrides_keeps_winner_obligations_only() {
    let reg = registry();
    let deny = Policy::new(
        "always-deny",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new(
            "deny",
            Effect::Deny,
            None,
            None,
            vec![PepActionExpression::new("audit-deny", Effect::Deny, vec![])],
            vec![],
        )],
        PepActionExpressions::default(),
    )
    .unwrap();
    let permit = Policy::new(
        "always-permit",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new(
            "permit",
            Effect::Permit,
            None,
            None,
            vec![PepActionExpression::new("audit-permit", Effect::Permit, vec![])],
            vec![],
        )],
        PepActionExpressions::default(),
    )
    .unwrap();
    let not_applicable = Policy::new(
        "never-matches",
        v1(),
        Some(subject_target(&reg, "nobody")),
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("na", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();

    let set = PolicySet::new(
        "set",
        v1(),
        None,
        CombiningAlgId::PermitOverrides,
        vec![
            PolicyChild::Policy(Arc::new(deny)),
            PolicyChild::Policy(Arc::new(permit)),
            PolicyChild::Policy(Arc::new(not_applicable)),
        ],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::PolicySet(Arc::new(set)));

    let response = engine.evaluate(&request(vec![subject_category("anyone")]));
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Permit);
    let ids: Vec<_> = result.obligations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["audit-permit"]);
}

/// Nested permit-overrides with an age-difference condition: subject
/// "Julius Hibbert" with age 55 against a dependant's age 10 permits via
/// the second policy's arithmetic rule.
#[test]
fn nested_permit_overrides_age_difference() {
    let reg = registry();

    let age_designator = |id: &str| {
        Expression::apply(
            Apply::new(
                FunctionId::OneAndOnly(Datatype::Integer),
                vec![Expression::Designator(AttributeDesignator::new(
                    AttributeFqn::new(names::category::ACCESS_SUBJECT, id),
                    Datatype::Integer,
                    true,
                ))],
                &reg,
            )
            .unwrap(),
        )
    };
    // integer-greater-than-or-equal(integer-subtract(age, dependant-age), 5)
    let difference = Expression::apply(
        Apply::new(
            FunctionId::IntegerSubtract,
            vec![age_designator("age"), age_designator("dependant-age")],
            &reg,
        )
        .unwrap(),
    );
    let condition = Condition::new(Expression::apply(
        Apply::new(
            FunctionId::Compare(
                Datatype::Integer,
                xacml_eval::CompareOp::GreaterThanOrEqual,
            ),
            vec![difference, Expression::Value(AttributeValue::Integer(5))],
            &reg,
        )
        .unwrap(),
    ))
    .unwrap();

    let policy1 = Policy::new(
        "policy1",
        v1(),
        Some(subject_target(&reg, "nobody-else")),
        CombiningAlgId::PermitOverrides,
        vec![Rule::new("rule1", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let policy2 = Policy::new(
        "policy2",
        v1(),
        Some(subject_target(&reg, "Julius Hibbert")),
        CombiningAlgId::PermitOverrides,
        vec![
            Rule::new(
                "rule1",
                Effect::Permit,
                Some(subject_target(&reg, "someone-else")),
                None,
                vec![],
                vec![],
            ),
            Rule::new("rule2", Effect::Permit, None, Some(condition), vec![], vec![]),
        ],
        PepActionExpressions::default(),
    )
    .unwrap();

    let set = PolicySet::new(
        "age-set",
        v1(),
        None,
        CombiningAlgId::PermitOverrides,
        vec![
            PolicyChild::Policy(Arc::new(policy1)),
            PolicyChild::Policy(Arc::new(policy2)),
        ],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::PolicySet(Arc::new(set)));

    let mut subject = subject_category("Julius Hibbert");
    subject.attributes.push(RequestAttribute {
        id: "age".into(),
        issuer: None,
        values: vec![AttributeValue::Integer(55)],
        include_in_result: false,
    });
    subject.attributes.push(RequestAttribute {
        id: "dependant-age".into(),
        issuer: None,
        values: vec![AttributeValue::Integer(10)],
        include_in_result: false,
    });

    let response = engine.evaluate(&request(vec![subject]));
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Permit);
    assert!(result.obligations.is_empty());
}

/// CombinedDecision without a combining post-processor: syntax-error
/// Indeterminate, no policy evaluation.
#[test]
fn combined_decision_unsupported_is_syntax_error() {
    let policy = Policy::new(
        "p",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::Policy(Arc::new(policy)));

    let mut req = request(vec![subject_category("anyone")]);
    req.combined_decision = true;
    let response = engine.evaluate(&req);
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Indeterminate);
    assert_eq!(result.status.as_ref().unwrap().code, StatusCode::SyntaxError);
}

/// Multiple-decision fan-out end to end, then combined into one decision.
#[test]
fn repeated_categories_fan_out_and_combine() {
    let reg = registry();
    let policy = Policy::new(
        "all-permit",
        v1(),
        Some(subject_target(&reg, "alice")),
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();

    let engine = PdpEngine::builder(RootPolicyEvaluator::new(PolicyElement::Policy(Arc::new(
        policy,
    ))))
    .request_preprocessor(Box::new(RepeatedCategoryPreprocessor::new(true)))
    .result_postprocessor(Box::new(CombinedDecisionPostprocessor))
    .build();

    // two resources: two individual decisions
    let req = request(vec![
        subject_category("alice"),
        int_attr(names::category::RESOURCE, "resource-id", 1),
        int_attr(names::category::RESOURCE, "resource-id", 2),
    ]);
    let response = engine.evaluate(&req);
    assert_eq!(response.results.len(), 2);
    assert!(response.results.iter().all(|r| r.decision == Decision::Permit));

    // same request with CombinedDecision: a single agreeing Permit
    let mut combined = req.clone();
    combined.combined_decision = true;
    let response = engine.evaluate(&combined);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].decision, Decision::Permit);
}

/// A provider-backed attribute is resolved once per evaluation and the
/// decision cache short-circuits repeat requests entirely.
#[test]
fn decision_cache_skips_reevaluation() {
    struct CountingProvider {
        declared: Vec<AttributeDesignatorType>,
        calls: AtomicUsize,
    }

    impl AttributeProvider for CountingProvider {
        fn provided_attributes(&self) -> &[AttributeDesignatorType] {
            &self.declared
        }
        fn resolve(
            &self,
            _fqn: &AttributeFqn,
            _datatype: Datatype,
            _request: &RequestAttributes<'_>,
        ) -> Result<Bag, EvalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bag::singleton(AttributeValue::String("clerk".into())))
        }
    }

    let reg = registry();
    let provider = Arc::new(CountingProvider {
        declared: vec![AttributeDesignatorType::new(
            names::category::ACCESS_SUBJECT,
            "role",
            Datatype::String,
        )],
        calls: AtomicUsize::new(0),
    });

    let role_match = Match::new(
        FunctionId::Equal(Datatype::String),
        AttributeValue::String("clerk".into()),
        Expression::Designator(AttributeDesignator::new(
            AttributeFqn::new(names::category::ACCESS_SUBJECT, "role"),
            Datatype::String,
            false,
        )),
        &reg,
    )
    .unwrap();
    let policy = Policy::new(
        "role-gate",
        v1(),
        Some(Target::new(vec![AnyOf::new(vec![AllOf::new(vec![
            role_match,
        ])])])),
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();

    let providers =
        AttributeProviderRegistry::new(vec![provider.clone() as Arc<dyn AttributeProvider>])
            .unwrap();
    let engine = PdpEngine::builder(RootPolicyEvaluator::new(PolicyElement::Policy(Arc::new(
        policy,
    ))))
    .config(PdpConfig {
        decision_cache_capacity: Some(16),
        ..PdpConfig::default()
    })
    .attribute_providers(providers)
    .build();

    let req = request(vec![subject_category("anyone")]);
    assert_eq!(engine.evaluate(&req).results[0].decision, Decision::Permit);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // identical request: served from the decision cache, no PIP call
    assert_eq!(engine.evaluate(&req).results[0].decision, Decision::Permit);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

    // invalidation forces reevaluation
    engine.invalidate_cache();
    assert_eq!(engine.evaluate(&req).results[0].decision, Decision::Permit);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

/// ReturnPolicyIdList surfaces the applicable policy chain, children first.
#[test]
fn return_policy_id_list() {
    let policy = Policy::new(
        "inner",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let set = PolicySet::new(
        "outer",
        v1(),
        None,
        CombiningAlgId::PermitOverrides,
        vec![PolicyChild::Policy(Arc::new(policy))],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::PolicySet(Arc::new(set)));

    let mut req = request(vec![subject_category("anyone")]);
    req.return_policy_id_list = true;
    let response = engine.evaluate(&req);
    let ids: Vec<_> = response.results[0]
        .applicable_policies
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(ids, ["inner", "outer"]);
}

/// Environment attributes come from one snapshot; a time-window policy is
/// deterministic under evaluate_at.
#[test]
fn environment_snapshot_is_deterministic() {
    let reg = registry();
    // Permit only between 09:00 and 17:00 UTC
    let current_time = Expression::apply(
        Apply::new(
            FunctionId::OneAndOnly(Datatype::Time),
            vec![Expression::Designator(AttributeDesignator::new(
                AttributeFqn::new(
                    names::category::ENVIRONMENT,
                    names::attribute::CURRENT_TIME,
                ),
                Datatype::Time,
                true,
            ))],
            &reg,
        )
        .unwrap(),
    );
    let in_hours = Condition::new(Expression::apply(
        Apply::new(
            FunctionId::TimeInRange,
            vec![
                current_time,
                Expression::Value(AttributeValue::parse(Datatype::Time, "09:00:00Z").unwrap()),
                Expression::Value(AttributeValue::parse(Datatype::Time, "17:00:00Z").unwrap()),
            ],
            &reg,
        )
        .unwrap(),
    ))
    .unwrap();
    let policy = Policy::new(
        "business-hours",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, Some(in_hours), vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::Policy(Arc::new(policy)));

    let req = request(vec![subject_category("anyone")]);
    let noon = chrono::DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let midnight = chrono::DateTime::parse_from_rfc3339("2024-06-01T00:30:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    for _ in 0..3 {
        assert_eq!(
            engine.evaluate_at(&req, noon).results[0].decision,
            Decision::Permit
        );
        assert_eq!(
            engine.evaluate_at(&req, midnight).results[0].decision,
            Decision::NotApplicable
        );
    }
}

/// An exceeded deadline surfaces as a processing-error Indeterminate, not
/// a panic or API error.
#[test]
fn deadline_exceeded_is_processing_error() {
    let policy = Policy::new(
        "p",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = PdpEngine::builder(RootPolicyEvaluator::new(PolicyElement::Policy(Arc::new(
        policy,
    ))))
    .config(PdpConfig {
        evaluation_timeout_ms: Some(0),
        ..PdpConfig::default()
    })
    .build();

    // the zero deadline has passed by the time the root policy is reached
    let response = engine.evaluate(&request(vec![subject_category("anyone")]));
    let result = &response.results[0];
    assert_eq!(result.decision, Decision::Indeterminate);
    assert_eq!(
        result.status.as_ref().unwrap().code,
        StatusCode::ProcessingError
    );
}

/// IncludeInResult attributes are echoed into the Result.
#[test]
fn include_in_result_echo() {
    let policy = Policy::new(
        "p",
        v1(),
        None,
        CombiningAlgId::DenyOverrides,
        vec![Rule::new("r", Effect::Permit, None, None, vec![], vec![])],
        PepActionExpressions::default(),
    )
    .unwrap();
    let engine = engine_for(PolicyElement::Policy(Arc::new(policy)));

    let mut subject = subject_category("alice");
    subject.attributes[0].include_in_result = true;
    let response = engine.evaluate(&request(vec![subject]));
    let result = &response.results[0];
    assert_eq!(result.attributes.len(), 1);
    assert_eq!(
        result.attributes[0].attributes[0].id,
        names::attribute::SUBJECT_ID
    );
}
