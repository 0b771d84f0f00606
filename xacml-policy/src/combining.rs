//! Combining algorithms (XACML appendix C).
//!
//! Each algorithm folds an ordered list of child decisions into one. The
//! implementations follow the appendix-C pseudocode directly, including
//! its short-circuits: `deny-overrides` returns on the first Deny with that
//! child's obligations, while potential Permits accumulate obligations from
//! every Permit child in document order.
//!
//! Children are always evaluated in document order here, which makes the
//! `ordered-` variants identical to their unordered namesakes; the
//! unordered ones are simply permitted, not required, to reorder.

use crate::Decidable;
use tracing::debug;
use xacml_core::{
    Decision, DecisionResult, EvalError, ExtendedIndeterminate, PepActions, Status, XacmlError,
};
use xacml_eval::EvaluationContext;

const RULE_PREFIX_1: &str = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:";
const RULE_PREFIX_3: &str = "urn:oasis:names:tc:xacml:3.0:rule-combining-algorithm:";
const POLICY_PREFIX_1: &str = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:";
const POLICY_PREFIX_3: &str = "urn:oasis:names:tc:xacml:3.0:policy-combining-algorithm:";

/// The standard combining algorithms.
///
/// The XACML 1.0/1.1 "legacy" spellings resolve to the same variants; the
/// implemented semantics are the 3.0 ones throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombiningAlgId {
    DenyOverrides,
    OrderedDenyOverrides,
    PermitOverrides,
    OrderedPermitOverrides,
    DenyUnlessPermit,
    PermitUnlessDeny,
    FirstApplicable,
    /// Policies only
    OnlyOneApplicable,
    /// Policies only; child[0] guards child[1]
    OnPermitApplySecond,
}

impl CombiningAlgId {
    fn name(self) -> &'static str {
        match self {
            CombiningAlgId::DenyOverrides => "deny-overrides",
            CombiningAlgId::OrderedDenyOverrides => "ordered-deny-overrides",
            CombiningAlgId::PermitOverrides => "permit-overrides",
            CombiningAlgId::OrderedPermitOverrides => "ordered-permit-overrides",
            CombiningAlgId::DenyUnlessPermit => "deny-unless-permit",
            CombiningAlgId::PermitUnlessDeny => "permit-unless-deny",
            CombiningAlgId::FirstApplicable => "first-applicable",
            CombiningAlgId::OnlyOneApplicable => "only-one-applicable",
            CombiningAlgId::OnPermitApplySecond => "on-permit-apply-second",
        }
    }

    /// True for algorithms defined only over policies.
    pub fn policy_only(self) -> bool {
        matches!(
            self,
            CombiningAlgId::OnlyOneApplicable | CombiningAlgId::OnPermitApplySecond
        )
    }

    /// The rule-combining-algorithm URI (3.0 namespace where one exists).
    pub fn rule_uri(self) -> String {
        match self {
            CombiningAlgId::FirstApplicable => format!("{RULE_PREFIX_1}{}", self.name()),
            _ => format!("{RULE_PREFIX_3}{}", self.name()),
        }
    }

    /// The policy-combining-algorithm URI.
    pub fn policy_uri(self) -> String {
        match self {
            CombiningAlgId::FirstApplicable | CombiningAlgId::OnlyOneApplicable => {
                format!("{POLICY_PREFIX_1}{}", self.name())
            }
            _ => format!("{POLICY_PREFIX_3}{}", self.name()),
        }
    }

    /// Resolve a rule-combining-algorithm URI (1.0 legacy spellings accepted).
    pub fn from_rule_uri(uri: &str) -> Result<Self, XacmlError> {
        let name = uri
            .strip_prefix(RULE_PREFIX_3)
            .or_else(|| uri.strip_prefix(RULE_PREFIX_1));
        match name.and_then(Self::by_name) {
            Some(alg) if !alg.policy_only() => Ok(alg),
            _ => Err(XacmlError::UnknownCombiningAlgorithm {
                uri: uri.to_string(),
            }),
        }
    }

    /// Resolve a policy-combining-algorithm URI (1.0 legacy spellings accepted).
    pub fn from_policy_uri(uri: &str) -> Result<Self, XacmlError> {
        let name = uri
            .strip_prefix(POLICY_PREFIX_3)
            .or_else(|| uri.strip_prefix(POLICY_PREFIX_1));
        match name.and_then(Self::by_name) {
            Some(alg) => Ok(alg),
            None => Err(XacmlError::UnknownCombiningAlgorithm {
                uri: uri.to_string(),
            }),
        }
    }

    fn by_name(name: &str) -> Option<Self> {
        Some(match name {
            "deny-overrides" => CombiningAlgId::DenyOverrides,
            "ordered-deny-overrides" => CombiningAlgId::OrderedDenyOverrides,
            "permit-overrides" => CombiningAlgId::PermitOverrides,
            "ordered-permit-overrides" => CombiningAlgId::OrderedPermitOverrides,
            "deny-unless-permit" => CombiningAlgId::DenyUnlessPermit,
            "permit-unless-deny" => CombiningAlgId::PermitUnlessDeny,
            "first-applicable" => CombiningAlgId::FirstApplicable,
            "only-one-applicable" => CombiningAlgId::OnlyOneApplicable,
            "on-permit-apply-second" => CombiningAlgId::OnPermitApplySecond,
            _ => return None,
        })
    }
}

impl std::fmt::Display for CombiningAlgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Combine child decisions with the given algorithm.
pub fn combine<D: Decidable>(
    alg: CombiningAlgId,
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    let result = match alg {
        CombiningAlgId::DenyOverrides | CombiningAlgId::OrderedDenyOverrides => {
            overrides(children, ctx, Decision::Deny)
        }
        CombiningAlgId::PermitOverrides | CombiningAlgId::OrderedPermitOverrides => {
            overrides(children, ctx, Decision::Permit)
        }
        CombiningAlgId::DenyUnlessPermit => unless(children, ctx, Decision::Permit),
        CombiningAlgId::PermitUnlessDeny => unless(children, ctx, Decision::Deny),
        CombiningAlgId::FirstApplicable => first_applicable(children, ctx),
        CombiningAlgId::OnlyOneApplicable => only_one_applicable(children, ctx),
        CombiningAlgId::OnPermitApplySecond => on_permit_apply_second(children, ctx),
    };
    debug!(algorithm = %alg, decision = %result, "combined");
    result
}

fn indeterminate_with(extended: ExtendedIndeterminate, status: Option<Status>) -> DecisionResult {
    DecisionResult {
        decision: Decision::Indeterminate,
        extended: Some(extended),
        status,
        pep_actions: PepActions::default(),
        applicable_policies: Vec::new(),
        used_attributes: Vec::new(),
    }
}

/// deny-overrides / permit-overrides (C.2 / C.3), with `winner` naming the
/// overriding decision. The first `winner` child returns immediately with
/// its own actions; children of the opposite decision accumulate actions
/// in document order and win only if no stronger outcome appeared.
fn overrides<D: Decidable>(
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
    winner: Decision,
) -> DecisionResult {
    let winner_ext = match winner {
        Decision::Deny => ExtendedIndeterminate::Deny,
        _ => ExtendedIndeterminate::Permit,
    };
    let loser_ext = match winner {
        Decision::Deny => ExtendedIndeterminate::Permit,
        _ => ExtendedIndeterminate::Deny,
    };

    let mut at_least_one_loser = false;
    let mut loser_result: Option<DecisionResult> = None;
    let mut err_winner: Option<Status> = None;
    let mut err_loser: Option<Status> = None;
    let mut err_both: Option<Status> = None;

    for child in children {
        let result = child.evaluate(ctx);
        match result.decision {
            d if d == winner => return result,
            Decision::Permit | Decision::Deny => {
                // The opposite decision: accumulate its actions in order
                at_least_one_loser = true;
                match &mut loser_result {
                    Some(acc) => {
                        acc.pep_actions.extend(result.pep_actions);
                        acc.applicable_policies.extend(result.applicable_policies);
                    }
                    None => loser_result = Some(result),
                }
            }
            Decision::NotApplicable => {}
            Decision::Indeterminate => {
                let slot = match result.extended_indeterminate() {
                    ExtendedIndeterminate::DenyPermit => &mut err_both,
                    e if e == winner_ext => &mut err_winner,
                    _ => &mut err_loser,
                };
                if slot.is_none() {
                    *slot = result.status;
                }
            }
        }
    }

    // C.2: Indeterminate{DP} when the winner-side error combines with any
    // opposite-side outcome; then Indeterminate{winner}; then the opposite
    // decision; then Indeterminate{loser}
    if let Some(status) = err_both {
        return indeterminate_with(ExtendedIndeterminate::DenyPermit, Some(status));
    }
    if let Some(status) = err_winner {
        if err_loser.is_some() || at_least_one_loser {
            return indeterminate_with(ExtendedIndeterminate::DenyPermit, Some(status));
        }
        return indeterminate_with(winner_ext, Some(status));
    }
    if let Some(result) = loser_result {
        return result;
    }
    if let Some(status) = err_loser {
        return indeterminate_with(loser_ext, Some(status));
    }
    DecisionResult::not_applicable()
}

/// deny-unless-permit / permit-unless-deny (C.4 / C.5): the opposite
/// default absorbs NotApplicable and Indeterminate entirely.
fn unless<D: Decidable>(
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
    winner: Decision,
) -> DecisionResult {
    let mut default_result = match winner {
        Decision::Permit => DecisionResult::simple_deny(),
        _ => DecisionResult::simple_permit(),
    };
    for child in children {
        let result = child.evaluate(ctx);
        match result.decision {
            d if d == winner => return result,
            Decision::Permit | Decision::Deny => {
                // Actions of children agreeing with the default decision
                default_result.pep_actions.extend(result.pep_actions);
                default_result
                    .applicable_policies
                    .extend(result.applicable_policies);
            }
            _ => {}
        }
    }
    default_result
}

/// first-applicable (C.8): the first child deciding anything other than
/// NotApplicable wins, Indeterminate included.
fn first_applicable<D: Decidable>(
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    for child in children {
        let result = child.evaluate(ctx);
        if result.decision != Decision::NotApplicable {
            return result;
        }
    }
    DecisionResult::not_applicable()
}

/// only-one-applicable (C.9): applicability is judged by target alone; more
/// than one applicable child, or any applicability failure, is
/// Indeterminate{DP}.
fn only_one_applicable<D: Decidable>(
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    let mut selected: Option<&D> = None;
    for child in children {
        match child.is_applicable_by_target(ctx) {
            Err(e) => {
                return DecisionResult::indeterminate(ExtendedIndeterminate::DenyPermit, &e)
            }
            Ok(true) => {
                if selected.is_some() {
                    return DecisionResult::indeterminate(
                        ExtendedIndeterminate::DenyPermit,
                        &EvalError::processing("more than one applicable policy"),
                    );
                }
                selected = Some(child);
            }
            Ok(false) => {}
        }
    }
    match selected {
        Some(child) => child.evaluate(ctx),
        None => DecisionResult::not_applicable(),
    }
}

/// on-permit-apply-second: child 0 is the guard. Permit runs child 1;
/// NotApplicable, Deny, and Indeterminate (with its annotation) pass
/// through as themselves.
fn on_permit_apply_second<D: Decidable>(
    children: &[D],
    ctx: &mut EvaluationContext<'_>,
) -> DecisionResult {
    if children.len() != 2 {
        return indeterminate_with(
            ExtendedIndeterminate::DenyPermit,
            Some(EvalError::processing("on-permit-apply-second requires exactly two children").to_status()),
        );
    }
    let guard = children[0].evaluate(ctx);
    match guard.decision {
        Decision::Permit => children[1].evaluate(ctx),
        Decision::NotApplicable => DecisionResult::not_applicable(),
        Decision::Deny | Decision::Indeterminate => guard,
    }
}
