//! Function library - identifiers, signatures, dispatch.
//!
//! This module provides the main entry points for function evaluation:
//! - [`FunctionId`]: the standard XACML 3.0 function set as a closed enum.
//!   Type-parameterized families (`<type>-equal`, `<type>-bag`, ...) carry
//!   their datatype, so one variant covers the whole family.
//! - [`Signature`]: construction-time arity/type checking data.
//! - [`eval_call`]: THE entry point for function evaluation. Lazy functions
//!   (logical and higher-order) receive unevaluated argument expressions;
//!   everything else is eager: all arguments are evaluated first and any
//!   argument Indeterminate makes the whole call Indeterminate.
//!
//! Family modules mirror the XACML appendix-A grouping: `equality`,
//! `arithmetic`, `compare`, `string`, `logical`, `bag`, `set`,
//! `higher_order`, `datetime`, `special`.

pub mod arithmetic;
pub mod bag;
pub mod compare;
pub mod datetime;
pub mod equality;
pub mod helpers;
pub mod higher_order;
pub mod logical;
pub mod set;
pub mod special;
pub mod string;

use crate::context::EvaluationContext;
use crate::expression::{ExprValue, Expression};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use xacml_core::{Datatype, EvalError, ValueType, XacmlError};

const P1: &str = "urn:oasis:names:tc:xacml:1.0:function:";
const P2: &str = "urn:oasis:names:tc:xacml:2.0:function:";
const P3: &str = "urn:oasis:names:tc:xacml:3.0:function:";

/// Comparison operator for the ordered-comparison families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl CompareOp {
    fn name(self) -> &'static str {
        match self {
            CompareOp::GreaterThan => "greater-than",
            CompareOp::GreaterThanOrEqual => "greater-than-or-equal",
            CompareOp::LessThan => "less-than",
            CompareOp::LessThanOrEqual => "less-than-or-equal",
        }
    }

    pub const ALL: [CompareOp; 4] = [
        CompareOp::GreaterThan,
        CompareOp::GreaterThanOrEqual,
        CompareOp::LessThan,
        CompareOp::LessThanOrEqual,
    ];
}

/// A standard XACML function, or a reference to a registered extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionId {
    // A.3.1 equality predicates
    Equal(Datatype),
    StringEqualIgnoreCase,

    // A.3.2 arithmetic
    IntegerAdd,
    DoubleAdd,
    IntegerSubtract,
    DoubleSubtract,
    IntegerMultiply,
    DoubleMultiply,
    IntegerDivide,
    DoubleDivide,
    IntegerMod,
    IntegerAbs,
    DoubleAbs,
    Round,
    Floor,

    // A.3.4 numeric conversion
    DoubleToInteger,
    IntegerToDouble,

    // A.3.5 logical (or/and/n-of are lazy)
    Or,
    And,
    NOf,
    Not,

    // A.3.6/A.3.8 ordered comparison; datatype is one of integer, double,
    // string, time, date, dateTime
    Compare(Datatype, CompareOp),
    TimeInRange,

    // A.3.7 temporal arithmetic
    DateTimeAddDayTimeDuration,
    DateTimeSubtractDayTimeDuration,
    DateTimeAddYearMonthDuration,
    DateTimeSubtractYearMonthDuration,
    DateAddYearMonthDuration,
    DateSubtractYearMonthDuration,

    // A.3.9 string functions
    StringConcatenate,
    StringStartsWith,
    StringEndsWith,
    StringContains,
    StringSubstring,
    AnyUriStartsWith,
    AnyUriEndsWith,
    AnyUriContains,
    AnyUriSubstring,
    StringNormalizeSpace,
    StringNormalizeToLowerCase,
    /// `string-from-<type>`
    StringFrom(Datatype),
    /// `<type>-from-string`
    FromString(Datatype),

    // A.3.13 regular-expression matching; datatype is the second argument's
    StringRegexpMatch(Datatype),

    // A.3.14 special matching
    X500NameMatch,
    Rfc822NameMatch,

    // A.3.10 bag functions
    OneAndOnly(Datatype),
    BagSize(Datatype),
    IsIn(Datatype),
    BagOf(Datatype),

    // A.3.11 set functions
    Intersection(Datatype),
    Union(Datatype),
    AtLeastOneMemberOf(Datatype),
    Subset(Datatype),
    SetEquals(Datatype),

    // A.3.15 higher-order bag functions (lazy)
    AnyOf,
    AllOf,
    AnyOfAny,
    AllOfAny,
    AnyOfAll,
    AllOfAll,
    Map,

    /// An extension function registered by URI (signature and behavior come
    /// from the [`FunctionRegistry`]).
    Custom(String),
}

/// First-order signature: fixed parameters, optional variadic tail, return
/// type. Arity and argument datatypes are validated when the enclosing
/// `Apply` is constructed, never at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ValueType>,
    pub variadic: Option<ValueType>,
    pub ret: ValueType,
}

impl Signature {
    fn new(params: Vec<ValueType>, ret: ValueType) -> Self {
        Self {
            params,
            variadic: None,
            ret,
        }
    }

    fn variadic(params: Vec<ValueType>, tail: ValueType, ret: ValueType) -> Self {
        Self {
            params,
            variadic: Some(tail),
            ret,
        }
    }

    /// Minimum argument count.
    pub fn min_args(&self) -> usize {
        self.params.len()
    }
}

/// How a function consumes its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionKind {
    /// Arguments evaluated eagerly, then the function is applied
    FirstOrder(Signature),
    /// or/and/n-of: boolean arguments evaluated as needed
    ShortCircuit,
    /// any-of/all-of/.../map: a sub-function applied over bag elements
    HigherOrder,
}

fn p(dt: Datatype) -> ValueType {
    ValueType::Primitive(dt)
}

fn b(dt: Datatype) -> ValueType {
    ValueType::Bag(dt)
}

const BOOL: ValueType = ValueType::Primitive(Datatype::Boolean);
const INT: ValueType = ValueType::Primitive(Datatype::Integer);
const DOUBLE: ValueType = ValueType::Primitive(Datatype::Double);
const STR: ValueType = ValueType::Primitive(Datatype::String);

/// URN prefix for a type-parameterized function name: the 1.0 namespace for
/// the classic datatypes, 2.0 for ipAddress/dnsName, 3.0 for the durations.
fn family_prefix(dt: Datatype) -> &'static str {
    match dt {
        Datatype::DayTimeDuration | Datatype::YearMonthDuration => P3,
        Datatype::IpAddress | Datatype::DnsName => P2,
        _ => P1,
    }
}

/// Datatypes with a `string-from-<type>` / `<type>-from-string` pair.
const CONVERTIBLE: [Datatype; 13] = [
    Datatype::Boolean,
    Datatype::Integer,
    Datatype::Double,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
    Datatype::AnyUri,
    Datatype::DayTimeDuration,
    Datatype::YearMonthDuration,
    Datatype::X500Name,
    Datatype::Rfc822Name,
    Datatype::IpAddress,
    Datatype::DnsName,
];

/// Datatypes with a `<type>-regexp-match` function.
const REGEXP_MATCHABLE: [Datatype; 6] = [
    Datatype::String,
    Datatype::AnyUri,
    Datatype::IpAddress,
    Datatype::DnsName,
    Datatype::Rfc822Name,
    Datatype::X500Name,
];

/// Datatypes comparable with the ordered-comparison family.
const ORDERED: [Datatype; 6] = [
    Datatype::Integer,
    Datatype::Double,
    Datatype::String,
    Datatype::Time,
    Datatype::Date,
    Datatype::DateTime,
];

impl FunctionId {
    /// The function identifier URI.
    pub fn uri(&self) -> String {
        match self {
            FunctionId::Equal(dt) => format!("{}{}-equal", family_prefix(*dt), dt.short_name()),
            FunctionId::StringEqualIgnoreCase => format!("{P3}string-equal-ignore-case"),
            FunctionId::IntegerAdd => format!("{P1}integer-add"),
            FunctionId::DoubleAdd => format!("{P1}double-add"),
            FunctionId::IntegerSubtract => format!("{P1}integer-subtract"),
            FunctionId::DoubleSubtract => format!("{P1}double-subtract"),
            FunctionId::IntegerMultiply => format!("{P1}integer-multiply"),
            FunctionId::DoubleMultiply => format!("{P1}double-multiply"),
            FunctionId::IntegerDivide => format!("{P1}integer-divide"),
            FunctionId::DoubleDivide => format!("{P1}double-divide"),
            FunctionId::IntegerMod => format!("{P1}integer-mod"),
            FunctionId::IntegerAbs => format!("{P1}integer-abs"),
            FunctionId::DoubleAbs => format!("{P1}double-abs"),
            FunctionId::Round => format!("{P1}round"),
            FunctionId::Floor => format!("{P1}floor"),
            FunctionId::DoubleToInteger => format!("{P1}double-to-integer"),
            FunctionId::IntegerToDouble => format!("{P1}integer-to-double"),
            FunctionId::Or => format!("{P1}or"),
            FunctionId::And => format!("{P1}and"),
            FunctionId::NOf => format!("{P1}n-of"),
            FunctionId::Not => format!("{P1}not"),
            FunctionId::Compare(dt, op) => {
                format!("{P1}{}-{}", dt.short_name(), op.name())
            }
            FunctionId::TimeInRange => format!("{P2}time-in-range"),
            FunctionId::DateTimeAddDayTimeDuration => {
                format!("{P3}dateTime-add-dayTimeDuration")
            }
            FunctionId::DateTimeSubtractDayTimeDuration => {
                format!("{P3}dateTime-subtract-dayTimeDuration")
            }
            FunctionId::DateTimeAddYearMonthDuration => {
                format!("{P3}dateTime-add-yearMonthDuration")
            }
            FunctionId::DateTimeSubtractYearMonthDuration => {
                format!("{P3}dateTime-subtract-yearMonthDuration")
            }
            FunctionId::DateAddYearMonthDuration => format!("{P3}date-add-yearMonthDuration"),
            FunctionId::DateSubtractYearMonthDuration => {
                format!("{P3}date-subtract-yearMonthDuration")
            }
            FunctionId::StringConcatenate => format!("{P2}string-concatenate"),
            FunctionId::StringStartsWith => format!("{P3}string-starts-with"),
            FunctionId::StringEndsWith => format!("{P3}string-ends-with"),
            FunctionId::StringContains => format!("{P3}string-contains"),
            FunctionId::StringSubstring => format!("{P3}string-substring"),
            FunctionId::AnyUriStartsWith => format!("{P3}anyURI-starts-with"),
            FunctionId::AnyUriEndsWith => format!("{P3}anyURI-ends-with"),
            FunctionId::AnyUriContains => format!("{P3}anyURI-contains"),
            FunctionId::AnyUriSubstring => format!("{P3}anyURI-substring"),
            FunctionId::StringNormalizeSpace => format!("{P1}string-normalize-space"),
            FunctionId::StringNormalizeToLowerCase => {
                format!("{P1}string-normalize-to-lower-case")
            }
            FunctionId::StringFrom(dt) => format!("{P3}string-from-{}", dt.short_name()),
            FunctionId::FromString(dt) => format!("{P3}{}-from-string", dt.short_name()),
            FunctionId::StringRegexpMatch(dt) => {
                let prefix = if *dt == Datatype::String { P1 } else { P2 };
                format!("{prefix}{}-regexp-match", dt.short_name())
            }
            FunctionId::X500NameMatch => format!("{P1}x500Name-match"),
            FunctionId::Rfc822NameMatch => format!("{P1}rfc822Name-match"),
            FunctionId::OneAndOnly(dt) => {
                format!("{}{}-one-and-only", family_prefix(*dt), dt.short_name())
            }
            FunctionId::BagSize(dt) => format!("{}{}-bag-size", family_prefix(*dt), dt.short_name()),
            FunctionId::IsIn(dt) => format!("{}{}-is-in", family_prefix(*dt), dt.short_name()),
            FunctionId::BagOf(dt) => format!("{}{}-bag", family_prefix(*dt), dt.short_name()),
            FunctionId::Intersection(dt) => {
                format!("{}{}-intersection", family_prefix(*dt), dt.short_name())
            }
            FunctionId::Union(dt) => format!("{}{}-union", family_prefix(*dt), dt.short_name()),
            FunctionId::AtLeastOneMemberOf(dt) => format!(
                "{}{}-at-least-one-member-of",
                family_prefix(*dt),
                dt.short_name()
            ),
            FunctionId::Subset(dt) => format!("{}{}-subset", family_prefix(*dt), dt.short_name()),
            FunctionId::SetEquals(dt) => {
                format!("{}{}-set-equals", family_prefix(*dt), dt.short_name())
            }
            FunctionId::AnyOf => format!("{P3}any-of"),
            FunctionId::AllOf => format!("{P3}all-of"),
            FunctionId::AnyOfAny => format!("{P3}any-of-any"),
            FunctionId::AllOfAny => format!("{P1}all-of-any"),
            FunctionId::AnyOfAll => format!("{P1}any-of-all"),
            FunctionId::AllOfAll => format!("{P1}all-of-all"),
            FunctionId::Map => format!("{P3}map"),
            FunctionId::Custom(uri) => uri.clone(),
        }
    }

    /// Every standard function instance (used to build the URI lookup table).
    fn all_standard() -> Vec<FunctionId> {
        let mut out = Vec::with_capacity(256);
        for dt in Datatype::ALL {
            out.push(FunctionId::Equal(dt));
            out.push(FunctionId::OneAndOnly(dt));
            out.push(FunctionId::BagSize(dt));
            out.push(FunctionId::IsIn(dt));
            out.push(FunctionId::BagOf(dt));
            out.push(FunctionId::Intersection(dt));
            out.push(FunctionId::Union(dt));
            out.push(FunctionId::AtLeastOneMemberOf(dt));
            out.push(FunctionId::Subset(dt));
            out.push(FunctionId::SetEquals(dt));
        }
        for dt in ORDERED {
            for op in CompareOp::ALL {
                out.push(FunctionId::Compare(dt, op));
            }
        }
        for dt in CONVERTIBLE {
            out.push(FunctionId::StringFrom(dt));
            out.push(FunctionId::FromString(dt));
        }
        for dt in REGEXP_MATCHABLE {
            out.push(FunctionId::StringRegexpMatch(dt));
        }
        out.extend([
            FunctionId::StringEqualIgnoreCase,
            FunctionId::IntegerAdd,
            FunctionId::DoubleAdd,
            FunctionId::IntegerSubtract,
            FunctionId::DoubleSubtract,
            FunctionId::IntegerMultiply,
            FunctionId::DoubleMultiply,
            FunctionId::IntegerDivide,
            FunctionId::DoubleDivide,
            FunctionId::IntegerMod,
            FunctionId::IntegerAbs,
            FunctionId::DoubleAbs,
            FunctionId::Round,
            FunctionId::Floor,
            FunctionId::DoubleToInteger,
            FunctionId::IntegerToDouble,
            FunctionId::Or,
            FunctionId::And,
            FunctionId::NOf,
            FunctionId::Not,
            FunctionId::TimeInRange,
            FunctionId::DateTimeAddDayTimeDuration,
            FunctionId::DateTimeSubtractDayTimeDuration,
            FunctionId::DateTimeAddYearMonthDuration,
            FunctionId::DateTimeSubtractYearMonthDuration,
            FunctionId::DateAddYearMonthDuration,
            FunctionId::DateSubtractYearMonthDuration,
            FunctionId::StringConcatenate,
            FunctionId::StringStartsWith,
            FunctionId::StringEndsWith,
            FunctionId::StringContains,
            FunctionId::StringSubstring,
            FunctionId::AnyUriStartsWith,
            FunctionId::AnyUriEndsWith,
            FunctionId::AnyUriContains,
            FunctionId::AnyUriSubstring,
            FunctionId::StringNormalizeSpace,
            FunctionId::StringNormalizeToLowerCase,
            FunctionId::X500NameMatch,
            FunctionId::Rfc822NameMatch,
            FunctionId::AnyOf,
            FunctionId::AllOf,
            FunctionId::AnyOfAny,
            FunctionId::AllOfAny,
            FunctionId::AnyOfAll,
            FunctionId::AllOfAll,
            FunctionId::Map,
        ]);
        out
    }

    /// Resolve a standard function URI. The XACML 1.0 spellings of the
    /// generalized 3.0 higher-order functions are accepted as aliases.
    pub fn from_uri(uri: &str) -> Option<FunctionId> {
        static TABLE: OnceLock<FxHashMap<String, FunctionId>> = OnceLock::new();
        let table = TABLE.get_or_init(|| {
            let mut map = FxHashMap::default();
            for f in FunctionId::all_standard() {
                map.insert(f.uri(), f);
            }
            // 1.0 aliases for functions re-versioned in 3.0
            map.insert(format!("{P1}any-of"), FunctionId::AnyOf);
            map.insert(format!("{P1}all-of"), FunctionId::AllOf);
            map.insert(format!("{P1}any-of-any"), FunctionId::AnyOfAny);
            map.insert(format!("{P1}map"), FunctionId::Map);
            map
        });
        table.get(uri).cloned()
    }

    /// How this function consumes its arguments.
    pub fn kind(&self) -> FunctionKind {
        use FunctionId::*;
        match self {
            Or | And | NOf => FunctionKind::ShortCircuit,
            AnyOf | AllOf | AnyOfAny | AllOfAny | AnyOfAll | AllOfAll | Map => {
                FunctionKind::HigherOrder
            }
            other => FunctionKind::FirstOrder(other.first_order_signature()),
        }
    }

    /// Signature of a first-order function. Panics on lazy/higher-order ids
    /// (those are routed through [`FunctionKind`] before signatures are
    /// consulted) and yields a placeholder for `Custom` (the registry owns
    /// extension signatures).
    fn first_order_signature(&self) -> Signature {
        use FunctionId::*;
        match self {
            Equal(dt) => Signature::new(vec![p(*dt), p(*dt)], BOOL),
            StringEqualIgnoreCase => Signature::new(vec![STR, STR], BOOL),

            IntegerAdd | IntegerMultiply => Signature::variadic(vec![INT, INT], INT, INT),
            DoubleAdd | DoubleMultiply => {
                Signature::variadic(vec![DOUBLE, DOUBLE], DOUBLE, DOUBLE)
            }
            IntegerSubtract | IntegerDivide | IntegerMod => {
                Signature::new(vec![INT, INT], INT)
            }
            DoubleSubtract | DoubleDivide => Signature::new(vec![DOUBLE, DOUBLE], DOUBLE),
            IntegerAbs => Signature::new(vec![INT], INT),
            DoubleAbs | Round | Floor => Signature::new(vec![DOUBLE], DOUBLE),
            DoubleToInteger => Signature::new(vec![DOUBLE], INT),
            IntegerToDouble => Signature::new(vec![INT], DOUBLE),

            Not => Signature::new(vec![BOOL], BOOL),

            Compare(dt, _) => Signature::new(vec![p(*dt), p(*dt)], BOOL),
            TimeInRange => {
                let t = p(Datatype::Time);
                Signature::new(vec![t, t, t], BOOL)
            }

            DateTimeAddDayTimeDuration | DateTimeSubtractDayTimeDuration => Signature::new(
                vec![p(Datatype::DateTime), p(Datatype::DayTimeDuration)],
                p(Datatype::DateTime),
            ),
            DateTimeAddYearMonthDuration | DateTimeSubtractYearMonthDuration => Signature::new(
                vec![p(Datatype::DateTime), p(Datatype::YearMonthDuration)],
                p(Datatype::DateTime),
            ),
            DateAddYearMonthDuration | DateSubtractYearMonthDuration => Signature::new(
                vec![p(Datatype::Date), p(Datatype::YearMonthDuration)],
                p(Datatype::Date),
            ),

            StringConcatenate => Signature::variadic(vec![STR, STR], STR, STR),
            StringStartsWith | StringEndsWith | StringContains => {
                Signature::new(vec![STR, STR], BOOL)
            }
            StringSubstring => Signature::new(vec![STR, INT, INT], STR),
            AnyUriStartsWith | AnyUriEndsWith | AnyUriContains => {
                Signature::new(vec![STR, p(Datatype::AnyUri)], BOOL)
            }
            AnyUriSubstring => Signature::new(vec![p(Datatype::AnyUri), INT, INT], STR),
            StringNormalizeSpace | StringNormalizeToLowerCase => Signature::new(vec![STR], STR),
            StringFrom(dt) => Signature::new(vec![p(*dt)], STR),
            FromString(dt) => Signature::new(vec![STR], p(*dt)),

            StringRegexpMatch(dt) => Signature::new(vec![STR, p(*dt)], BOOL),
            X500NameMatch => {
                let x = p(Datatype::X500Name);
                Signature::new(vec![x, x], BOOL)
            }
            Rfc822NameMatch => Signature::new(vec![STR, p(Datatype::Rfc822Name)], BOOL),

            OneAndOnly(dt) => Signature::new(vec![b(*dt)], p(*dt)),
            BagSize(dt) => Signature::new(vec![b(*dt)], INT),
            IsIn(dt) => Signature::new(vec![p(*dt), b(*dt)], BOOL),
            BagOf(dt) => Signature::variadic(vec![], p(*dt), b(*dt)),
            Intersection(dt) | Union(dt) => Signature::new(vec![b(*dt), b(*dt)], b(*dt)),
            AtLeastOneMemberOf(dt) | Subset(dt) | SetEquals(dt) => {
                Signature::new(vec![b(*dt), b(*dt)], BOOL)
            }

            // Extension signatures live in the registry; this placeholder is
            // replaced during Apply construction
            Custom(_) => Signature::variadic(vec![], STR, STR),

            Or | And | NOf | AnyOf | AllOf | AnyOfAny | AllOfAny | AnyOfAll | AllOfAll | Map => {
                unreachable!("lazy function routed to first-order signature: {self:?}")
            }
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// An extension function registered by URI.
pub trait CustomFunction: Send + Sync {
    /// First-order signature used for construction-time checking.
    fn signature(&self) -> Signature;

    /// Apply the function to eagerly-evaluated arguments.
    fn invoke(&self, args: &[ExprValue]) -> Result<ExprValue, EvalError>;
}

/// Registry of extension functions, keyed by URI.
///
/// Populated at engine bootstrap and frozen before the first evaluation;
/// the standard set needs no registration.
#[derive(Default)]
pub struct FunctionRegistry {
    custom: FxHashMap<String, Arc<dyn CustomFunction>>,
}

impl FunctionRegistry {
    /// Registry with no extensions (the standard function set only).
    pub fn standard() -> Self {
        Self::default()
    }

    /// Register an extension function. Standard URIs cannot be overridden.
    pub fn register(
        &mut self,
        uri: impl Into<String>,
        function: Arc<dyn CustomFunction>,
    ) -> Result<(), XacmlError> {
        let uri = uri.into();
        if FunctionId::from_uri(&uri).is_some() {
            return Err(XacmlError::Config {
                message: format!("cannot override standard function: {uri}"),
            });
        }
        self.custom.insert(uri, function);
        Ok(())
    }

    /// Resolve a URI to a function id, consulting extensions after the
    /// standard table.
    pub fn resolve(&self, uri: &str) -> Result<FunctionId, XacmlError> {
        if let Some(f) = FunctionId::from_uri(uri) {
            return Ok(f);
        }
        if self.custom.contains_key(uri) {
            return Ok(FunctionId::Custom(uri.to_string()));
        }
        Err(XacmlError::UnknownFunction {
            uri: uri.to_string(),
        })
    }

    /// Signature for construction-time checking.
    pub fn signature_of(&self, id: &FunctionId) -> Option<Signature> {
        match id {
            FunctionId::Custom(uri) => self.custom.get(uri).map(|f| f.signature()),
            other => match other.kind() {
                FunctionKind::FirstOrder(sig) => Some(sig),
                _ => None,
            },
        }
    }

    fn get_custom(&self, uri: &str) -> Option<&Arc<dyn CustomFunction>> {
        self.custom.get(uri)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Evaluate a function call. This is THE entry point: `Apply` evaluation
/// routes here, and higher-order functions route back through it for their
/// sub-function.
pub fn eval_call(
    id: &FunctionId,
    args: &[Expression],
    ctx: &mut EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    match id {
        // Lazy: logical short-circuit over unevaluated arguments
        FunctionId::Or => logical::eval_or(args, ctx),
        FunctionId::And => logical::eval_and(args, ctx),
        FunctionId::NOf => logical::eval_n_of(args, ctx),

        // Lazy: higher-order over a sub-function reference plus bags
        FunctionId::AnyOf
        | FunctionId::AllOf
        | FunctionId::AnyOfAny
        | FunctionId::AllOfAny
        | FunctionId::AnyOfAll
        | FunctionId::AllOfAll
        | FunctionId::Map => higher_order::eval_higher_order(id, args, ctx),

        // Eager: evaluate all arguments first; `?` propagates the first
        // Indeterminate argument as the call's Indeterminate
        _ => {
            let mut vals = Vec::with_capacity(args.len());
            for arg in args {
                vals.push(arg.evaluate(ctx)?);
            }
            apply_first_order(id, &vals, ctx)
        }
    }
}

/// Apply a first-order function to already-evaluated arguments.
///
/// Also used by the higher-order module, which substitutes bag elements for
/// sub-function parameters.
pub fn apply_first_order(
    id: &FunctionId,
    vals: &[ExprValue],
    ctx: &EvaluationContext<'_>,
) -> Result<ExprValue, EvalError> {
    use FunctionId::*;
    match id {
        Equal(_) | StringEqualIgnoreCase => equality::eval_equality(id, vals),

        IntegerAdd | DoubleAdd | IntegerSubtract | DoubleSubtract | IntegerMultiply
        | DoubleMultiply | IntegerDivide | DoubleDivide | IntegerMod | IntegerAbs | DoubleAbs
        | Round | Floor | DoubleToInteger | IntegerToDouble => {
            arithmetic::eval_arithmetic(id, vals)
        }

        Not => logical::eval_not(vals),

        Compare(..) | TimeInRange => compare::eval_compare(id, vals),

        DateTimeAddDayTimeDuration
        | DateTimeSubtractDayTimeDuration
        | DateTimeAddYearMonthDuration
        | DateTimeSubtractYearMonthDuration
        | DateAddYearMonthDuration
        | DateSubtractYearMonthDuration => datetime::eval_datetime(id, vals),

        StringConcatenate | StringStartsWith | StringEndsWith | StringContains
        | StringSubstring | AnyUriStartsWith | AnyUriEndsWith | AnyUriContains
        | AnyUriSubstring | StringNormalizeSpace | StringNormalizeToLowerCase
        | StringFrom(_) | FromString(_) => string::eval_string(id, vals),

        StringRegexpMatch(_) | X500NameMatch | Rfc822NameMatch => special::eval_special(id, vals),

        OneAndOnly(_) | BagSize(_) | IsIn(_) | BagOf(_) => bag::eval_bag(id, vals),

        Intersection(_) | Union(_) | AtLeastOneMemberOf(_) | Subset(_) | SetEquals(_) => {
            set::eval_set(id, vals)
        }

        Custom(uri) => match ctx.functions().get_custom(uri) {
            Some(f) => f.invoke(vals),
            None => Err(EvalError::processing(format!(
                "extension function not registered: {uri}"
            ))),
        },

        Or | And | NOf | AnyOf | AllOf | AnyOfAny | AllOfAny | AnyOfAll | AllOfAll | Map => {
            Err(EvalError::processing(format!(
                "function {id} cannot be applied to pre-evaluated arguments"
            )))
        }
    }
}
