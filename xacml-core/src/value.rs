//! AttributeValue - the typed attribute value union.
//!
//! Every attribute in a request, every literal in a policy, and every
//! intermediate expression result is an `AttributeValue`: a (datatype,
//! payload) pair that is immutable once constructed.
//!
//! ## Equality
//!
//! `==` follows the canonical form of each datatype:
//!
//! 1. **Numeric types** stay disjoint: `Integer(3) != Double(3.0)` (no
//!    implicit widening; cross-type comparison is an explicit function in
//!    the evaluation layer).
//! 2. **Temporal types** compare by normalized instant (see [`crate::temporal`]).
//! 3. **Names**: x500Name RDN values and rfc822Name domains compare
//!    case-insensitively; rfc822Name local parts are case-sensitive.
//!
//! `Hash` is consistent with `Eq`, so values can key multiset counts and
//! memoization tables.

use crate::datatype::Datatype;
use crate::error::XacmlError;
use crate::temporal::{Date, DateTime, DayTimeDuration, Time, YearMonthDuration};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// X.500 distinguished name (`x500Name` datatype).
///
/// Keeps the original lexical form and a normalized key: RDN components
/// trimmed and lowercased, so `"CN=Alice, O=Example"` equals
/// `"cn=alice,o=example"`.
#[derive(Clone, Debug)]
pub struct X500Name {
    original: String,
    normalized: String,
}

impl X500Name {
    /// Parse a distinguished name. Requires every RDN to be `name=value`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        for rdn in s.split(',') {
            let rdn = rdn.trim();
            let (name, value) = rdn
                .split_once('=')
                .ok_or_else(|| format!("invalid x500Name RDN: {rdn}"))?;
            if name.trim().is_empty() {
                return Err(format!("invalid x500Name RDN: {rdn}"));
            }
            parts.push(format!(
                "{}={}",
                name.trim().to_lowercase(),
                value.trim().to_lowercase()
            ));
        }
        Ok(Self {
            original: s.to_string(),
            normalized: parts.join(","),
        })
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// True when `self` is a terminal sequence of `other`'s RDNs, per the
    /// `x500Name-match` function (e.g. `O=Medico Corp,C=US` matches
    /// `CN=John Smith,O=Medico Corp,C=US`).
    pub fn matches_terminal_of(&self, other: &X500Name) -> bool {
        let pat: Vec<&str> = self.normalized.split(',').collect();
        let full: Vec<&str> = other.normalized.split(',').collect();
        if pat.len() > full.len() {
            return false;
        }
        full[full.len() - pat.len()..] == pat[..]
    }
}

impl PartialEq for X500Name {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for X500Name {}

impl Hash for X500Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for X500Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// RFC 822 (email-style) name: `local@domain`.
///
/// The domain compares case-insensitively, the local part case-sensitively,
/// per XACML A.3.14.
#[derive(Clone, Debug)]
pub struct Rfc822Name {
    local: String,
    domain: String,
}

impl Rfc822Name {
    /// Parse `local@domain`; exactly one `@`, both parts non-empty.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (local, domain) = s
            .split_once('@')
            .ok_or_else(|| format!("invalid rfc822Name: {s}"))?;
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(format!("invalid rfc822Name: {s}"));
        }
        Ok(Self {
            local: local.to_string(),
            domain: domain.to_lowercase(),
        })
    }

    /// Case-sensitive local part.
    pub fn local(&self) -> &str {
        &self.local
    }

    /// Lowercased domain part.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `rfc822Name-match` semantics: `pattern` is a whole name
    /// (`Anderson@sun.com`), a domain (`sun.com`), or a subdomain suffix
    /// (`.east.sun.com`).
    pub fn matches_pattern(&self, pattern: &str) -> bool {
        if let Some((local, domain)) = pattern.split_once('@') {
            return self.local == local && self.domain == domain.to_lowercase();
        }
        let pat = pattern.to_lowercase();
        if let Some(suffix) = pat.strip_prefix('.') {
            return self.domain.ends_with(&pat) || self.domain == suffix;
        }
        self.domain == pat
    }
}

impl PartialEq for Rfc822Name {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local && self.domain == other.domain
    }
}

impl Eq for Rfc822Name {}

impl Hash for Rfc822Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.local.hash(state);
        self.domain.hash(state);
    }
}

impl fmt::Display for Rfc822Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

/// A typed, immutable attribute value.
///
/// Covers the sixteen standard XACML 3.0 primitive datatypes.
#[derive(Clone, Debug)]
pub enum AttributeValue {
    /// xsd:string
    String(String),
    /// xsd:boolean
    Boolean(bool),
    /// xsd:integer (XACML integers are 64-bit signed)
    Integer(i64),
    /// xsd:double
    Double(f64),
    /// xsd:time
    Time(Time),
    /// xsd:date
    Date(Date),
    /// xsd:dateTime
    DateTime(DateTime),
    /// xsd:dayTimeDuration
    DayTimeDuration(DayTimeDuration),
    /// xsd:yearMonthDuration
    YearMonthDuration(YearMonthDuration),
    /// xsd:anyURI (kept as given; comparison is codepoint equality)
    AnyUri(String),
    /// xsd:hexBinary (canonical form: uppercase hex digits)
    HexBinary(Vec<u8>),
    /// xsd:base64Binary
    Base64Binary(Vec<u8>),
    /// urn:...:x500Name
    X500Name(X500Name),
    /// urn:...:rfc822Name
    Rfc822Name(Rfc822Name),
    /// urn:...:ipAddress (lexical form kept; equality is case-insensitive)
    IpAddress(String),
    /// urn:...:dnsName (lowercased at parse; DNS names are case-insensitive)
    DnsName(String),
}

impl AttributeValue {
    /// Parse a lexical form into a value of the given datatype.
    ///
    /// This is the single entry point for turning request/policy text into
    /// typed values; a malformed lexical form is a syntax error.
    pub fn parse(datatype: Datatype, lexical: &str) -> Result<Self, XacmlError> {
        let syntax = |msg: String| XacmlError::Syntax { message: msg };
        match datatype {
            Datatype::String => Ok(AttributeValue::String(lexical.to_string())),
            Datatype::Boolean => match lexical.trim() {
                "true" | "1" => Ok(AttributeValue::Boolean(true)),
                "false" | "0" => Ok(AttributeValue::Boolean(false)),
                other => Err(syntax(format!("invalid boolean lexical form: {other}"))),
            },
            Datatype::Integer => {
                let t = lexical.trim();
                let t = t.strip_prefix('+').unwrap_or(t);
                t.parse::<i64>()
                    .map(AttributeValue::Integer)
                    .map_err(|_| syntax(format!("invalid integer lexical form: {lexical}")))
            }
            Datatype::Double => {
                let t = lexical.trim();
                let v = match t {
                    "INF" | "+INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NaN" => f64::NAN,
                    _ => t
                        .parse::<f64>()
                        .map_err(|_| syntax(format!("invalid double lexical form: {lexical}")))?,
                };
                Ok(AttributeValue::Double(v))
            }
            Datatype::Time => Time::parse(lexical.trim())
                .map(AttributeValue::Time)
                .map_err(syntax),
            Datatype::Date => Date::parse(lexical.trim())
                .map(AttributeValue::Date)
                .map_err(syntax),
            Datatype::DateTime => DateTime::parse(lexical.trim())
                .map(AttributeValue::DateTime)
                .map_err(syntax),
            Datatype::DayTimeDuration => DayTimeDuration::parse(lexical.trim())
                .map(AttributeValue::DayTimeDuration)
                .map_err(syntax),
            Datatype::YearMonthDuration => YearMonthDuration::parse(lexical.trim())
                .map(AttributeValue::YearMonthDuration)
                .map_err(syntax),
            Datatype::AnyUri => Ok(AttributeValue::AnyUri(lexical.trim().to_string())),
            Datatype::HexBinary => {
                let t = lexical.trim();
                hex::decode(t)
                    .map(AttributeValue::HexBinary)
                    .map_err(|_| syntax(format!("invalid hexBinary lexical form: {lexical}")))
            }
            Datatype::Base64Binary => BASE64
                .decode(lexical.trim())
                .map(AttributeValue::Base64Binary)
                .map_err(|_| syntax(format!("invalid base64Binary lexical form: {lexical}"))),
            Datatype::X500Name => X500Name::parse(lexical.trim())
                .map(AttributeValue::X500Name)
                .map_err(syntax),
            Datatype::Rfc822Name => Rfc822Name::parse(lexical.trim())
                .map(AttributeValue::Rfc822Name)
                .map_err(syntax),
            Datatype::IpAddress => {
                let t = lexical.trim();
                if t.is_empty() {
                    return Err(syntax("empty ipAddress".to_string()));
                }
                Ok(AttributeValue::IpAddress(t.to_string()))
            }
            Datatype::DnsName => {
                let t = lexical.trim();
                if t.is_empty() {
                    return Err(syntax("empty dnsName".to_string()));
                }
                Ok(AttributeValue::DnsName(t.to_lowercase()))
            }
        }
    }

    /// The datatype of this value.
    pub fn datatype(&self) -> Datatype {
        match self {
            AttributeValue::String(_) => Datatype::String,
            AttributeValue::Boolean(_) => Datatype::Boolean,
            AttributeValue::Integer(_) => Datatype::Integer,
            AttributeValue::Double(_) => Datatype::Double,
            AttributeValue::Time(_) => Datatype::Time,
            AttributeValue::Date(_) => Datatype::Date,
            AttributeValue::DateTime(_) => Datatype::DateTime,
            AttributeValue::DayTimeDuration(_) => Datatype::DayTimeDuration,
            AttributeValue::YearMonthDuration(_) => Datatype::YearMonthDuration,
            AttributeValue::AnyUri(_) => Datatype::AnyUri,
            AttributeValue::HexBinary(_) => Datatype::HexBinary,
            AttributeValue::Base64Binary(_) => Datatype::Base64Binary,
            AttributeValue::X500Name(_) => Datatype::X500Name,
            AttributeValue::Rfc822Name(_) => Datatype::Rfc822Name,
            AttributeValue::IpAddress(_) => Datatype::IpAddress,
            AttributeValue::DnsName(_) => Datatype::DnsName,
        }
    }

    /// Canonical lexical form (the inverse of [`AttributeValue::parse`] up
    /// to canonicalization).
    pub fn canonical(&self) -> String {
        match self {
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Double(d) => {
                if d.is_nan() {
                    "NaN".to_string()
                } else if *d == f64::INFINITY {
                    "INF".to_string()
                } else if *d == f64::NEG_INFINITY {
                    "-INF".to_string()
                } else {
                    // Shortest round-trip form; always carries a decimal point
                    format!("{d:?}")
                }
            }
            AttributeValue::Time(t) => t.to_string(),
            AttributeValue::Date(d) => d.to_string(),
            AttributeValue::DateTime(dt) => dt.to_string(),
            AttributeValue::DayTimeDuration(d) => d.to_string(),
            AttributeValue::YearMonthDuration(d) => d.to_string(),
            AttributeValue::AnyUri(u) => u.clone(),
            AttributeValue::HexBinary(b) => hex::encode_upper(b),
            AttributeValue::Base64Binary(b) => BASE64.encode(b),
            AttributeValue::X500Name(n) => n.to_string(),
            AttributeValue::Rfc822Name(n) => n.to_string(),
            AttributeValue::IpAddress(a) => a.clone(),
            AttributeValue::DnsName(n) => n.clone(),
        }
    }

    /// Convenience accessors used throughout the function library.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }
}

/// Canonical bits for hashing a double consistently with `==`:
/// `0.0`/`-0.0` collapse, every NaN collapses.
fn double_hash_bits(d: f64) -> u64 {
    if d.is_nan() {
        f64::NAN.to_bits()
    } else if d == 0.0 {
        0.0f64.to_bits()
    } else {
        d.to_bits()
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        use AttributeValue::*;
        match (self, other) {
            (String(a), String(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            // NaN == NaN here: this is canonical-form equality for bags and
            // caches, not the IEEE `double-equal` function
            (Double(a), Double(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Time(a), Time(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (DayTimeDuration(a), DayTimeDuration(b)) => a == b,
            (YearMonthDuration(a), YearMonthDuration(b)) => a == b,
            (AnyUri(a), AnyUri(b)) => a == b,
            (HexBinary(a), HexBinary(b)) => a == b,
            (Base64Binary(a), Base64Binary(b)) => a == b,
            (X500Name(a), X500Name(b)) => a == b,
            (Rfc822Name(a), Rfc822Name(b)) => a == b,
            (IpAddress(a), IpAddress(b)) => a.eq_ignore_ascii_case(b),
            (DnsName(a), DnsName(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.datatype().hash(state);
        match self {
            AttributeValue::String(s) => s.hash(state),
            AttributeValue::Boolean(b) => b.hash(state),
            AttributeValue::Integer(i) => i.hash(state),
            AttributeValue::Double(d) => double_hash_bits(*d).hash(state),
            AttributeValue::Time(t) => t.hash(state),
            AttributeValue::Date(d) => d.hash(state),
            AttributeValue::DateTime(dt) => dt.hash(state),
            AttributeValue::DayTimeDuration(d) => d.hash(state),
            AttributeValue::YearMonthDuration(d) => d.hash(state),
            AttributeValue::AnyUri(u) => u.hash(state),
            AttributeValue::HexBinary(b) => b.hash(state),
            AttributeValue::Base64Binary(b) => b.hash(state),
            AttributeValue::X500Name(n) => n.hash(state),
            AttributeValue::Rfc822Name(n) => n.hash(state),
            AttributeValue::IpAddress(a) => a.to_lowercase().hash(state),
            AttributeValue::DnsName(n) => n.hash(state),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Wire shape: `{"dataType": "...", "value": "..."}` with the canonical
/// lexical form as the value.
#[derive(Serialize, Deserialize)]
struct WireValue {
    #[serde(rename = "dataType")]
    datatype: Datatype,
    value: String,
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireValue {
            datatype: self.datatype(),
            value: self.canonical(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireValue::deserialize(deserializer)?;
        AttributeValue::parse(wire.datatype, &wire.value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(
            AttributeValue::parse(Datatype::Boolean, "true").unwrap(),
            AttributeValue::Boolean(true)
        );
        assert_eq!(
            AttributeValue::parse(Datatype::Integer, "+42").unwrap(),
            AttributeValue::Integer(42)
        );
        assert_eq!(
            AttributeValue::parse(Datatype::Double, "-INF").unwrap(),
            AttributeValue::Double(f64::NEG_INFINITY)
        );
        assert!(AttributeValue::parse(Datatype::Integer, "4.5").is_err());
        assert!(AttributeValue::parse(Datatype::Boolean, "yes").is_err());
    }

    #[test]
    fn test_no_implicit_widening() {
        assert_ne!(
            AttributeValue::Integer(3),
            AttributeValue::Double(3.0)
        );
    }

    #[test]
    fn test_double_canonical() {
        assert_eq!(AttributeValue::Double(1.0).canonical(), "1.0");
        assert_eq!(AttributeValue::Double(0.55).canonical(), "0.55");
        assert_eq!(AttributeValue::Double(f64::NAN).canonical(), "NaN");
        assert_eq!(AttributeValue::Double(f64::INFINITY).canonical(), "INF");
    }

    #[test]
    fn test_hex_binary_canonical_uppercase() {
        let v = AttributeValue::parse(Datatype::HexBinary, "0fb7").unwrap();
        assert_eq!(v.canonical(), "0FB7");
        assert_eq!(v, AttributeValue::parse(Datatype::HexBinary, "0FB7").unwrap());
    }

    #[test]
    fn test_base64_round_trip() {
        let v = AttributeValue::parse(Datatype::Base64Binary, "aGVsbG8=").unwrap();
        assert_eq!(v, AttributeValue::Base64Binary(b"hello".to_vec()));
        assert_eq!(v.canonical(), "aGVsbG8=");
    }

    #[test]
    fn test_x500_name_equality_and_match() {
        let a = X500Name::parse("CN=John Smith, O=Medico Corp, C=US").unwrap();
        let b = X500Name::parse("cn=john smith,o=medico corp,c=us").unwrap();
        assert_eq!(a, b);

        let pat = X500Name::parse("O=Medico Corp,C=US").unwrap();
        assert!(pat.matches_terminal_of(&a));
        assert!(!a.matches_terminal_of(&pat));
        assert!(X500Name::parse("not a dn").is_err());
    }

    #[test]
    fn test_rfc822_name_semantics() {
        let n = Rfc822Name::parse("Anderson@SUN.COM").unwrap();
        assert_eq!(n.domain(), "sun.com");
        // local part stays case-sensitive
        assert_ne!(n, Rfc822Name::parse("anderson@sun.com").unwrap());
        assert_eq!(n, Rfc822Name::parse("Anderson@sun.com").unwrap());

        assert!(n.matches_pattern("Anderson@sun.com"));
        assert!(n.matches_pattern("sun.com"));
        assert!(!n.matches_pattern("anderson@sun.com"));

        let east = Rfc822Name::parse("Smith@EAST.sun.com").unwrap();
        assert!(east.matches_pattern(".east.sun.com"));
        assert!(east.matches_pattern(".sun.com"));
        assert!(!n.matches_pattern(".east.sun.com"));
    }

    #[test]
    fn test_dns_name_case_insensitive() {
        let a = AttributeValue::parse(Datatype::DnsName, "Example.COM").unwrap();
        let b = AttributeValue::parse(Datatype::DnsName, "example.com").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        use std::collections::hash_map::DefaultHasher;
        fn h(v: &AttributeValue) -> u64 {
            let mut s = DefaultHasher::new();
            v.hash(&mut s);
            s.finish()
        }
        assert_eq!(
            h(&AttributeValue::Double(0.0)),
            h(&AttributeValue::Double(-0.0))
        );
        let a = AttributeValue::parse(Datatype::IpAddress, "2001:DB8::1").unwrap();
        let b = AttributeValue::parse(Datatype::IpAddress, "2001:db8::1").unwrap();
        assert_eq!(a, b);
        assert_eq!(h(&a), h(&b));
    }

    #[test]
    fn test_serde_wire_shape() {
        let v = AttributeValue::Integer(5);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(
            json,
            r#"{"dataType":"http://www.w3.org/2001/XMLSchema#integer","value":"5"}"#
        );
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
