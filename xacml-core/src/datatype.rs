//! Datatype identifiers.
//!
//! Centralizes the sixteen standard XACML 3.0 primitive datatypes and the
//! primitive-vs-bag distinction used throughout expression typing.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A standard XACML 3.0 primitive datatype.
///
/// The set is closed: user-defined datatypes are out of scope for the core
/// engine and rejected at load time. Each variant maps to exactly one
/// datatype URI (XML Schema URIs for the XSD-derived types, XACML URNs for
/// the rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    /// http://www.w3.org/2001/XMLSchema#string
    String,
    /// http://www.w3.org/2001/XMLSchema#boolean
    Boolean,
    /// http://www.w3.org/2001/XMLSchema#integer
    Integer,
    /// http://www.w3.org/2001/XMLSchema#double
    Double,
    /// http://www.w3.org/2001/XMLSchema#time
    Time,
    /// http://www.w3.org/2001/XMLSchema#date
    Date,
    /// http://www.w3.org/2001/XMLSchema#dateTime
    DateTime,
    /// http://www.w3.org/2001/XMLSchema#dayTimeDuration
    DayTimeDuration,
    /// http://www.w3.org/2001/XMLSchema#yearMonthDuration
    YearMonthDuration,
    /// http://www.w3.org/2001/XMLSchema#anyURI
    AnyUri,
    /// http://www.w3.org/2001/XMLSchema#hexBinary
    HexBinary,
    /// http://www.w3.org/2001/XMLSchema#base64Binary
    Base64Binary,
    /// urn:oasis:names:tc:xacml:1.0:data-type:x500Name
    X500Name,
    /// urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name
    Rfc822Name,
    /// urn:oasis:names:tc:xacml:2.0:data-type:ipAddress
    IpAddress,
    /// urn:oasis:names:tc:xacml:2.0:data-type:dnsName
    DnsName,
}

impl Datatype {
    /// All standard datatypes, in declaration order.
    pub const ALL: [Datatype; 16] = [
        Datatype::String,
        Datatype::Boolean,
        Datatype::Integer,
        Datatype::Double,
        Datatype::Time,
        Datatype::Date,
        Datatype::DateTime,
        Datatype::DayTimeDuration,
        Datatype::YearMonthDuration,
        Datatype::AnyUri,
        Datatype::HexBinary,
        Datatype::Base64Binary,
        Datatype::X500Name,
        Datatype::Rfc822Name,
        Datatype::IpAddress,
        Datatype::DnsName,
    ];

    /// The datatype identifier URI.
    pub fn uri(self) -> &'static str {
        match self {
            Datatype::String => "http://www.w3.org/2001/XMLSchema#string",
            Datatype::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Datatype::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Datatype::Double => "http://www.w3.org/2001/XMLSchema#double",
            Datatype::Time => "http://www.w3.org/2001/XMLSchema#time",
            Datatype::Date => "http://www.w3.org/2001/XMLSchema#date",
            Datatype::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
            Datatype::DayTimeDuration => "http://www.w3.org/2001/XMLSchema#dayTimeDuration",
            Datatype::YearMonthDuration => "http://www.w3.org/2001/XMLSchema#yearMonthDuration",
            Datatype::AnyUri => "http://www.w3.org/2001/XMLSchema#anyURI",
            Datatype::HexBinary => "http://www.w3.org/2001/XMLSchema#hexBinary",
            Datatype::Base64Binary => "http://www.w3.org/2001/XMLSchema#base64Binary",
            Datatype::X500Name => "urn:oasis:names:tc:xacml:1.0:data-type:x500Name",
            Datatype::Rfc822Name => "urn:oasis:names:tc:xacml:1.0:data-type:rfc822Name",
            Datatype::IpAddress => "urn:oasis:names:tc:xacml:2.0:data-type:ipAddress",
            Datatype::DnsName => "urn:oasis:names:tc:xacml:2.0:data-type:dnsName",
        }
    }

    /// Resolve a datatype URI. Accepts the XSD 1.0 duration URNs from XACML
    /// 2.0 policies as aliases for the XSD 1.1 duration URIs.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:xacml:2.0:data-type:dayTimeDuration" => {
                return Some(Datatype::DayTimeDuration)
            }
            "urn:oasis:names:tc:xacml:2.0:data-type:yearMonthDuration" => {
                return Some(Datatype::YearMonthDuration)
            }
            _ => {}
        }
        Self::ALL.into_iter().find(|dt| dt.uri() == uri)
    }

    /// Short name used in function identifiers (`integer-equal`, `x500Name-match`, ...).
    pub fn short_name(self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Boolean => "boolean",
            Datatype::Integer => "integer",
            Datatype::Double => "double",
            Datatype::Time => "time",
            Datatype::Date => "date",
            Datatype::DateTime => "dateTime",
            Datatype::DayTimeDuration => "dayTimeDuration",
            Datatype::YearMonthDuration => "yearMonthDuration",
            Datatype::AnyUri => "anyURI",
            Datatype::HexBinary => "hexBinary",
            Datatype::Base64Binary => "base64Binary",
            Datatype::X500Name => "x500Name",
            Datatype::Rfc822Name => "rfc822Name",
            Datatype::IpAddress => "ipAddress",
            Datatype::DnsName => "dnsName",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl Serialize for Datatype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.uri())
    }
}

impl<'de> Deserialize<'de> for Datatype {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Datatype::from_uri(&uri).ok_or_else(|| D::Error::custom(format!("unknown datatype: {uri}")))
    }
}

/// Declared type of an expression: a single primitive value or a bag.
///
/// Function signatures and expression return types are stated in these
/// terms; there is no bag-of-bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A single value of the given datatype
    Primitive(Datatype),
    /// A bag whose elements all have the given datatype
    Bag(Datatype),
}

impl ValueType {
    /// Element datatype (for bags) or the value datatype (for primitives).
    pub fn datatype(self) -> Datatype {
        match self {
            ValueType::Primitive(dt) | ValueType::Bag(dt) => dt,
        }
    }

    /// True if this is a bag type.
    pub fn is_bag(self) -> bool {
        matches!(self, ValueType::Bag(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Primitive(dt) => write!(f, "{}", dt.uri()),
            ValueType::Bag(dt) => write!(f, "bag<{}>", dt.uri()),
        }
    }
}
