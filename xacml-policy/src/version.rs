//! Policy versions and version-match patterns.
//!
//! XACML versions are dotted sequences of non-negative integers
//! (`"1.2.3"`), ordered numerically segment by segment. A
//! `VersionMatchType` pattern may use `*` (any single number) and `+`
//! (any - possibly empty - tail of numbers): `"1.2.*"`, `"1.+"`, `"1.2.3"`.

use std::cmp::Ordering;
use std::fmt;
use xacml_core::XacmlError;

/// A parsed policy version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersion {
    raw: String,
    parts: Vec<u64>,
}

impl PolicyVersion {
    pub fn parse(s: &str) -> Result<Self, XacmlError> {
        if s.is_empty() {
            return Err(XacmlError::syntax("empty policy version"));
        }
        let parts = s
            .split('.')
            .map(|p| {
                p.parse::<u64>()
                    .map_err(|_| XacmlError::syntax(format!("invalid version: {s}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: s.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numeric segment order; a longer version with equal prefix is newer
        self.parts.cmp(&other.parts)
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PolicyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(u64),
    /// `*`: exactly one number, any value
    Any,
    /// `+`: zero or more numbers
    AnyTail,
}

/// A `VersionMatchType` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatch {
    raw: String,
    segments: Vec<Segment>,
}

impl VersionMatch {
    pub fn parse(s: &str) -> Result<Self, XacmlError> {
        if s.is_empty() {
            return Err(XacmlError::syntax("empty version match"));
        }
        let segments = s
            .split('.')
            .map(|p| match p {
                "*" => Ok(Segment::Any),
                "+" => Ok(Segment::AnyTail),
                n => n
                    .parse::<u64>()
                    .map(Segment::Literal)
                    .map_err(|_| XacmlError::syntax(format!("invalid version match: {s}"))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the version matches this pattern.
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        Self::match_from(&self.segments, version.parts())
    }

    fn match_from(segments: &[Segment], parts: &[u64]) -> bool {
        match segments.split_first() {
            None => parts.is_empty(),
            Some((Segment::Literal(n), rest)) => match parts.split_first() {
                Some((p, tail)) if p == n => Self::match_from(rest, tail),
                _ => false,
            },
            Some((Segment::Any, rest)) => match parts.split_first() {
                Some((_, tail)) => Self::match_from(rest, tail),
                None => false,
            },
            Some((Segment::AnyTail, rest)) => {
                // Try consuming 0..=len numbers
                (0..=parts.len()).any(|k| Self::match_from(rest, &parts[k..]))
            }
        }
    }
}

impl fmt::Display for VersionMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The three optional constraints a policy reference can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionConstraints {
    pub version: Option<VersionMatch>,
    pub earliest: Option<VersionMatch>,
    pub latest: Option<VersionMatch>,
}

impl VersionConstraints {
    /// Constraint on the exact-version pattern only.
    pub fn exact(version: VersionMatch) -> Self {
        Self {
            version: Some(version),
            ..Self::default()
        }
    }

    /// True when a version satisfies all present constraints.
    ///
    /// `earliest`/`latest` are patterns too: the version must be >= some
    /// version matching `earliest` and <= some version matching `latest`;
    /// with literal patterns this degenerates to a plain bound, which is
    /// the only shape we evaluate (wildcards in bounds match directly).
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        if let Some(m) = &self.version {
            if !m.matches(version) {
                return false;
            }
        }
        if let Some(m) = &self.earliest {
            if !m.matches(version) && !Self::bound_ok(m, version, Ordering::Greater) {
                return false;
            }
        }
        if let Some(m) = &self.latest {
            if !m.matches(version) && !Self::bound_ok(m, version, Ordering::Less) {
                return false;
            }
        }
        true
    }

    fn bound_ok(pattern: &VersionMatch, version: &PolicyVersion, dir: Ordering) -> bool {
        // Literal-only patterns are comparable as versions
        let literal: Option<Vec<u64>> = pattern
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(n) => Some(*n),
                _ => None,
            })
            .collect();
        match literal {
            Some(parts) => version.parts().cmp(&parts) == dir,
            None => false,
        }
    }
}
