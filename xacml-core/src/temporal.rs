//! Temporal types for XACML time, date, dateTime and the two XSD durations.
//!
//! This module provides structured temporal types that:
//! - Preserve the original lexical form for round-trip serialization
//! - Normalize to instants (or total micro/month counts) for comparison
//! - Support the XACML temporal-arithmetic functions
//!   (`dateTime-add-dayTimeDuration`, `date-add-yearMonthDuration`, ...)
//!
//! ## Comparison Semantics
//!
//! Values are compared by their normalized instant, not by lexical form:
//! `"2024-01-01T05:00:00Z"` equals `"2024-01-01T00:00:00-05:00"`.
//! Values without a timezone are treated as UTC for comparison purposes.
//!
//! ## Durations
//!
//! `dayTimeDuration` is an exact microsecond count; `yearMonthDuration` is an
//! exact month count. Both are totally ordered. The general XSD `duration`
//! (mixing months and days) is not a XACML datatype and is not modeled.

use chrono::{
    DateTime as ChronoDateTime, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Timelike,
    Utc,
};
use std::cmp::Ordering;
use std::fmt;

/// Parse error message for a temporal lexical form.
fn bad_lexical(kind: &str, s: &str) -> String {
    format!("invalid {kind} lexical form: {s}")
}

/// Split a trailing timezone suffix (`Z`, `+hh:mm`, `-hh:mm`) off a lexical
/// form, returning the remainder and the parsed offset.
fn split_tz(s: &str) -> (&str, Option<Result<FixedOffset, ()>>) {
    if let Some(rest) = s.strip_suffix('Z') {
        return (rest, Some(Ok(FixedOffset::east_opt(0).unwrap())));
    }
    // An offset is always the last 6 chars: +hh:mm or -hh:mm. Dates contain
    // '-' separators, so only a sign at exactly len-6 counts.
    if s.len() > 6 {
        let tail = &s[s.len() - 6..];
        let sign = match tail.as_bytes()[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return (s, None),
        };
        if tail.as_bytes()[3] == b':' {
            let hours: Option<i32> = tail[1..3].parse().ok();
            let mins: Option<i32> = tail[4..6].parse().ok();
            if let (Some(h), Some(m)) = (hours, mins) {
                if h <= 14 && m < 60 {
                    let offset = FixedOffset::east_opt(sign * (h * 3600 + m * 60));
                    return (&s[..s.len() - 6], Some(offset.ok_or(())));
                }
            }
            return (&s[..s.len() - 6], Some(Err(())));
        }
    }
    (s, None)
}

fn format_tz(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "Z".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.unsigned_abs();
    format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

// ============================================================================
// DateTime
// ============================================================================

/// XSD dateTime with timezone preservation.
///
/// Stores both the normalized UTC instant (for comparison) and the original
/// string representation (for serialization).
#[derive(Clone, Debug)]
pub struct DateTime {
    /// Normalized UTC instant for comparison
    instant: ChronoDateTime<Utc>,
    /// Original timezone offset (None = no timezone in input, treated as UTC)
    tz_offset: Option<FixedOffset>,
    /// Original string for round-trip serialization
    original: String,
}

impl DateTime {
    /// Parse an XSD dateTime string.
    ///
    /// Accepts `2024-01-15T10:30:00Z`, `2024-01-15T10:30:00+05:00`,
    /// `2024-01-15T10:30:00.123Z`, and the timezone-less form (treated as
    /// UTC for comparison).
    pub fn parse(s: &str) -> Result<Self, String> {
        let (body, tz) = split_tz(s);
        let tz_offset = match tz {
            None => None,
            Some(Ok(offset)) => Some(offset),
            Some(Err(())) => return Err(bad_lexical("dateTime", s)),
        };
        let naive = chrono::NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|_| bad_lexical("dateTime", s))?;
        let instant = match tz_offset {
            Some(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| bad_lexical("dateTime", s))?
                .with_timezone(&Utc),
            None => Utc.from_utc_datetime(&naive),
        };
        Ok(Self {
            instant,
            tz_offset,
            original: s.to_string(),
        })
    }

    fn from_instant(instant: ChronoDateTime<Utc>, tz_offset: Option<FixedOffset>) -> Self {
        let original = match tz_offset {
            Some(offset) => {
                let local = instant.with_timezone(&offset);
                format!(
                    "{}{}",
                    local.format("%Y-%m-%dT%H:%M:%S%.f"),
                    format_tz(offset)
                )
            }
            None => instant.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        };
        Self {
            instant,
            tz_offset,
            original,
        }
    }

    /// The normalized UTC instant.
    pub fn instant(&self) -> ChronoDateTime<Utc> {
        self.instant
    }

    /// Original timezone offset, if the lexical form carried one.
    pub fn tz_offset(&self) -> Option<FixedOffset> {
        self.tz_offset
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Add a dayTimeDuration (exact microseconds). Negative durations subtract.
    pub fn add_day_time_duration(&self, d: &DayTimeDuration) -> Option<Self> {
        let instant = self
            .instant
            .checked_add_signed(chrono::Duration::microseconds(d.micros()))?;
        Some(Self::from_instant(instant, self.tz_offset))
    }

    /// Add a yearMonthDuration (calendar months, day clamped to month end).
    pub fn add_year_month_duration(&self, d: &YearMonthDuration) -> Option<Self> {
        let months = d.months();
        let instant = if months >= 0 {
            self.instant.checked_add_months(Months::new(months as u32))?
        } else {
            self.instant
                .checked_sub_months(Months::new(months.unsigned_abs()))?
        };
        Some(Self::from_instant(instant, self.tz_offset))
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for DateTime {}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for DateTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.instant.timestamp_micros().hash(state);
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ============================================================================
// Date
// ============================================================================

/// XSD date (year-month-day with optional timezone).
#[derive(Clone, Debug)]
pub struct Date {
    date: NaiveDate,
    tz_offset: Option<FixedOffset>,
    original: String,
}

impl Date {
    /// Parse an XSD date string: `2024-01-15`, `2024-01-15Z`, `2024-01-15-05:00`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (body, tz) = split_tz(s);
        let tz_offset = match tz {
            None => None,
            Some(Ok(offset)) => Some(offset),
            Some(Err(())) => return Err(bad_lexical("date", s)),
        };
        let date =
            NaiveDate::parse_from_str(body, "%Y-%m-%d").map_err(|_| bad_lexical("date", s))?;
        Ok(Self {
            date,
            tz_offset,
            original: s.to_string(),
        })
    }

    fn from_naive(date: NaiveDate, tz_offset: Option<FixedOffset>) -> Self {
        let original = match tz_offset {
            Some(offset) => format!("{}{}", date.format("%Y-%m-%d"), format_tz(offset)),
            None => date.format("%Y-%m-%d").to_string(),
        };
        Self {
            date,
            tz_offset,
            original,
        }
    }

    /// The date value.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Original timezone offset, if present.
    pub fn tz_offset(&self) -> Option<FixedOffset> {
        self.tz_offset
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Comparison key: the starting instant of the date in its timezone
    /// (UTC when absent), in seconds.
    fn instant_key(&self) -> i64 {
        let midnight = self.date.and_time(NaiveTime::MIN);
        let offset_secs = self.tz_offset.map_or(0, |o| o.local_minus_utc()) as i64;
        midnight.and_utc().timestamp() - offset_secs
    }

    /// Add a yearMonthDuration (calendar months, day clamped to month end).
    pub fn add_year_month_duration(&self, d: &YearMonthDuration) -> Option<Self> {
        let months = d.months();
        let date = if months >= 0 {
            self.date.checked_add_months(Months::new(months as u32))?
        } else {
            self.date
                .checked_sub_months(Months::new(months.unsigned_abs()))?
        };
        Some(Self::from_naive(date, self.tz_offset))
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.instant_key() == other.instant_key()
    }
}

impl Eq for Date {}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant_key().cmp(&other.instant_key())
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for Date {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.instant_key().hash(state);
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ============================================================================
// Time
// ============================================================================

/// XSD time (time-of-day with optional timezone).
#[derive(Clone, Debug)]
pub struct Time {
    time: NaiveTime,
    tz_offset: Option<FixedOffset>,
    original: String,
}

impl Time {
    /// Parse an XSD time string: `08:23:47`, `08:23:47.5Z`, `08:23:47-05:00`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (body, tz) = split_tz(s);
        let tz_offset = match tz {
            None => None,
            Some(Ok(offset)) => Some(offset),
            Some(Err(())) => return Err(bad_lexical("time", s)),
        };
        let time =
            NaiveTime::parse_from_str(body, "%H:%M:%S%.f").map_err(|_| bad_lexical("time", s))?;
        Ok(Self {
            time,
            tz_offset,
            original: s.to_string(),
        })
    }

    /// The time-of-day value.
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Original timezone offset, if present.
    pub fn tz_offset(&self) -> Option<FixedOffset> {
        self.tz_offset
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Comparison key: UTC-normalized microseconds since midnight, wrapped to
    /// one day so `23:00-02:00` and `01:00Z` compare equal.
    fn utc_micros(&self) -> i64 {
        const DAY: i64 = 24 * 3600 * 1_000_000;
        let local = self.time.num_seconds_from_midnight() as i64 * 1_000_000
            + (self.time.nanosecond() / 1000) as i64;
        let offset = self.tz_offset.map_or(0, |o| o.local_minus_utc()) as i64 * 1_000_000;
        (local - offset).rem_euclid(DAY)
    }

    /// True when this time is within `[lower, upper]`, handling ranges that
    /// wrap around midnight (lower > upper).
    pub fn in_range(&self, lower: &Time, upper: &Time) -> bool {
        let t = self.utc_micros();
        let lo = lower.utc_micros();
        let hi = upper.utc_micros();
        if lo <= hi {
            lo <= t && t <= hi
        } else {
            lo <= t || t <= hi
        }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.utc_micros() == other.utc_micros()
    }
}

impl Eq for Time {}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.utc_micros().cmp(&other.utc_micros())
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for Time {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.utc_micros().hash(state);
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ============================================================================
// YearMonthDuration
// ============================================================================

/// XSD yearMonthDuration — months-only duration (totally orderable).
#[derive(Clone, Debug)]
pub struct YearMonthDuration {
    months: i32,
    original: String,
}

impl YearMonthDuration {
    /// Parse an XSD yearMonthDuration string: `P1Y2M`, `-P1Y`, `P14M`.
    ///
    /// Day (`D`) and time (`T`) components are rejected.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let body = rest
            .strip_prefix('P')
            .ok_or_else(|| bad_lexical("yearMonthDuration", s))?;
        if body.contains('D') || body.contains('T') {
            return Err(bad_lexical("yearMonthDuration", s));
        }

        let mut years: i64 = 0;
        let mut months_part: i64 = 0;
        let mut found_any = false;
        let mut remaining = body;

        if let Some(y_pos) = remaining.find('Y') {
            years = remaining[..y_pos]
                .parse()
                .map_err(|_| bad_lexical("yearMonthDuration", s))?;
            remaining = &remaining[y_pos + 1..];
            found_any = true;
        }
        if let Some(m_pos) = remaining.find('M') {
            months_part = remaining[..m_pos]
                .parse()
                .map_err(|_| bad_lexical("yearMonthDuration", s))?;
            remaining = &remaining[m_pos + 1..];
            found_any = true;
        }
        if !found_any || !remaining.is_empty() || years < 0 || months_part < 0 {
            return Err(bad_lexical("yearMonthDuration", s));
        }

        let total = years * 12 + months_part;
        let total = if negative { -total } else { total };
        let months = i32::try_from(total).map_err(|_| bad_lexical("yearMonthDuration", s))?;
        Ok(Self {
            months,
            original: s.to_string(),
        })
    }

    /// Construct from a total number of months.
    pub fn from_months(months: i32) -> Self {
        let original = Self::make_canonical(months);
        Self { months, original }
    }

    fn make_canonical(months: i32) -> String {
        let negative = months < 0;
        let abs = months.unsigned_abs();
        let y = abs / 12;
        let m = abs % 12;
        let prefix = if negative { "-P" } else { "P" };
        match (y, m) {
            (0, _) => format!("{prefix}{m}M"),
            (_, 0) => format!("{prefix}{y}Y"),
            _ => format!("{prefix}{y}Y{m}M"),
        }
    }

    /// Total signed months.
    pub fn months(&self) -> i32 {
        self.months
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Negated duration (canonical lexical form).
    pub fn negated(&self) -> Self {
        Self::from_months(-self.months)
    }
}

impl PartialEq for YearMonthDuration {
    fn eq(&self, other: &Self) -> bool {
        self.months == other.months
    }
}

impl Eq for YearMonthDuration {}

impl Ord for YearMonthDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.months.cmp(&other.months)
    }
}

impl PartialOrd for YearMonthDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for YearMonthDuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.months.hash(state);
    }
}

impl fmt::Display for YearMonthDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ============================================================================
// DayTimeDuration
// ============================================================================

/// XSD dayTimeDuration — day/time duration as exact microseconds (totally
/// orderable).
#[derive(Clone, Debug)]
pub struct DayTimeDuration {
    micros: i64,
    original: String,
}

impl DayTimeDuration {
    /// Parse an XSD dayTimeDuration string: `P3D`, `PT26H`, `P1DT2H3M4.5S`,
    /// `-PT1M`.
    ///
    /// Year (`Y`) and month (`M` before `T`) components are rejected.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (negative, rest) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let body = rest
            .strip_prefix('P')
            .ok_or_else(|| bad_lexical("dayTimeDuration", s))?;
        if body.contains('Y') {
            return Err(bad_lexical("dayTimeDuration", s));
        }

        let (date_part, time_part) = match body.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (body, None),
        };
        if date_part.contains('M') {
            // A month component would make this a general duration
            return Err(bad_lexical("dayTimeDuration", s));
        }

        let mut micros: i64 = 0;
        let mut found_any = false;

        let mut remaining = date_part;
        if let Some(d_pos) = remaining.find('D') {
            let days: i64 = remaining[..d_pos]
                .parse()
                .map_err(|_| bad_lexical("dayTimeDuration", s))?;
            if days < 0 {
                return Err(bad_lexical("dayTimeDuration", s));
            }
            micros += days * 86_400 * 1_000_000;
            remaining = &remaining[d_pos + 1..];
            found_any = true;
        }
        if !remaining.is_empty() {
            return Err(bad_lexical("dayTimeDuration", s));
        }

        if let Some(t) = time_part {
            let mut remaining = t;
            if let Some(h_pos) = remaining.find('H') {
                let hours: i64 = remaining[..h_pos]
                    .parse()
                    .map_err(|_| bad_lexical("dayTimeDuration", s))?;
                if hours < 0 {
                    return Err(bad_lexical("dayTimeDuration", s));
                }
                micros += hours * 3_600 * 1_000_000;
                remaining = &remaining[h_pos + 1..];
                found_any = true;
            }
            if let Some(m_pos) = remaining.find('M') {
                let mins: i64 = remaining[..m_pos]
                    .parse()
                    .map_err(|_| bad_lexical("dayTimeDuration", s))?;
                if mins < 0 {
                    return Err(bad_lexical("dayTimeDuration", s));
                }
                micros += mins * 60 * 1_000_000;
                remaining = &remaining[m_pos + 1..];
                found_any = true;
            }
            if let Some(s_pos) = remaining.find('S') {
                let secs: f64 = remaining[..s_pos]
                    .parse()
                    .map_err(|_| bad_lexical("dayTimeDuration", s))?;
                if secs < 0.0 || !secs.is_finite() {
                    return Err(bad_lexical("dayTimeDuration", s));
                }
                micros += (secs * 1_000_000.0).round() as i64;
                remaining = &remaining[s_pos + 1..];
                found_any = true;
            }
            if !remaining.is_empty() {
                return Err(bad_lexical("dayTimeDuration", s));
            }
        }

        if !found_any {
            return Err(bad_lexical("dayTimeDuration", s));
        }

        let micros = if negative { -micros } else { micros };
        Ok(Self {
            micros,
            original: s.to_string(),
        })
    }

    /// Construct from a total microsecond count.
    pub fn from_micros(micros: i64) -> Self {
        let original = Self::make_canonical(micros);
        Self { micros, original }
    }

    fn make_canonical(micros: i64) -> String {
        if micros == 0 {
            return "PT0S".to_string();
        }
        let negative = micros < 0;
        let mut abs = micros.unsigned_abs();
        let days = abs / (86_400 * 1_000_000);
        abs %= 86_400 * 1_000_000;
        let hours = abs / (3_600 * 1_000_000);
        abs %= 3_600 * 1_000_000;
        let mins = abs / (60 * 1_000_000);
        abs %= 60 * 1_000_000;
        let secs = abs as f64 / 1_000_000.0;

        let mut out = String::from(if negative { "-P" } else { "P" });
        if days > 0 {
            out.push_str(&format!("{days}D"));
        }
        if hours > 0 || mins > 0 || secs > 0.0 {
            out.push('T');
            if hours > 0 {
                out.push_str(&format!("{hours}H"));
            }
            if mins > 0 {
                out.push_str(&format!("{mins}M"));
            }
            if secs > 0.0 {
                if secs.fract() == 0.0 {
                    out.push_str(&format!("{}S", secs as u64));
                } else {
                    out.push_str(&format!("{secs}S"));
                }
            }
        }
        out
    }

    /// Total signed microseconds.
    pub fn micros(&self) -> i64 {
        self.micros
    }

    /// Original lexical form.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Negated duration (canonical lexical form).
    pub fn negated(&self) -> Self {
        Self::from_micros(-self.micros)
    }
}

impl PartialEq for DayTimeDuration {
    fn eq(&self, other: &Self) -> bool {
        self.micros == other.micros
    }
}

impl Eq for DayTimeDuration {}

impl Ord for DayTimeDuration {
    fn cmp(&self, other: &Self) -> Ordering {
        self.micros.cmp(&other.micros)
    }
}

impl PartialOrd for DayTimeDuration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for DayTimeDuration {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.micros.hash(state);
    }
}

impl fmt::Display for DayTimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_instant_equality() {
        let a = DateTime::parse("2024-01-01T05:00:00Z").unwrap();
        let b = DateTime::parse("2024-01-01T00:00:00-05:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.original(), "2024-01-01T05:00:00Z");
        assert_eq!(b.original(), "2024-01-01T00:00:00-05:00");
    }

    #[test]
    fn test_datetime_no_tz_is_utc() {
        let a = DateTime::parse("2024-01-15T10:30:00").unwrap();
        let b = DateTime::parse("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(a, b);
        assert!(a.tz_offset().is_none());
    }

    #[test]
    fn test_datetime_fractional_seconds_order() {
        let a = DateTime::parse("2024-01-15T10:30:00.123Z").unwrap();
        let b = DateTime::parse("2024-01-15T10:30:00.5Z").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_datetime_add_day_time_duration() {
        let dt = DateTime::parse("2024-01-15T23:30:00Z").unwrap();
        let d = DayTimeDuration::parse("PT45M").unwrap();
        let sum = dt.add_day_time_duration(&d).unwrap();
        assert_eq!(sum, DateTime::parse("2024-01-16T00:15:00Z").unwrap());
    }

    #[test]
    fn test_datetime_add_year_month_duration_clamps() {
        let dt = DateTime::parse("2024-01-31T12:00:00Z").unwrap();
        let d = YearMonthDuration::parse("P1M").unwrap();
        let sum = dt.add_year_month_duration(&d).unwrap();
        // Feb 31 does not exist; chrono clamps to month end
        assert_eq!(sum, DateTime::parse("2024-02-29T12:00:00Z").unwrap());
    }

    #[test]
    fn test_date_parse_and_compare() {
        let a = Date::parse("2024-03-01").unwrap();
        let b = Date::parse("2024-03-02").unwrap();
        assert!(a < b);
        assert_eq!(a, Date::parse("2024-03-01Z").unwrap());
    }

    #[test]
    fn test_date_tz_shifts_instant() {
        // Midnight in +05:00 starts earlier than midnight UTC of the same day? No:
        // 2024-03-01+05:00 starts at 2024-02-29T19:00Z, before 2024-03-01Z.
        let east = Date::parse("2024-03-01+05:00").unwrap();
        let utc = Date::parse("2024-03-01Z").unwrap();
        assert!(east < utc);
    }

    #[test]
    fn test_date_add_year_month_duration() {
        let d = Date::parse("2024-11-30").unwrap();
        let dur = YearMonthDuration::parse("P3M").unwrap();
        assert_eq!(
            d.add_year_month_duration(&dur).unwrap(),
            Date::parse("2025-02-28").unwrap()
        );
        let back = YearMonthDuration::parse("-P3M").unwrap();
        assert_eq!(
            d.add_year_month_duration(&back).unwrap(),
            Date::parse("2024-08-30").unwrap()
        );
    }

    #[test]
    fn test_time_tz_normalization() {
        let a = Time::parse("23:00:00-02:00").unwrap();
        let b = Time::parse("01:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_time_in_range_wrapping() {
        let lower = Time::parse("22:00:00Z").unwrap();
        let upper = Time::parse("06:00:00Z").unwrap();
        assert!(Time::parse("23:30:00Z").unwrap().in_range(&lower, &upper));
        assert!(Time::parse("05:00:00Z").unwrap().in_range(&lower, &upper));
        assert!(!Time::parse("12:00:00Z").unwrap().in_range(&lower, &upper));
    }

    #[test]
    fn test_year_month_duration_parse() {
        assert_eq!(YearMonthDuration::parse("P1Y2M").unwrap().months(), 14);
        assert_eq!(YearMonthDuration::parse("-P1Y").unwrap().months(), -12);
        assert_eq!(YearMonthDuration::parse("P14M").unwrap().months(), 14);
        assert!(YearMonthDuration::parse("P1D").is_err());
        assert!(YearMonthDuration::parse("PT1H").is_err());
        assert!(YearMonthDuration::parse("P").is_err());
    }

    #[test]
    fn test_year_month_duration_canonical() {
        assert_eq!(YearMonthDuration::from_months(14).original(), "P1Y2M");
        assert_eq!(YearMonthDuration::from_months(-12).original(), "-P1Y");
        assert_eq!(YearMonthDuration::from_months(0).original(), "P0M");
    }

    #[test]
    fn test_day_time_duration_parse() {
        assert_eq!(
            DayTimeDuration::parse("P1DT2H3M4S").unwrap().micros(),
            ((86_400 + 2 * 3_600 + 3 * 60 + 4) as i64) * 1_000_000
        );
        assert_eq!(
            DayTimeDuration::parse("PT0.5S").unwrap().micros(),
            500_000
        );
        assert_eq!(
            DayTimeDuration::parse("-PT1M").unwrap().micros(),
            -60_000_000
        );
        assert!(DayTimeDuration::parse("P1Y").is_err());
        assert!(DayTimeDuration::parse("P1M").is_err());
        assert!(DayTimeDuration::parse("P").is_err());
    }

    #[test]
    fn test_day_time_duration_canonical() {
        assert_eq!(DayTimeDuration::from_micros(0).original(), "PT0S");
        assert_eq!(
            DayTimeDuration::parse("PT26H").unwrap(),
            DayTimeDuration::parse("P1DT2H").unwrap()
        );
        assert_eq!(
            DayTimeDuration::from_micros(93_784_000_000).original(),
            "P1DT2H3M4S"
        );
    }
}
