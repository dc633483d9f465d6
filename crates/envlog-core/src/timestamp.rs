//! Timestamp parsing.
//!
//! Readings carry free-form timestamp strings from device clocks and from
//! the ingest boundary. [`parse_timestamp`] accepts the encodings seen in
//! practice and reports anything else as `None` so callers can skip the
//! record instead of failing a whole scan.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// The canonical device encoding: `YYYY-MM-DD HH:MM:SS`.
const SPACE_PATTERN: &str = "%Y-%m-%d %H:%M:%S";
const SPACE_PATTERN_LEN: usize = 19;

const OFFSET_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

const NAIVE_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A successfully parsed timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    /// No offset was given; the value is interpreted as UTC.
    Naive(NaiveDateTime),
    /// An explicit numeric offset was given and is honored.
    Offset(DateTime<FixedOffset>),
}

impl ParsedTimestamp {
    /// The absolute instant this timestamp denotes.
    pub fn to_utc(self) -> DateTime<Utc> {
        match self {
            ParsedTimestamp::Naive(naive) => naive.and_utc(),
            ParsedTimestamp::Offset(dt) => dt.with_timezone(&Utc),
        }
    }

    /// Whether the source carried an explicit offset.
    pub fn has_offset(&self) -> bool {
        matches!(self, ParsedTimestamp::Offset(_))
    }
}

/// Parse a raw timestamp string.
///
/// Encodings are tried in order and the first match wins:
///
/// 1. `YYYY-MM-DD HH:MM:SS` exactly, as a naive time.
/// 2. Extended ISO 8601: `T` or space separator, optional fractional
///    seconds, minutes-only or date-only forms. A trailing `Z` is stripped
///    and the value stays naive; a numeric offset such as `-03:00` is kept.
///
/// Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use envlog_core::timestamp::parse_timestamp;
///
/// let a = parse_timestamp("2026-01-28 13:00:00").unwrap();
/// let b = parse_timestamp("2026-01-28T13:00:00.000Z").unwrap();
/// let c = parse_timestamp("2026-01-28T10:00:00-03:00").unwrap();
///
/// assert_eq!(a.to_utc(), b.to_utc());
/// assert_eq!(a.to_utc(), c.to_utc());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<ParsedTimestamp> {
    let s = raw.trim();

    if s.len() == SPACE_PATTERN_LEN
        && s.as_bytes().get(10) == Some(&b' ')
        && let Ok(naive) = NaiveDateTime::parse_from_str(s, SPACE_PATTERN)
    {
        return Some(ParsedTimestamp::Naive(naive));
    }

    parse_extended(s)
}

fn parse_extended(s: &str) -> Option<ParsedTimestamp> {
    let s = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = OFFSET_PATTERNS
        .iter()
        .find_map(|pattern| DateTime::parse_from_str(s, pattern).ok())
    {
        return Some(ParsedTimestamp::Offset(dt));
    }

    if let Some(naive) = NAIVE_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(s, pattern).ok())
    {
        return Some(ParsedTimestamp::Naive(naive));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedTimestamp::Naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn utc(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap().to_utc()
    }

    #[test]
    fn test_space_pattern_is_naive() {
        let parsed = parse_timestamp("2026-01-28 13:00:00").unwrap();
        assert!(!parsed.has_offset());
        assert_eq!(
            parsed.to_utc(),
            Utc.with_ymd_and_hms(2026, 1, 28, 13, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(utc("  2026-01-28 13:00:00\n"), utc("2026-01-28 13:00:00"));
    }

    #[test]
    fn test_extended_forms() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 28, 13, 0, 0).unwrap();
        assert_eq!(utc("2026-01-28T13:00:00"), expected);
        assert_eq!(utc("2026-01-28T13:00:00Z"), expected);
        assert_eq!(utc("2026-01-28T13:00:00.000000"), expected);
        assert_eq!(utc("2026-01-28T13:00"), expected);
        assert_eq!(utc("2026-01-28 13:00"), expected);
        assert_eq!(utc("2026-01-28T13:00:00+00:00"), expected);
    }

    #[test]
    fn test_trailing_z_stays_naive() {
        let parsed = parse_timestamp("2026-01-28T13:00:00Z").unwrap();
        assert!(!parsed.has_offset());
    }

    #[test]
    fn test_fractional_seconds_kept() {
        let parsed = utc("2026-01-28T13:00:00.250");
        assert_eq!(parsed.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_offset_is_honored() {
        let parsed = parse_timestamp("2026-01-28T10:00:00-03:00").unwrap();
        assert!(parsed.has_offset());
        assert_eq!(
            parsed.to_utc(),
            Utc.with_ymd_and_hms(2026, 1, 28, 13, 0, 0).unwrap()
        );
        assert_eq!(utc("2026-01-28T15:30:00+0230"), utc("2026-01-28 13:00:00"));
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(utc("2026-01-28"), utc("2026-01-28 00:00:00"));
    }

    #[test]
    fn test_unparseable_inputs() {
        for raw in [
            "",
            "   ",
            "Z",
            "not a time",
            "28/01/2026 13:00",
            "2026-13-01 00:00:00",
            "2026-01-28 25:00:00",
            "1769605200",
        ] {
            assert!(parse_timestamp(raw).is_none(), "{raw:?} should not parse");
        }
    }
}
