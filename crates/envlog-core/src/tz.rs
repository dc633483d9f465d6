//! Local time zone resolution and clocks.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use envlog_types::Reading;

use crate::timestamp::{ParsedTimestamp, parse_timestamp};

/// Source of the current time.
///
/// Views that depend on "today" take a clock instead of reading the system
/// time directly, so tests can pin the date.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A reading timestamp resolved to an absolute instant and local wall time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedInstant {
    /// The absolute instant.
    pub instant: DateTime<Utc>,
    /// The same instant in the configured zone.
    pub local: DateTime<Tz>,
}

impl NormalizedInstant {
    /// Local calendar date.
    pub fn date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    /// Local hour of day (0-23).
    pub fn hour(&self) -> u32 {
        self.local.hour()
    }
}

/// Resolves the configured IANA zone that readings are bucketed against.
///
/// Construction never fails: an unknown or empty identifier falls back to
/// UTC with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneResolver {
    tz: Tz,
}

impl ZoneResolver {
    /// Resolve `name` (e.g. `"America/Santiago"`), falling back to UTC.
    pub fn new(name: &str) -> Self {
        let name = name.trim();
        match name.parse::<Tz>() {
            Ok(tz) => {
                info!("Bucketing readings in time zone {}", tz.name());
                Self { tz }
            }
            Err(_) => {
                warn!("Unknown time zone {:?}, falling back to UTC", name);
                Self::utc()
            }
        }
    }

    /// Resolver for UTC.
    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// The resolved zone.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// IANA name of the resolved zone.
    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Convert an instant to local time.
    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// The local calendar date at `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.to_local(now).date_naive()
    }

    /// Resolve a parsed timestamp. Naive values are taken as UTC.
    pub fn normalize(&self, parsed: ParsedTimestamp) -> NormalizedInstant {
        let instant = parsed.to_utc();
        NormalizedInstant {
            instant,
            local: self.to_local(instant),
        }
    }

    /// Parse and resolve a reading's effective timestamp.
    ///
    /// Returns `None` when the reading has no timestamp or it cannot be
    /// parsed; such readings are left out of time-based views.
    pub fn normalize_reading(&self, reading: &Reading) -> Option<NormalizedInstant> {
        let raw = reading.effective_timestamp()?;
        parse_timestamp(raw).map(|parsed| self.normalize(parsed))
    }
}

impl Default for ZoneResolver {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_known_zone() {
        let resolver = ZoneResolver::new("America/Santiago");
        assert_eq!(resolver.name(), "America/Santiago");
    }

    #[test]
    fn test_invalid_zone_falls_back_to_utc() {
        assert_eq!(ZoneResolver::new("Mars/Olympus_Mons").tz(), Tz::UTC);
        assert_eq!(ZoneResolver::new("").tz(), Tz::UTC);
        assert_eq!(ZoneResolver::default().name(), "UTC");
    }

    #[test]
    fn test_today_uses_configured_zone() {
        // 02:00 UTC on the 29th is still the 28th in Santiago (UTC-3 in January)
        let now = Utc.with_ymd_and_hms(2026, 1, 29, 2, 0, 0).unwrap();

        let santiago = ZoneResolver::new("America/Santiago");
        assert_eq!(
            santiago.today(now),
            NaiveDate::from_ymd_opt(2026, 1, 28).unwrap()
        );
        assert_eq!(
            ZoneResolver::utc().today(now),
            NaiveDate::from_ymd_opt(2026, 1, 29).unwrap()
        );
    }

    #[test]
    fn test_normalize_naive_as_utc() {
        let resolver = ZoneResolver::new("Asia/Tokyo");
        let reading = Reading::new("Z1").with_timestamp("2026-01-28 20:00:00");

        let normalized = resolver.normalize_reading(&reading).unwrap();
        assert_eq!(
            normalized.instant,
            Utc.with_ymd_and_hms(2026, 1, 28, 20, 0, 0).unwrap()
        );
        assert_eq!(normalized.date(), NaiveDate::from_ymd_opt(2026, 1, 29).unwrap());
        assert_eq!(normalized.hour(), 5);
    }

    #[test]
    fn test_normalize_with_offset() {
        let resolver = ZoneResolver::utc();
        let reading = Reading::new("Z1").with_timestamp("2026-01-28T23:30:00-03:00");

        let normalized = resolver.normalize_reading(&reading).unwrap();
        assert_eq!(normalized.date(), NaiveDate::from_ymd_opt(2026, 1, 29).unwrap());
        assert_eq!(normalized.hour(), 2);
    }

    #[test]
    fn test_normalize_falls_back_to_server_timestamp() {
        let resolver = ZoneResolver::utc();
        let reading = Reading::new("Z1").with_server_timestamp("2026-01-28T08:15:00.123456");

        let normalized = resolver.normalize_reading(&reading).unwrap();
        assert_eq!(normalized.hour(), 8);
    }

    #[test]
    fn test_normalize_unparseable() {
        let resolver = ZoneResolver::utc();
        assert!(resolver.normalize_reading(&Reading::new("Z1")).is_none());
        assert!(
            resolver
                .normalize_reading(&Reading::new("Z1").with_timestamp("garbage"))
                .is_none()
        );
    }

    #[test]
    fn test_fixed_clock() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 28, 0, 0, 0).unwrap();
        let clock = FixedClock(instant);
        assert_eq!(clock.now(), instant);
    }
}
