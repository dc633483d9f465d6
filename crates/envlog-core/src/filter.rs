//! Prefix-based history filtering.
//!
//! Filters are matched against the raw stored timestamp text, not a parsed
//! instant: `month` and `date` are string prefixes and `hour` is compared
//! with characters 11..16 (the `HH:MM` of an ISO-shaped string). This only
//! gives calendar-correct answers while every stored timestamp uses the
//! same encoding, e.g. `YYYY-MM-DD HH:MM:SS`. Callers depend on that exact
//! behavior, so it is kept as is and confined to [`HistoryFilter`].

use serde::Serialize;
use tracing::debug;

use envlog_types::Reading;

use crate::timestamp::parse_timestamp;

/// Default number of rows returned by a filter query.
pub const DEFAULT_FILTER_COUNT: usize = 200;

/// Default number of most recent stored readings scanned for a filter query.
pub const DEFAULT_FILTER_SCAN_LIMIT: usize = 20_000;

/// Slice `s` by character positions, clamping to its length.
fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let byte_at = |n: usize| s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    let (start, end) = (byte_at(start), byte_at(end));
    if start >= end { "" } else { &s[start..end] }
}

/// The `YYYY-MM-DD` part of a raw timestamp.
pub fn raw_date(raw: &str) -> &str {
    char_slice(raw, 0, 10)
}

/// The `HH:MM` part of a raw timestamp.
pub fn raw_hour(raw: &str) -> &str {
    char_slice(raw, 11, 16)
}

/// A reading projected for tabular display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredRow {
    /// Date sliced from the raw timestamp.
    pub date: String,
    /// Hour sliced from the raw timestamp.
    pub hour: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub zone: String,
    /// The raw timestamp the row was derived from.
    pub timestamp: String,
}

impl FilteredRow {
    /// Project a reading. A reading without any timestamp yields empty
    /// date, hour and timestamp fields.
    pub fn from_reading(reading: &Reading) -> Self {
        let raw = reading.effective_timestamp().unwrap_or_default();
        Self {
            date: raw_date(raw).to_string(),
            hour: raw_hour(raw).to_string(),
            temperature: reading.temperature_value(),
            humidity: reading.humidity_value(),
            zone: reading.zone().to_string(),
            timestamp: raw.to_string(),
        }
    }
}

/// Month/date/hour filter over a zone's readings.
///
/// # Example
///
/// ```
/// use envlog_core::filter::HistoryFilter;
/// use envlog_types::Reading;
///
/// let readings = vec![
///     Reading::new("Z1").with_temperature(20.0).with_timestamp("2025-12-31 23:00:00"),
///     Reading::new("Z1").with_temperature(21.0).with_timestamp("2026-01-01 08:00:00"),
///     Reading::new("Z1").with_temperature(22.0).with_timestamp("2026-01-02 08:00:00"),
/// ];
///
/// let rows = HistoryFilter::new("Z1").month("2026-01").hour("08:00").apply(&readings);
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].date, "2026-01-01");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    zone: String,
    month: Option<String>,
    date: Option<String>,
    hour: Option<String>,
    count: usize,
}

impl HistoryFilter {
    /// Match every reading of `zone`, up to [`DEFAULT_FILTER_COUNT`] rows.
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            month: None,
            date: None,
            hour: None,
            count: DEFAULT_FILTER_COUNT,
        }
    }

    /// Require the raw timestamp to start with `month` (`YYYY-MM`).
    ///
    /// Blank values are ignored.
    pub fn month(mut self, month: impl Into<String>) -> Self {
        self.month = non_blank(month.into());
        self
    }

    /// Require the raw timestamp to start with `date` (`YYYY-MM-DD`).
    ///
    /// Blank values are ignored.
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = non_blank(date.into());
        self
    }

    /// Require characters 11..16 of the raw timestamp to equal `hour` (`HH:MM`).
    ///
    /// Blank values are ignored.
    pub fn hour(mut self, hour: impl Into<String>) -> Self {
        self.hour = non_blank(hour.into());
        self
    }

    /// Keep at most `count` rows, the most recent ones.
    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Whether a raw timestamp passes the month/date/hour constraints.
    pub fn matches_raw(&self, raw: &str) -> bool {
        self.month.as_deref().is_none_or(|m| raw.starts_with(m))
            && self.date.as_deref().is_none_or(|d| raw.starts_with(d))
            && self.hour.as_deref().is_none_or(|h| raw_hour(raw) == h)
    }

    /// Whether a reading belongs to the zone, has a parseable timestamp and
    /// passes the text constraints.
    pub fn matches(&self, reading: &Reading) -> bool {
        if !reading.in_zone(&self.zone) {
            return false;
        }
        match reading.effective_timestamp() {
            Some(raw) => parse_timestamp(raw).is_some() && self.matches_raw(raw),
            None => false,
        }
    }

    /// Apply the filter to readings in append order.
    ///
    /// Rows come back oldest first. When more than `count` readings match,
    /// only the last `count` are kept.
    pub fn apply<'a, I>(&self, readings: I) -> Vec<FilteredRow>
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let mut rows: Vec<FilteredRow> = readings
            .into_iter()
            .filter(|r| self.matches(r))
            .map(FilteredRow::from_reading)
            .collect();

        let matched = rows.len();
        if matched > self.count {
            rows.drain(..matched - self.count);
        }

        debug!(
            "History filter for zone {}: {} matched, {} returned",
            self.zone,
            matched,
            rows.len()
        );
        rows
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
