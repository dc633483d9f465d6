//! Five-day summary grid.
//!
//! The grid has one column per local calendar date (the five days ending
//! today, oldest first) and one row per 2-hour slot. Each cell holds the
//! latest reading for that (date, slot) that has both measurements.
//!
//! # Slot convention
//!
//! A local hour `h` belongs to slot `floor(h / 2) * 2`, labelled `HH:00`.
//! Floor `0` is labelled `"24:00"`, and readings taken between 00:00 and
//! 01:59 stay on their own calendar date: they fill the *last* row of the
//! day they were taken on, not the previous day's.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tracing::debug;

use envlog_types::Reading;

use crate::tz::{NormalizedInstant, ZoneResolver};

/// Number of calendar dates in the grid.
pub const GRID_DAYS: usize = 5;

/// Slot labels in display order.
pub const SLOT_LABELS: [&str; 12] = [
    "02:00", "04:00", "06:00", "08:00", "10:00", "12:00", "14:00", "16:00", "18:00", "20:00",
    "22:00", "24:00",
];

/// Default number of most recent stored readings scanned for the grid.
pub const DEFAULT_GRID_SCAN_LIMIT: usize = 8000;

/// Row index of the slot for a local hour.
fn slot_index(hour: u32) -> usize {
    match (hour % 24) / 2 {
        0 => SLOT_LABELS.len() - 1,
        n => n as usize - 1,
    }
}

/// Slot label for a local hour.
///
/// ```
/// use envlog_core::grid::slot_label;
///
/// assert_eq!(slot_label(13), "12:00");
/// assert_eq!(slot_label(14), "14:00");
/// assert_eq!(slot_label(0), "24:00");
/// assert_eq!(slot_label(1), "24:00");
/// ```
pub fn slot_label(hour: u32) -> &'static str {
    SLOT_LABELS[slot_index(hour)]
}

/// One filled grid cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    /// Temperature.
    pub t: f64,
    /// Humidity.
    pub h: f64,
    /// Resolved local instant, RFC 3339.
    pub ts: String,
    #[serde(skip)]
    instant: DateTime<Utc>,
}

impl GridCell {
    fn new(t: f64, h: f64, normalized: &NormalizedInstant) -> Self {
        Self {
            t,
            h,
            ts: normalized
                .local
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            instant: normalized.instant,
        }
    }

    /// The absolute instant of the reading in this cell.
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

/// The 5-date × 12-slot summary for one zone.
///
/// `cells` maps every slot label to exactly [`GRID_DAYS`] entries, one per
/// date in `dates`; empty cells serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketGrid {
    pub zone: String,
    /// Dates as `YYYY-MM-DD`, oldest first.
    pub dates: Vec<String>,
    /// Short display labels (`DD/MM`) matching `dates`.
    pub date_labels: Vec<String>,
    pub slots: Vec<String>,
    pub cells: BTreeMap<String, Vec<Option<GridCell>>>,
}

impl BucketGrid {
    /// Look up a cell by date (`YYYY-MM-DD`) and slot label.
    pub fn cell(&self, date: &str, slot: &str) -> Option<&GridCell> {
        let column = self.dates.iter().position(|d| d == date)?;
        self.cells.get(slot)?.get(column)?.as_ref()
    }

    /// Number of filled cells.
    pub fn filled(&self) -> usize {
        self.cells
            .values()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_some())
            .count()
    }
}

/// Builds [`BucketGrid`]s from a reading stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridBuilder {
    resolver: ZoneResolver,
}

impl GridBuilder {
    /// Create a builder that buckets in the resolver's zone.
    pub fn new(resolver: ZoneResolver) -> Self {
        Self { resolver }
    }

    /// The five local dates ending at today, oldest first.
    pub fn window(&self, now: DateTime<Utc>) -> [NaiveDate; GRID_DAYS] {
        let today = self.resolver.today(now);
        std::array::from_fn(|i| today - Days::new((GRID_DAYS - 1 - i) as u64))
    }

    /// Build the grid for `zone` as of `now`.
    ///
    /// Readings are expected in append order: when two eligible readings
    /// resolve to the same instant in the same cell, the later one wins.
    pub fn build<'a, I>(&self, readings: I, zone: &str, now: DateTime<Utc>) -> BucketGrid
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        let dates = self.window(now);
        let mut cells: [[Option<GridCell>; GRID_DAYS]; SLOT_LABELS.len()] = Default::default();

        let mut scanned = 0usize;
        let mut placed = 0usize;

        for reading in readings.into_iter().filter(|r| r.in_zone(zone)) {
            scanned += 1;

            // A reading missing either measurement can never win a cell
            let (Some(t), Some(h)) = (reading.temperature_value(), reading.humidity_value())
            else {
                continue;
            };
            let Some(normalized) = self.resolver.normalize_reading(reading) else {
                continue;
            };
            let Some(column) = dates.iter().position(|d| *d == normalized.date()) else {
                continue;
            };

            let cell = &mut cells[slot_index(normalized.hour())][column];
            if cell
                .as_ref()
                .is_none_or(|current| normalized.instant >= current.instant)
            {
                *cell = Some(GridCell::new(t, h, &normalized));
                placed += 1;
            }
        }

        debug!(
            "Grid for zone {}: {} readings scanned, {} cell updates",
            zone, scanned, placed
        );

        BucketGrid {
            zone: zone.to_string(),
            dates: dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
            date_labels: dates.iter().map(|d| d.format("%d/%m").to_string()).collect(),
            slots: SLOT_LABELS.iter().map(|s| s.to_string()).collect(),
            cells: SLOT_LABELS
                .iter()
                .zip(cells)
                .map(|(slot, row)| (slot.to_string(), row.into_iter().collect()))
                .collect(),
        }
    }
}
