//! Time normalization and aggregation for envlog readings.
//!
//! This crate turns a stream of stored [`Reading`](envlog_types::Reading)s
//! into the views the service exposes:
//!
//! - [`timestamp`]: parse the timestamp encodings devices actually send.
//! - [`tz`]: resolve parsed timestamps against a configured IANA zone, and
//!   the [`Clock`] seam used for "today".
//! - [`grid`]: the five-day by 2-hour-slot summary grid.
//! - [`filter`]: month/date/hour filtered history rows.
//! - [`export`]: CSV and XLSX downloads.
//!
//! Nothing here touches storage; callers pass readings in append order.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use envlog_core::{GridBuilder, ZoneResolver};
//! use envlog_types::Reading;
//!
//! let readings = vec![
//!     Reading::new("Z1")
//!         .with_temperature(22.0)
//!         .with_humidity(55.0)
//!         .with_timestamp("2026-01-28 13:00:00"),
//! ];
//!
//! let now = Utc.with_ymd_and_hms(2026, 1, 30, 12, 0, 0).unwrap();
//! let grid = GridBuilder::new(ZoneResolver::utc()).build(&readings, "Z1", now);
//!
//! let cell = grid.cell("2026-01-28", "12:00").unwrap();
//! assert_eq!(cell.t, 22.0);
//! ```

pub mod error;
pub mod export;
pub mod filter;
pub mod grid;
pub mod timestamp;
pub mod tz;

pub use error::{ExportError, Result};
pub use export::{ExportFormat, ExportRow, export_filename, export_rows, render};
pub use filter::{DEFAULT_FILTER_COUNT, DEFAULT_FILTER_SCAN_LIMIT, FilteredRow, HistoryFilter};
pub use grid::{BucketGrid, DEFAULT_GRID_SCAN_LIMIT, GridBuilder, GridCell};
pub use timestamp::{ParsedTimestamp, parse_timestamp};
pub use tz::{Clock, FixedClock, NormalizedInstant, SystemClock, ZoneResolver};
