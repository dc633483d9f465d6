//! Shared types for envlog environmental readings.
//!
//! A [`Reading`] is what an ingest client posts and what every store
//! backend persists: a zone tag, two optional measurements and up to two
//! timestamp strings. Measurements are kept exactly as they arrived on the
//! wire and are only coerced to numbers when a view reads them, so a stored
//! record always round-trips unchanged.
//!
//! # Example
//!
//! ```
//! use envlog_types::{Reading, DEFAULT_ZONE};
//!
//! let reading: Reading = serde_json::from_str(
//!     r#"{"temperature": "24.5", "humidity": 60, "timestamp": "2026-01-28 13:00:00"}"#,
//! ).unwrap();
//!
//! assert_eq!(reading.zone(), DEFAULT_ZONE);
//! assert_eq!(reading.temperature_value(), Some(24.5));
//! assert_eq!(reading.humidity_value(), Some(60.0));
//! assert_eq!(reading.effective_timestamp(), Some("2026-01-28 13:00:00"));
//! ```

pub mod types;

pub use types::{DEFAULT_ZONE, Reading, coerce_measurement};
