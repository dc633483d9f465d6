//! Core reading type.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Zone assigned to readings that arrive without one.
pub const DEFAULT_ZONE: &str = "Z1";

/// A single environmental reading as posted by an ingest client.
///
/// Field names follow the wire format: the device clock is sent as
/// `timestamp` and the ingest boundary stamps `ts_server`. Unknown keys are
/// kept in [`Reading::extra`] so stored records equal what was posted.
///
/// # Missing vs. zero
///
/// `temperature` and `humidity` hold the raw JSON value. Use
/// [`Reading::temperature_value`] and [`Reading::humidity_value`] to read
/// them as numbers; anything that is not a finite number (or a string that
/// parses as one) reads as `None`, never as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor group identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Temperature in Celsius, as sent. An explicit `null` is kept as
    /// `Some(Value::Null)`; only an absent key is `None`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<Value>,
    /// Relative humidity percentage, as sent.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub humidity: Option<Value>,
    /// Device-reported local or naive time.
    #[serde(
        rename = "timestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub device_timestamp: Option<String>,
    /// Time the ingest boundary accepted the reading.
    #[serde(rename = "ts_server", default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<String>,
    /// Any other keys the client sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reading {
    /// Create an empty reading tagged with `zone`.
    pub fn new(zone: impl Into<String>) -> Self {
        Self {
            zone: Some(zone.into()),
            ..Default::default()
        }
    }

    /// Set the temperature to a numeric value.
    #[must_use]
    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(Value::from(value));
        self
    }

    /// Set the humidity to a numeric value.
    #[must_use]
    pub fn with_humidity(mut self, value: f64) -> Self {
        self.humidity = Some(Value::from(value));
        self
    }

    /// Set the device timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.device_timestamp = Some(timestamp.into());
        self
    }

    /// Set the server timestamp.
    #[must_use]
    pub fn with_server_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.server_timestamp = Some(timestamp.into());
        self
    }

    /// The zone this reading belongs to, falling back to [`DEFAULT_ZONE`].
    pub fn zone(&self) -> &str {
        match self.zone.as_deref() {
            Some(zone) if !zone.is_empty() => zone,
            _ => DEFAULT_ZONE,
        }
    }

    /// Whether this reading belongs to `zone`.
    pub fn in_zone(&self, zone: &str) -> bool {
        self.zone() == zone
    }

    /// Temperature as a number, if present and numeric.
    pub fn temperature_value(&self) -> Option<f64> {
        self.temperature.as_ref().and_then(coerce_measurement)
    }

    /// Humidity as a number, if present and numeric.
    pub fn humidity_value(&self) -> Option<f64> {
        self.humidity.as_ref().and_then(coerce_measurement)
    }

    /// The timestamp string views should use.
    ///
    /// This is the device timestamp when present and non-blank, otherwise the
    /// server timestamp.
    pub fn effective_timestamp(&self) -> Option<&str> {
        non_blank(self.device_timestamp.as_deref())
            .or_else(|| non_blank(self.server_timestamp.as_deref()))
    }

    /// Whether the device timestamp is missing or blank.
    pub fn lacks_device_timestamp(&self) -> bool {
        non_blank(self.device_timestamp.as_deref()).is_none()
    }
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Coerce a raw JSON measurement to a finite number.
///
/// Numbers and numeric strings are accepted. Everything else, including
/// `NaN` and infinities spelled as strings, is treated as missing.
///
/// # Examples
///
/// ```
/// use envlog_types::coerce_measurement;
/// use serde_json::json;
///
/// assert_eq!(coerce_measurement(&json!(21.5)), Some(21.5));
/// assert_eq!(coerce_measurement(&json!(" 60 ")), Some(60.0));
/// assert_eq!(coerce_measurement(&json!("n/a")), None);
/// assert_eq!(coerce_measurement(&json!(null)), None);
/// ```
pub fn coerce_measurement(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_zone_when_absent() {
        let reading: Reading = serde_json::from_str(r#"{"temperature": 20}"#).unwrap();
        assert_eq!(reading.zone, None);
        assert_eq!(reading.zone(), DEFAULT_ZONE);
        assert!(reading.in_zone(DEFAULT_ZONE));
    }

    #[test]
    fn test_empty_zone_falls_back() {
        let reading = Reading::new("");
        assert_eq!(reading.zone(), DEFAULT_ZONE);
    }

    #[test]
    fn test_wire_field_names() {
        let reading = Reading::new("Z2")
            .with_temperature(24.5)
            .with_humidity(60.0)
            .with_timestamp("2026-01-28 13:00:00")
            .with_server_timestamp("2026-01-28T13:00:01.000000");

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["zone"], "Z2");
        assert_eq!(json["temperature"], 24.5);
        assert_eq!(json["humidity"], 60.0);
        assert_eq!(json["timestamp"], "2026-01-28 13:00:00");
        assert_eq!(json["ts_server"], "2026-01-28T13:00:01.000000");
    }

    #[test]
    fn test_unknown_keys_round_trip() {
        let input = json!({
            "zone": "Z1",
            "temperature": "22.1",
            "humidity": 55,
            "timestamp": "2026-01-28 13:00:00",
            "battery": 87,
            "firmware": "1.2.0"
        });

        let reading: Reading = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(reading.extra.get("battery"), Some(&json!(87)));

        let output = serde_json::to_value(&reading).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_measurement_coercion() {
        assert_eq!(coerce_measurement(&json!(21)), Some(21.0));
        assert_eq!(coerce_measurement(&json!("21.25")), Some(21.25));
        assert_eq!(coerce_measurement(&json!("")), None);
        assert_eq!(coerce_measurement(&json!("warm")), None);
        assert_eq!(coerce_measurement(&json!("NaN")), None);
        assert_eq!(coerce_measurement(&json!("inf")), None);
        assert_eq!(coerce_measurement(&json!(true)), None);
        assert_eq!(coerce_measurement(&json!([1.0])), None);
    }

    #[test]
    fn test_missing_measurement_is_not_zero() {
        let reading: Reading =
            serde_json::from_str(r#"{"temperature": "error", "humidity": null}"#).unwrap();
        assert_eq!(reading.temperature_value(), None);
        assert_eq!(reading.humidity_value(), None);
    }

    #[test]
    fn test_null_measurement_round_trips() {
        let input = json!({"zone": "Z1", "temperature": 21.0, "humidity": null});

        let reading: Reading = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(reading.humidity, Some(Value::Null));
        assert_eq!(reading.humidity_value(), None);
        assert_eq!(serde_json::to_value(&reading).unwrap(), input);

        let reading: Reading = serde_json::from_value(json!({"zone": "Z1"})).unwrap();
        assert_eq!(reading.humidity, None);
    }

    #[test]
    fn test_effective_timestamp_prefers_device() {
        let reading = Reading::new("Z1")
            .with_timestamp("2026-01-28 13:00:00")
            .with_server_timestamp("2026-01-28T16:00:00");
        assert_eq!(reading.effective_timestamp(), Some("2026-01-28 13:00:00"));
        assert!(!reading.lacks_device_timestamp());
    }

    #[test]
    fn test_effective_timestamp_falls_back_to_server() {
        let reading = Reading::new("Z1")
            .with_timestamp("   ")
            .with_server_timestamp("2026-01-28T16:00:00");
        assert_eq!(reading.effective_timestamp(), Some("2026-01-28T16:00:00"));
        assert!(reading.lacks_device_timestamp());

        let reading = Reading::new("Z1");
        assert_eq!(reading.effective_timestamp(), None);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any finite number survives coercion, whether sent as a number or a string.
        #[test]
        fn finite_numbers_coerce(value in -1.0e6f64..1.0e6) {
            prop_assert_eq!(coerce_measurement(&Value::from(value)), Some(value));
            prop_assert_eq!(coerce_measurement(&Value::from(value.to_string())), Some(value));
        }

        /// Coercing arbitrary strings never panics.
        #[test]
        fn coercion_never_panics(s in ".*") {
            let _ = coerce_measurement(&Value::from(s));
        }
    }
}
