//! ==============================================================================
//! domain.rs - wire and display types shared by every component
//! ==============================================================================
//!
//! purpose:
//!     defines the sensor keys and the point shapes that travel between the
//!     backend (REST history + websocket deltas) and the dashboard state.
//!
//! relationships:
//!     - produced by: history.rs (json arrays), state.rs (websocket frames)
//!     - consumed by: normalize.rs (RawPoint -> DisplayPoint)
//!     - stored by: buffer.rs (DisplayPoint)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// the five sensors exposed by the backend
///
/// the serde names are the backend's resource names, used both as REST path
/// segments and as keys in websocket delta frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorKey {
    #[serde(rename = "temperatura")]
    Temperature,
    #[serde(rename = "humedad")]
    Humidity,
    #[serde(rename = "presion")]
    Pressure,
    #[serde(rename = "luz")]
    Light,
    #[serde(rename = "gas")]
    Gas,
}

impl SensorKey {
    pub const ALL: [SensorKey; 5] = [
        SensorKey::Temperature,
        SensorKey::Humidity,
        SensorKey::Pressure,
        SensorKey::Light,
        SensorKey::Gas,
    ];

    /// backend resource name (`/temperatura`, `{"temperatura": ...}`)
    pub fn api_name(self) -> &'static str {
        match self {
            SensorKey::Temperature => "temperatura",
            SensorKey::Humidity => "humedad",
            SensorKey::Pressure => "presion",
            SensorKey::Light => "luz",
            SensorKey::Gas => "gas",
        }
    }

    pub fn from_api_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.api_name() == name)
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// a point as the backend sends it
///
/// every field is lenient: `id` is missing in some feeds, `value` may be a
/// number or a numeric string, and `time` may be null or empty. coercion
/// happens in normalize.rs, never here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub time: Option<String>,
}

impl RawPoint {
    pub fn new(id: Option<i64>, value: f64, time: impl Into<String>) -> Self {
        Self {
            id,
            value: Some(serde_json::json!(value)),
            time: Some(time.into()),
        }
    }
}

/// a normalized, display-ready point. immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub id: Option<i64>,
    /// NaN when the source value was not numeric
    pub value: f64,
    /// canonical ISO form of the source timestamp ("" when absent)
    pub iso_time: String,
    /// "HH:MM" 24h, or "--:--"
    pub label: String,
}

impl DisplayPoint {
    /// a reading is usable for stats and status only when it is finite
    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// one websocket frame: any subset of sensors, each with an optional point
///
/// `null` and absent keys both mean "no update for this sensor in this tick".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaMessage {
    #[serde(default)]
    pub temperatura: Option<RawPoint>,
    #[serde(default)]
    pub humedad: Option<RawPoint>,
    #[serde(default)]
    pub presion: Option<RawPoint>,
    #[serde(default)]
    pub luz: Option<RawPoint>,
    #[serde(default)]
    pub gas: Option<RawPoint>,
}

impl DeltaMessage {
    /// present entries in fixed sensor order
    pub fn into_entries(self) -> Vec<(SensorKey, RawPoint)> {
        [
            (SensorKey::Temperature, self.temperatura),
            (SensorKey::Humidity, self.humedad),
            (SensorKey::Pressure, self.presion),
            (SensorKey::Light, self.luz),
            (SensorKey::Gas, self.gas),
        ]
        .into_iter()
        .filter_map(|(key, point)| point.map(|p| (key, p)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_names_round_trip() {
        for key in SensorKey::ALL {
            assert_eq!(SensorKey::from_api_name(key.api_name()), Some(key));
        }
        assert_eq!(SensorKey::from_api_name("co2"), None);
    }

    #[test]
    fn delta_skips_null_and_absent_sensors() {
        let msg: DeltaMessage = serde_json::from_str(
            r#"{"temperatura": {"id": 3, "value": 21.5, "time": "2024-01-01 10:00:00"},
                "humedad": null,
                "extra": 1}"#,
        )
        .unwrap();

        let entries = msg.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, SensorKey::Temperature);
        assert_eq!(entries[0].1.id, Some(3));
    }

    #[test]
    fn raw_point_accepts_string_values_and_missing_fields() {
        let p: RawPoint = serde_json::from_str(r#"{"value": "12.5"}"#).unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.time, None);
        assert_eq!(p.value, Some(serde_json::json!("12.5")));
    }
}
