//! ==============================================================================
//! alerts.rs - threshold evaluation, alert feed and per-sensor status
//! ==============================================================================
//!
//! purpose:
//!     classifies readings against static per-sensor bounds and derives the two
//!     views the dashboard shows from that: the current status of every sensor
//!     and a flat feed of recent out-of-range readings.
//!
//! evaluation order (first match wins, high bounds before low bounds):
//!     dangerHigh -> warningHigh -> dangerLow -> warningLow -> ok
//!
//!     each evaluation is independent, there is no hysteresis. a sensor with
//!     no bounds (pressure) is always ok.
//!
//! relationships:
//!     - reads: buffer.rs (SensorBuffer snapshots)
//!     - used by: state.rs (snapshot), main.rs (periodic report)
//!
//! ==============================================================================

use crate::buffer::SensorBuffer;
use crate::domain::SensorKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// how many of the newest entries per sensor feed the alert list
pub const DEFAULT_ALERT_WINDOW: usize = 80;

pub const IN_RANGE_MESSAGE: &str = "Dentro de rango";
pub const NO_DATA_MESSAGE: &str = "Sin datos suficientes";

/// id segment for readings the backend sent without an id; sorts above every
/// numeric id in the lexicographic feed
pub const MISSING_ID: &str = "undefined";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Danger,
}

impl Severity {
    /// badge text shown next to a sensor
    pub fn badge(self) -> &'static str {
        match self {
            Severity::Ok => "Normal",
            Severity::Warning => "Alerta",
            Severity::Danger => "Peligro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorThresholdConfig {
    pub label: String,
    pub unit: String,
    #[serde(default)]
    pub warning_high: Option<f64>,
    #[serde(default)]
    pub danger_high: Option<f64>,
    #[serde(default)]
    pub warning_low: Option<f64>,
    #[serde(default)]
    pub danger_low: Option<f64>,
}

impl SensorThresholdConfig {
    /// built-in bounds for each sensor
    pub fn defaults_for(key: SensorKey) -> Self {
        let base = |label: &str, unit: &str| Self {
            label: label.to_string(),
            unit: unit.to_string(),
            warning_high: None,
            danger_high: None,
            warning_low: None,
            danger_low: None,
        };

        match key {
            SensorKey::Temperature => Self {
                warning_high: Some(28.0),
                danger_high: Some(32.0),
                warning_low: Some(18.0),
                danger_low: Some(15.0),
                ..base("Temperatura", "°C")
            },
            SensorKey::Humidity => Self {
                warning_high: Some(70.0),
                danger_high: Some(85.0),
                warning_low: Some(30.0),
                danger_low: Some(20.0),
                ..base("Humedad", "%")
            },
            SensorKey::Pressure => base("Presión", "hPa"),
            SensorKey::Light => Self {
                warning_high: Some(80.0),
                danger_high: Some(95.0),
                ..base("Luz", "%")
            },
            SensorKey::Gas => Self {
                warning_high: Some(150.0),
                danger_high: Some(300.0),
                ..base("Gas", "%")
            },
        }
    }

    pub fn has_bounds(&self) -> bool {
        self.warning_high.is_some()
            || self.danger_high.is_some()
            || self.warning_low.is_some()
            || self.danger_low.is_some()
    }

    pub fn evaluate(&self, value: f64) -> Evaluation {
        let label = &self.label;
        let hit = |bound: Option<f64>, cmp: fn(f64, f64) -> bool| bound.is_some_and(|b| cmp(value, b));

        if hit(self.danger_high, |v, b| v >= b) {
            Evaluation::new(Severity::Danger, format!("{label} muy alta"))
        } else if hit(self.warning_high, |v, b| v >= b) {
            Evaluation::new(Severity::Warning, format!("{label} elevada"))
        } else if hit(self.danger_low, |v, b| v <= b) {
            Evaluation::new(Severity::Danger, format!("{label} muy baja"))
        } else if hit(self.warning_low, |v, b| v <= b) {
            Evaluation::new(Severity::Warning, format!("{label} fuera de rango"))
        } else {
            Evaluation::new(Severity::Ok, IN_RANGE_MESSAGE)
        }
    }

    /// "21.3 °C" or "-- °C"
    pub fn format_value(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{v:.1} {}", self.unit),
            None => format!("-- {}", self.unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub severity: Severity,
    pub message: String,
}

impl Evaluation {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// bounds for all five sensors, defaults overridable from config
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds(BTreeMap<SensorKey, SensorThresholdConfig>);

impl Default for Thresholds {
    fn default() -> Self {
        Self(
            SensorKey::ALL
                .into_iter()
                .map(|k| (k, SensorThresholdConfig::defaults_for(k)))
                .collect(),
        )
    }
}

impl Thresholds {
    pub fn with_overrides(overrides: &BTreeMap<SensorKey, SensorThresholdConfig>) -> Self {
        let mut thresholds = Self::default();
        for (key, cfg) in overrides {
            thresholds.0.insert(*key, cfg.clone());
        }
        thresholds
    }

    pub fn get(&self, key: SensorKey) -> &SensorThresholdConfig {
        // every key is populated by Default
        &self.0[&key]
    }
}

/// how the alert feed is ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertOrder {
    /// descending string compare of the alert id ("temperatura-9" sorts above
    /// "temperatura-10"); only tracks recency while ids share a digit count
    #[default]
    Lexicographic,
    /// descending by numeric point id
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEntry {
    /// "<sensor api name>-<point id>", "<sensor api name>-undefined" without id
    pub id: String,
    #[serde(skip)]
    pub point_id: Option<i64>,
    pub sensor_label: String,
    /// HH:MM of the reading
    pub label: String,
    pub value: f64,
    pub unit: String,
    pub severity: Severity,
    pub message: String,
}

/// scan the newest `window` entries of every bounded sensor and keep the
/// non-ok readings
pub fn build_alert_feed<'a>(
    sources: impl IntoIterator<Item = (SensorKey, &'a SensorThresholdConfig, &'a SensorBuffer)>,
    window: usize,
    order: AlertOrder,
) -> Vec<AlertEntry> {
    let mut items = Vec::new();

    for (key, config, buffer) in sources {
        if !config.has_bounds() {
            continue;
        }
        for point in buffer.recent(window) {
            let eval = config.evaluate(point.value);
            if eval.severity == Severity::Ok {
                continue;
            }
            let id_part = point
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| MISSING_ID.to_string());
            items.push(AlertEntry {
                id: format!("{}-{}", key.api_name(), id_part),
                point_id: point.id,
                sensor_label: config.label.clone(),
                label: point.label.clone(),
                value: point.value,
                unit: config.unit.clone(),
                severity: eval.severity,
                message: eval.message,
            });
        }
    }

    sort_alerts(&mut items, order);
    items
}

pub fn sort_alerts(items: &mut [AlertEntry], order: AlertOrder) {
    match order {
        AlertOrder::Lexicographic => items.sort_by(|a, b| b.id.cmp(&a.id)),
        AlertOrder::Numeric => items.sort_by(|a, b| b.point_id.cmp(&a.point_id)),
    }
}

/// what a sensor card shows: latest reading and its evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    pub key: SensorKey,
    pub label: String,
    pub unit: String,
    pub value: Option<f64>,
    pub display_value: String,
    pub time: Option<String>,
    pub severity: Severity,
    pub badge: &'static str,
    pub message: String,
}

impl SensorStatus {
    pub fn from_buffer(key: SensorKey, config: &SensorThresholdConfig, buffer: &SensorBuffer) -> Self {
        let latest = buffer.latest().filter(|p| p.is_valid());
        let (severity, message) = match latest {
            Some(p) => {
                let eval = config.evaluate(p.value);
                (eval.severity, eval.message)
            }
            None => (Severity::Ok, NO_DATA_MESSAGE.to_string()),
        };
        let value = latest.map(|p| p.value);

        Self {
            key,
            label: config.label.clone(),
            unit: config.unit.clone(),
            value,
            display_value: config.format_value(value),
            time: latest.map(|p| p.label.clone()),
            severity,
            badge: severity.badge(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DisplayPoint;

    fn pt(id: i64, value: f64) -> DisplayPoint {
        DisplayPoint {
            id: Some(id),
            value,
            iso_time: String::new(),
            label: "10:00".into(),
        }
    }

    fn buffer(points: &[(i64, f64)]) -> SensorBuffer {
        let mut buf = SensorBuffer::new(200);
        for (id, v) in points {
            buf.insert(pt(*id, *v));
        }
        buf
    }

    #[test]
    fn temperature_bounds() {
        let cfg = SensorThresholdConfig::defaults_for(SensorKey::Temperature);
        let cases = [
            (33.0, Severity::Danger, "Temperatura muy alta"),
            (32.0, Severity::Danger, "Temperatura muy alta"),
            (29.0, Severity::Warning, "Temperatura elevada"),
            (23.0, Severity::Ok, IN_RANGE_MESSAGE),
            (17.0, Severity::Warning, "Temperatura fuera de rango"),
            (15.0, Severity::Danger, "Temperatura muy baja"),
            (14.0, Severity::Danger, "Temperatura muy baja"),
        ];
        for (value, severity, message) in cases {
            let eval = cfg.evaluate(value);
            assert_eq!(eval.severity, severity, "value {value}");
            assert_eq!(eval.message, message, "value {value}");
        }
    }

    #[test]
    fn unbounded_sensor_is_always_ok() {
        let cfg = SensorThresholdConfig::defaults_for(SensorKey::Pressure);
        assert!(!cfg.has_bounds());
        for value in [-1e9, -5.0, 0.0, 1013.0, 1e12] {
            assert_eq!(cfg.evaluate(value).severity, Severity::Ok);
        }
    }

    #[test]
    fn nan_evaluates_ok() {
        let cfg = SensorThresholdConfig::defaults_for(SensorKey::Gas);
        assert_eq!(cfg.evaluate(f64::NAN).severity, Severity::Ok);
    }

    #[test]
    fn feed_sorts_ids_as_strings() {
        let thresholds = Thresholds::default();
        let temp = buffer(&[(9, 40.0), (10, 40.0)]);
        let feed = build_alert_feed(
            [(SensorKey::Temperature, thresholds.get(SensorKey::Temperature), &temp)],
            DEFAULT_ALERT_WINDOW,
            AlertOrder::Lexicographic,
        );

        let ids: Vec<_> = feed.iter().map(|a| a.id.as_str()).collect();
        // "9" > "10" as strings, although 10 is the newer reading
        assert_eq!(ids, vec!["temperatura-9", "temperatura-10"]);
    }

    #[test]
    fn id_less_history_point_sorts_first() {
        let thresholds = Thresholds::default();
        let mut temp = SensorBuffer::new(200);
        temp.load_history(vec![
            DisplayPoint { id: None, ..pt(0, 40.0) },
            pt(5, 40.0),
        ]);
        let feed = build_alert_feed(
            [(SensorKey::Temperature, thresholds.get(SensorKey::Temperature), &temp)],
            DEFAULT_ALERT_WINDOW,
            AlertOrder::Lexicographic,
        );

        let ids: Vec<_> = feed.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["temperatura-undefined", "temperatura-5"]);
        assert_eq!(feed[0].point_id, None);
    }

    #[test]
    fn numeric_order_puts_newest_first() {
        let thresholds = Thresholds::default();
        let temp = buffer(&[(9, 40.0), (10, 40.0)]);
        let feed = build_alert_feed(
            [(SensorKey::Temperature, thresholds.get(SensorKey::Temperature), &temp)],
            DEFAULT_ALERT_WINDOW,
            AlertOrder::Numeric,
        );
        assert_eq!(feed[0].id, "temperatura-10");
    }

    #[test]
    fn feed_skips_ok_readings_and_unbounded_sensors() {
        let thresholds = Thresholds::default();
        let temp = buffer(&[(1, 23.0), (2, 29.0)]);
        let pres = buffer(&[(1, -500.0)]);
        let feed = build_alert_feed(
            [
                (SensorKey::Temperature, thresholds.get(SensorKey::Temperature), &temp),
                (SensorKey::Pressure, thresholds.get(SensorKey::Pressure), &pres),
            ],
            DEFAULT_ALERT_WINDOW,
            AlertOrder::Lexicographic,
        );

        assert_eq!(feed.len(), 1);
        let alert = &feed[0];
        assert_eq!(alert.sensor_label, "Temperatura");
        assert_eq!(alert.unit, "°C");
        assert_eq!(alert.severity, Severity::Warning);
        assert_eq!(alert.message, "Temperatura elevada");
        assert_eq!(alert.value, 29.0);
    }

    #[test]
    fn feed_only_scans_the_window() {
        let thresholds = Thresholds::default();
        let points: Vec<_> = (1..=100).map(|id| (id, 99.0)).collect();
        let hum = buffer(&points);
        let feed = build_alert_feed(
            [(SensorKey::Humidity, thresholds.get(SensorKey::Humidity), &hum)],
            DEFAULT_ALERT_WINDOW,
            AlertOrder::Numeric,
        );
        assert_eq!(feed.len(), 80);
        assert_eq!(feed.last().and_then(|a| a.point_id), Some(21));
    }

    #[test]
    fn status_without_data() {
        let cfg = SensorThresholdConfig::defaults_for(SensorKey::Light);
        let status = SensorStatus::from_buffer(SensorKey::Light, &cfg, &SensorBuffer::default());
        assert_eq!(status.value, None);
        assert_eq!(status.display_value, "-- %");
        assert_eq!(status.message, NO_DATA_MESSAGE);
        assert_eq!(status.badge, "Normal");
    }

    #[test]
    fn status_uses_latest_reading() {
        let cfg = SensorThresholdConfig::defaults_for(SensorKey::Light);
        let status = SensorStatus::from_buffer(SensorKey::Light, &cfg, &buffer(&[(1, 10.0), (2, 96.04)]));
        assert_eq!(status.display_value, "96.0 %");
        assert_eq!(status.severity, Severity::Danger);
        assert_eq!(status.badge, "Peligro");
        assert_eq!(status.message, "Luz muy alta");
        assert_eq!(status.time.as_deref(), Some("10:00"));
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert(
            SensorKey::Pressure,
            SensorThresholdConfig {
                danger_low: Some(950.0),
                ..SensorThresholdConfig::defaults_for(SensorKey::Pressure)
            },
        );
        let thresholds = Thresholds::with_overrides(&overrides);
        assert_eq!(thresholds.get(SensorKey::Pressure).evaluate(900.0).severity, Severity::Danger);
        assert_eq!(thresholds.get(SensorKey::Temperature), &SensorThresholdConfig::defaults_for(SensorKey::Temperature));
    }
}
