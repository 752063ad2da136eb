//! ==============================================================================
//! normalize.rs - RawPoint -> DisplayPoint
//! ==============================================================================
//!
//! purpose:
//!     turns whatever the backend sent into something the dashboard can show.
//!     never fails: a malformed point yields sentinel display values so one bad
//!     row cannot sink a whole history batch or websocket frame.
//!
//! timestamp handling:
//!     the backend emits both "YYYY-MM-DD HH:MM:SS" and ISO "...T..." forms.
//!     the first space is replaced with "T" to get one canonical form, which is
//!     then parsed. naive timestamps are taken as local wall-clock time, so the
//!     label is the HH:MM written in the string; offset-aware ones are shown in
//!     local time.
//!
//! ==============================================================================

use crate::domain::{DisplayPoint, RawPoint};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// label used when a timestamp is missing or unparseable
pub const NO_TIME_LABEL: &str = "--:--";

pub fn normalize(raw: &RawPoint) -> DisplayPoint {
    let time = raw.time.as_deref().unwrap_or("");
    let iso_time = to_iso(time);
    let label = if time.is_empty() {
        NO_TIME_LABEL.to_string()
    } else {
        time_label(&iso_time).unwrap_or_else(|| NO_TIME_LABEL.to_string())
    };

    DisplayPoint {
        id: raw.id,
        value: coerce_value(raw.value.as_ref()),
        iso_time,
        label,
    }
}

/// canonical ISO form: untouched if it already has a "T", else first space -> "T"
pub fn to_iso(time: &str) -> String {
    if time.contains('T') {
        time.to_string()
    } else {
        time.replacen(' ', "T", 1)
    }
}

/// "HH:MM" for a canonical timestamp, `None` when it cannot be parsed
pub fn time_label(iso: &str) -> Option<String> {
    const HM: &str = "%H:%M";

    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.with_timezone(&Local).format(HM).to_string());
    }
    if let Ok(dt) = DateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Local).format(HM).to_string());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(iso, fmt) {
            return Some(naive.format(HM).to_string());
        }
    }
    // bare dates are midnight UTC
    let midnight = NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(
        Utc.from_utc_datetime(&midnight)
            .with_timezone(&Local)
            .format(HM)
            .to_string(),
    )
}

/// numeric coercion with the usual lenient rules; NaN means "no valid reading"
pub fn coerce_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(time: Option<&str>, value: Value) -> RawPoint {
        RawPoint {
            id: Some(1),
            value: Some(value),
            time: time.map(str::to_string),
        }
    }

    #[test]
    fn empty_or_missing_time_gets_sentinel_label() {
        for time in [None, Some("")] {
            let p = normalize(&raw(time, json!(1.0)));
            assert_eq!(p.label, NO_TIME_LABEL);
            assert_eq!(p.iso_time, "");
        }
    }

    #[test]
    fn iso_time_is_kept_verbatim() {
        let p = normalize(&raw(Some("2024-01-01T10:05:00"), json!(1.0)));
        assert_eq!(p.iso_time, "2024-01-01T10:05:00");
        assert_eq!(p.label, "10:05");
    }

    #[test]
    fn space_separated_time_replaces_only_first_space() {
        let p = normalize(&raw(Some("2024-01-01 09:07:33"), json!(1.0)));
        assert_eq!(p.iso_time, "2024-01-01T09:07:33");
        assert_eq!(p.label, "09:07");

        assert_eq!(to_iso("2024-01-01 09:07:33 extra"), "2024-01-01T09:07:33 extra");
    }

    #[test]
    fn fractional_seconds_parse() {
        assert_eq!(time_label("2024-03-02T23:59:59.123456").as_deref(), Some("23:59"));
    }

    #[test]
    fn garbage_time_keeps_iso_but_sentinel_label() {
        let p = normalize(&raw(Some("ayer por la tarde"), json!(5)));
        assert_eq!(p.iso_time, "ayerTpor la tarde");
        assert_eq!(p.label, NO_TIME_LABEL);
        assert_eq!(p.value, 5.0);

        let p = normalize(&raw(Some("Tarde sin hora"), json!(5)));
        assert_eq!(p.iso_time, "Tarde sin hora");
        assert_eq!(p.label, NO_TIME_LABEL);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        assert_eq!(coerce_value(Some(&json!("21.5"))), 21.5);
        assert_eq!(coerce_value(Some(&json!(" 7 "))), 7.0);
        assert_eq!(coerce_value(Some(&json!(""))), 0.0);
    }

    #[test]
    fn non_numeric_values_become_nan() {
        let p = normalize(&raw(Some("2024-01-01 10:00:00"), json!("abc")));
        assert!(p.value.is_nan());
        assert!(!p.is_valid());

        assert!(coerce_value(None).is_nan());
        assert!(coerce_value(Some(&Value::Null)).is_nan());
        assert!(coerce_value(Some(&json!([1, 2]))).is_nan());
    }
}
