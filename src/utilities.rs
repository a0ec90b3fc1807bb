/// Unit conversion and formatting helpers for presenting journey data

use chrono::{DateTime, Local, Utc};

const MS_TO_KMH: f64 = 3.6;

/// Convert a speed in m/s to km/h.
pub fn ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms * MS_TO_KMH
}

/// km/h with one decimal, "0.0" when there is no speed yet.
pub fn format_speed_kmh(speed_ms: Option<f64>) -> String {
    match speed_ms {
        Some(speed) => format!("{:.1}", ms_to_kmh(speed)),
        None => "0.0".to_string(),
    }
}

/// One decimal with a unit suffix, "N/A" when missing.
pub fn format_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "N/A".to_string(),
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render an epoch-millis timestamp as a local time of day, "N/A" when missing.
pub fn format_local_time(timestamp_ms: Option<i64>) -> String {
    timestamp_ms
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}
