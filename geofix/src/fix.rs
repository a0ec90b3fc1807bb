use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw sample from a position source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,  // degrees
    pub longitude: f64, // degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>, // meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>, // meters, horizontal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>, // degrees [0, 360)
    #[serde(default, rename = "speed", skip_serializing_if = "Option::is_none")]
    pub ground_speed: Option<f64>, // m/s
    #[serde(rename = "timestamp_ms")]
    pub capture_time_ms: i64,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, capture_time_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            heading: None,
            ground_speed: None,
            capture_time_ms,
        }
    }

    pub fn with_speed(mut self, speed_ms: f64) -> Self {
        self.ground_speed = Some(speed_ms);
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading = Some(heading_deg);
        self
    }

    pub fn with_altitude(mut self, altitude_m: f64) -> Self {
        self.altitude = Some(altitude_m);
        self
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy = Some(accuracy_m);
        self
    }

    /// Usable ground speed in m/s. Zero, negative and non-finite readings
    /// count as "no speed".
    pub fn ground_speed(&self) -> Option<f64> {
        self.ground_speed.filter(|s| s.is_finite() && *s > 0.0)
    }

    pub fn track_point(&self) -> TrackPoint {
        TrackPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            capture_time_ms: self.capture_time_ms,
        }
    }

    /// Capture time as a UTC timestamp, `None` when out of range
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.capture_time_ms)
    }
}

impl fmt::Display for PositionFix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fix: {:.6}, {:.6}", self.latitude, self.longitude)?;
        match self.captured_at() {
            Some(at) => write!(f, " @ {}", at.format("%Y-%m-%d %H:%M:%S%.3f UTC"))?,
            None => write!(f, " @ {} ms", self.capture_time_ms)?,
        }
        if let Some(speed) = self.ground_speed {
            write!(f, " | SOG: {:.2} m/s", speed)?;
        }
        if let Some(heading) = self.heading {
            write!(f, " | HDG: {:.1}°", heading)?;
        }
        Ok(())
    }
}

/// A recorded waypoint of the current journey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "timestamp_ms")]
    pub capture_time_ms: i64,
}
