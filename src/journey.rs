use geofix::{PositionFix, TrackPoint};
use serde::Serialize;

use crate::utilities::{format_local_time, format_optional, format_speed_kmh, ms_to_kmh};

/// Arithmetic mean kept as a running (sum, count) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    sum: f64,
    count: u64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

/// Everything that can change a journey session.
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyEvent {
    /// A new journey starts, all statistics are reset
    Started { start_time_ms: i64 },
    /// The journey ends, statistics stay readable
    Stopped,
    /// A fix delivered by the subscription
    Fix(PositionFix),
    /// A one-shot location read, only refreshes the displayed fix
    Located(PositionFix),
}

/// Statistics of the current (or last) journey.
#[derive(Debug, Clone, Default)]
pub struct JourneySession {
    recording: bool,
    start_time_ms: Option<i64>,
    current_speed: Option<f64>,
    speed_samples: RunningMean,
    track_points: Vec<TrackPoint>,
    last_fix: Option<PositionFix>,
}

impl JourneySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event to the session
    pub fn apply(&mut self, event: JourneyEvent) {
        match event {
            JourneyEvent::Started { start_time_ms } => {
                self.recording = true;
                self.start_time_ms = Some(start_time_ms);
                self.current_speed = None;
                self.speed_samples = RunningMean::default();
                self.track_points.clear();
            }
            JourneyEvent::Stopped => {
                self.recording = false;
            }
            JourneyEvent::Fix(fix) => self.record_fix(fix),
            JourneyEvent::Located(fix) => {
                self.last_fix = Some(fix);
            }
        }
    }

    fn record_fix(&mut self, fix: PositionFix) {
        if let Some(speed) = fix.ground_speed() {
            self.current_speed = Some(speed);
            if self.recording {
                self.speed_samples.push(speed);
                self.track_points.push(fix.track_point());
            }
        }
        self.last_fix = Some(fix);
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn start_time_ms(&self) -> Option<i64> {
        self.start_time_ms
    }

    pub fn current_speed(&self) -> Option<f64> {
        self.current_speed
    }

    pub fn average_speed(&self) -> Option<f64> {
        self.speed_samples.mean()
    }

    pub fn track_points(&self) -> &[TrackPoint] {
        &self.track_points
    }

    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    pub fn snapshot(&self, is_active: bool) -> JourneySnapshot {
        JourneySnapshot {
            last_fix: self.last_fix.clone(),
            current_speed: self.current_speed,
            average_speed: self.average_speed(),
            start_time: self.start_time_ms,
            track_points: self.track_points.clone(),
            is_active,
        }
    }
}

/// Read-only view of the journey handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySnapshot {
    pub last_fix: Option<PositionFix>,
    pub current_speed: Option<f64>, // m/s
    pub average_speed: Option<f64>, // m/s
    pub start_time: Option<i64>,    // ms since epoch
    pub track_points: Vec<TrackPoint>,
    pub is_active: bool,
}

impl JourneySnapshot {
    pub fn current_speed_kmh(&self) -> Option<f64> {
        self.current_speed.map(ms_to_kmh)
    }

    pub fn average_speed_kmh(&self) -> Option<f64> {
        self.average_speed.map(ms_to_kmh)
    }
}

impl std::fmt::Display for JourneySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "╔════════════════════════════════════════════════════╗")?;
        writeln!(
            f,
            "║         JOURNEY STATUS {}",
            if self.is_active { "(tracking)" } else { "" }
        )?;
        writeln!(f, "╠════════════════════════════════════════════════════╣")?;

        match &self.last_fix {
            None => {
                let hint = if self.is_active {
                    "Getting location..."
                } else {
                    "Start tracking to see location data"
                };
                writeln!(f, "║ {}", hint)?;
            }
            Some(fix) => {
                writeln!(f, "║ Current Speed: {} km/h", format_speed_kmh(self.current_speed))?;
                if self.average_speed.is_some() {
                    writeln!(f, "║ Journey Avg:   {} km/h", format_speed_kmh(self.average_speed))?;
                }
                writeln!(f, "║ Position:      {:.6}, {:.6}", fix.latitude, fix.longitude)?;
                writeln!(f, "║ Altitude:      {}", format_optional(fix.altitude, "m"))?;
                writeln!(f, "║ Accuracy:      {}", format_optional(fix.accuracy, "m"))?;
                writeln!(f, "║ Heading:       {}", format_optional(fix.heading, "°"))?;
                let gps_speed = match fix.ground_speed() {
                    Some(speed) => format!("{} km/h", format_speed_kmh(Some(speed))),
                    None => "N/A".to_string(),
                };
                writeln!(f, "║ GPS Speed:     {}", gps_speed)?;
                writeln!(f, "║ Updated:       {}", format_local_time(Some(fix.capture_time_ms)))?;
                writeln!(f, "║ Journey Start: {}", format_local_time(self.start_time))?;
                writeln!(f, "║ Track Points:  {}", self.track_points.len())?;
            }
        }
        write!(f, "╚════════════════════════════════════════════════════╝")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn fix(t: i64, lat: f64, lon: f64, speed: Option<f64>) -> PositionFix {
        let mut fix = PositionFix::new(lat, lon, t);
        fix.ground_speed = speed;
        fix
    }

    fn started() -> JourneySession {
        let mut session = JourneySession::new();
        session.apply(JourneyEvent::Started { start_time_ms: 0 });
        session
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = JourneySession::new();
        assert!(!session.is_recording());
        assert!(session.start_time_ms().is_none());
        assert!(session.current_speed().is_none());
        assert!(session.average_speed().is_none());
        assert!(session.track_points().is_empty());
        assert!(session.last_fix().is_none());
    }

    #[test]
    fn test_running_mean() {
        let mut mean = RunningMean::default();
        assert!(mean.mean().is_none());
        mean.push(2.0);
        mean.push(4.0);
        mean.push(6.0);
        assert_abs_diff_eq!(mean.mean().unwrap(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_running_mean_matches_naive_mean() {
        let samples: Vec<f64> = (1..=500).map(|i| (i as f64 * 0.37).sin().abs() * 12.0 + 0.1).collect();
        let mut mean = RunningMean::default();
        for (i, s) in samples.iter().enumerate() {
            mean.push(*s);
            let naive = samples[..=i].iter().sum::<f64>() / (i + 1) as f64;
            assert_abs_diff_eq!(mean.mean().unwrap(), naive, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_average_speed() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(2.0))));
        session.apply(JourneyEvent::Fix(fix(1000, 1.0, 1.0, Some(4.0))));
        session.apply(JourneyEvent::Fix(fix(2000, 1.0, 1.0, Some(6.0))));
        assert_abs_diff_eq!(session.average_speed().unwrap(), 4.0, epsilon = 1e-9);
        assert_eq!(session.track_points().len(), 3);
    }

    #[test]
    fn test_zero_and_absent_speed_excluded_while_recording() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(5.0))));

        session.apply(JourneyEvent::Fix(fix(1000, 1.1, 1.1, Some(0.0))));
        assert_abs_diff_eq!(session.average_speed().unwrap(), 5.0);
        assert_eq!(session.track_points().len(), 1);
        assert_eq!(session.last_fix().unwrap().capture_time_ms, 1000);

        session.apply(JourneyEvent::Fix(fix(2000, 1.2, 1.2, None)));
        assert_abs_diff_eq!(session.average_speed().unwrap(), 5.0);
        assert_eq!(session.track_points().len(), 1);
        assert_eq!(session.last_fix().unwrap().capture_time_ms, 2000);
        assert_eq!(session.current_speed(), Some(5.0));
    }

    #[test]
    fn test_negative_speed_treated_as_absent() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(-3.0))));
        assert!(session.current_speed().is_none());
        assert!(session.average_speed().is_none());
        assert!(session.track_points().is_empty());
        assert!(session.last_fix().is_some());
    }

    #[test]
    fn test_fixes_while_not_recording() {
        let mut session = JourneySession::new();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(3.0))));
        assert_eq!(session.current_speed(), Some(3.0));
        assert!(session.average_speed().is_none());
        assert!(session.track_points().is_empty());
        assert_eq!(session.last_fix().unwrap().capture_time_ms, 0);
    }

    #[test]
    fn test_stop_keeps_statistics() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(4.0))));
        session.apply(JourneyEvent::Stopped);

        assert!(!session.is_recording());
        assert_eq!(session.start_time_ms(), Some(0));
        assert_eq!(session.average_speed(), Some(4.0));
        assert_eq!(session.track_points().len(), 1);

        // fixes after stop refresh the display only
        session.apply(JourneyEvent::Fix(fix(1000, 2.0, 2.0, Some(8.0))));
        assert_eq!(session.current_speed(), Some(8.0));
        assert_eq!(session.average_speed(), Some(4.0));
        assert_eq!(session.track_points().len(), 1);
        assert_eq!(session.last_fix().unwrap().capture_time_ms, 1000);
    }

    #[test]
    fn test_start_resets_session() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(4.0))));
        session.apply(JourneyEvent::Fix(fix(1000, 1.0, 1.0, Some(6.0))));

        session.apply(JourneyEvent::Started { start_time_ms: 5000 });
        assert!(session.is_recording());
        assert_eq!(session.start_time_ms(), Some(5000));
        assert!(session.current_speed().is_none());
        assert!(session.average_speed().is_none());
        assert!(session.track_points().is_empty());
    }

    #[test]
    fn test_located_only_updates_last_fix() {
        let mut session = started();
        session.apply(JourneyEvent::Located(fix(0, 1.0, 1.0, Some(9.0))));
        assert!(session.current_speed().is_none());
        assert!(session.average_speed().is_none());
        assert!(session.track_points().is_empty());
        assert_eq!(session.last_fix().unwrap().ground_speed, Some(9.0));
    }

    #[test]
    fn test_snapshot_kmh() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(10.0))));
        let snapshot = session.snapshot(true);
        assert!(snapshot.is_active);
        assert_abs_diff_eq!(snapshot.current_speed_kmh().unwrap(), 36.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapshot.average_speed_kmh().unwrap(), 36.0, epsilon = 1e-9);
    }

    #[test]
    fn test_snapshot_report() {
        let session = JourneySession::new();
        let report = session.snapshot(false).to_string();
        assert!(report.contains("Start tracking to see location data"));

        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 45.123456, 9.654321, Some(10.0))));
        let report = session.snapshot(true).to_string();
        assert!(report.contains("Current Speed: 36.0 km/h"));
        assert!(report.contains("Journey Avg:   36.0 km/h"));
        assert!(report.contains("45.123456, 9.654321"));
        assert!(report.contains("Altitude:      N/A"));
        assert!(report.contains("GPS Speed:     36.0 km/h"));
    }

    #[test]
    fn test_snapshot_report_hides_unusable_gps_speed() {
        for speed in [-3.0, f64::NAN, 0.0] {
            let mut session = started();
            session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(speed))));
            let report = session.snapshot(true).to_string();
            assert!(report.contains("GPS Speed:     N/A"), "speed {}: {}", speed, report);
            assert!(report.contains("Current Speed: 0.0 km/h"));
        }
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut session = started();
        session.apply(JourneyEvent::Fix(fix(0, 1.0, 1.0, Some(5.0))));
        let json = serde_json::to_string(&session.snapshot(true)).unwrap();
        assert!(json.contains("\"is_active\":true"));
        assert!(json.contains("\"average_speed\":5.0"));
        assert!(json.contains("\"track_points\":[{"));
    }
}
