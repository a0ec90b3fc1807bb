use std::time::Duration;

use geofix::{FixHandler, PositionFix};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::info;

/// Application-level counters for the fix stream and the tracker
/// (not to be confused with journey statistics like average speed)
pub struct AppMetrics {
    /// Number of fixes delivered by the position source
    pub fixes_received: u64,
    /// Number of fixes without a usable ground speed
    pub speedless_fixes: u64,
    /// Number of track points recorded
    pub track_points: u64,
    /// Number of subscriptions opened
    pub subscriptions_opened: u64,
    /// Number of failed subscribe or one-shot location calls
    pub source_errors: u64,
}

impl AppMetrics {
    /// Create a new AppMetrics instance with all counters at zero
    pub fn new() -> Self {
        Self {
            fixes_received: 0,
            speedless_fixes: 0,
            track_points: 0,
            subscriptions_opened: 0,
            source_errors: 0,
        }
    }

    /// Count a fix, `recording` tells whether it was eligible for the track
    pub fn record_fix(&mut self, fix: &PositionFix, recording: bool) {
        self.handle_fix(fix);
        if recording && fix.ground_speed().is_some() {
            self.track_points += 1;
        }
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        self.fixes_received = 0;
        self.speedless_fixes = 0;
        self.track_points = 0;
        self.subscriptions_opened = 0;
        self.source_errors = 0;
    }

    /// Log current metrics to the info log
    pub fn log(&self) {
        info!(
            "[Metrics] Fixes: {}, Speedless fixes: {}, Track points: {}, Subscriptions: {}, Source errors: {}",
            self.fixes_received,
            self.speedless_fixes,
            self.track_points,
            self.subscriptions_opened,
            self.source_errors
        );
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FixHandler for AppMetrics {
    fn handle_fix(&mut self, fix: &PositionFix) {
        self.fixes_received += 1;
        if fix.ground_speed().is_none() {
            self.speedless_fixes += 1;
        }
    }
}

/// Periodic metrics log, driven by a tokio interval.
///
/// The first report is due one full interval after creation. Must be created
/// inside a tokio runtime.
pub struct MetricsLogger {
    ticker: Interval,
    reports: u64,
}

impl MetricsLogger {
    pub fn new(log_interval: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + log_interval, log_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker, reports: 0 }
    }

    pub fn log_interval(&self) -> Duration {
        self.ticker.period()
    }

    /// Wait until the next report is due
    pub async fn due(&mut self) {
        self.ticker.tick().await;
    }

    /// Log the counters and start a new period
    pub fn report(&mut self, metrics: &mut AppMetrics) {
        metrics.log();
        metrics.reset();
        self.reports += 1;
    }

    /// Reports written so far
    pub fn reports(&self) -> u64 {
        self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = AppMetrics::new();
        assert_eq!(metrics.fixes_received, 0);
        assert_eq!(metrics.speedless_fixes, 0);
        assert_eq!(metrics.track_points, 0);
        assert_eq!(metrics.subscriptions_opened, 0);
        assert_eq!(metrics.source_errors, 0);
    }

    #[test]
    fn test_record_fix() {
        let mut metrics = AppMetrics::new();
        metrics.record_fix(&PositionFix::new(1.0, 1.0, 0).with_speed(5.0), true);
        metrics.record_fix(&PositionFix::new(1.0, 1.0, 1000).with_speed(0.0), true);
        metrics.record_fix(&PositionFix::new(1.0, 1.0, 2000).with_speed(3.0), false);

        assert_eq!(metrics.fixes_received, 3);
        assert_eq!(metrics.speedless_fixes, 1);
        assert_eq!(metrics.track_points, 1);
    }

    #[test]
    fn test_reset_clears_all_counters() {
        let mut metrics = AppMetrics::new();
        metrics.fixes_received = 100;
        metrics.speedless_fixes = 50;
        metrics.track_points = 10;
        metrics.subscriptions_opened = 2;
        metrics.source_errors = 5;

        metrics.reset();

        assert_eq!(metrics.fixes_received, 0);
        assert_eq!(metrics.speedless_fixes, 0);
        assert_eq!(metrics.track_points, 0);
        assert_eq!(metrics.subscriptions_opened, 0);
        assert_eq!(metrics.source_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_logger_reports_every_interval() {
        let mut logger = MetricsLogger::new(Duration::from_millis(200));
        let mut metrics = AppMetrics::new();
        assert_eq!(logger.log_interval(), Duration::from_millis(200));

        let started = Instant::now();
        for _ in 0..6 {
            metrics.fixes_received += 1;
            logger.due().await;
            logger.report(&mut metrics);
            assert_eq!(metrics.fixes_received, 0);
        }

        assert_eq!(logger.reports(), 6);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1200) && elapsed < Duration::from_millis(1300));
    }
}
