use std::sync::Arc;

use geofix::{
    PermissionProvider, PermissionStatus, PositionFix, PositionSource, Subscription, SubscriptionOptions,
    UpdateFrequency,
};
use tracing::{debug, info, warn};

use crate::error::TrackingError;
use crate::journey::{JourneyEvent, JourneySession, JourneySnapshot};
use crate::utilities::epoch_millis_now;

/// Subscription state. A journey is active exactly when a subscription is open.
enum TrackerState {
    Idle,
    Tracking {
        frequency: UpdateFrequency,
        subscription: Subscription,
    },
}

/// Drives a [`JourneySession`] from a position source.
///
/// Not shared between tasks: the owner serializes `start`, `stop` and fix
/// delivery (see `TrackerService`).
pub struct JourneyTracker {
    source: Arc<dyn PositionSource>,
    permissions: Arc<dyn PermissionProvider>,
    state: TrackerState,
    session: JourneySession,
    clock: fn() -> i64,
}

impl JourneyTracker {
    pub fn new(source: Arc<dyn PositionSource>, permissions: Arc<dyn PermissionProvider>) -> Self {
        Self {
            source,
            permissions,
            state: TrackerState::Idle,
            session: JourneySession::new(),
            clock: epoch_millis_now,
        }
    }

    /// Replace the wall clock used to stamp journey start times
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TrackerState::Tracking { .. })
    }

    pub fn frequency(&self) -> Option<UpdateFrequency> {
        match &self.state {
            TrackerState::Tracking { frequency, .. } => Some(*frequency),
            TrackerState::Idle => None,
        }
    }

    pub fn snapshot(&self) -> JourneySnapshot {
        self.session.snapshot(self.is_active())
    }

    /// Start a new journey.
    ///
    /// Any open subscription is released before the new one is opened. On
    /// failure the tracker is left idle and the previous statistics are kept.
    pub async fn start(&mut self, frequency: UpdateFrequency) -> Result<(), TrackingError> {
        if self.release_subscription() {
            info!("Released previous location subscription before restarting");
        }

        let options = SubscriptionOptions::for_frequency(frequency);
        debug!(?options, "Opening location subscription");
        let subscription = self.source.subscribe(options).await.map_err(|e| {
            warn!("Could not start location watching: {}", e);
            TrackingError::from(e)
        })?;

        let start_time_ms = (self.clock)();
        self.session.apply(JourneyEvent::Started { start_time_ms });
        self.state = TrackerState::Tracking { frequency, subscription };
        info!("Journey started at {} ms ({})", start_time_ms, frequency);
        Ok(())
    }

    /// Stop the journey. Returns false when there was nothing to stop.
    pub fn stop(&mut self) -> bool {
        if self.release_subscription() {
            info!(
                "Journey stopped: {} track points, average speed {:?} m/s",
                self.session.track_points().len(),
                self.session.average_speed()
            );
            true
        } else {
            false
        }
    }

    fn release_subscription(&mut self) -> bool {
        match std::mem::replace(&mut self.state, TrackerState::Idle) {
            TrackerState::Tracking { subscription, .. } => {
                subscription.release();
                self.session.apply(JourneyEvent::Stopped);
                true
            }
            TrackerState::Idle => false,
        }
    }

    /// Wait for the next fix of the open subscription.
    ///
    /// Returns `None` right away when idle, or once the source ends the stream.
    pub async fn next_fix(&mut self) -> Option<PositionFix> {
        match &mut self.state {
            TrackerState::Tracking { subscription, .. } => subscription.next_fix().await,
            TrackerState::Idle => None,
        }
    }

    pub fn handle_fix(&mut self, fix: PositionFix) {
        self.session.apply(JourneyEvent::Fix(fix));
    }

    /// One-shot location read, independent of any journey.
    pub async fn locate(&mut self) -> Result<PositionFix, TrackingError> {
        match self.source.current_fix().await {
            Ok(fix) => {
                self.session.apply(JourneyEvent::Located(fix.clone()));
                Ok(fix)
            }
            Err(e) => {
                warn!("Could not get location: {}", e);
                Err(TrackingError::NoFix(e.to_string()))
            }
        }
    }

    pub async fn permission_status(&self) -> PermissionStatus {
        self.permissions.status().await
    }

    pub async fn request_permission(&self) -> PermissionStatus {
        let status = self.permissions.request_grant().await;
        if !status.is_granted() {
            warn!("Permission denied: location permission is required for tracking");
        }
        status
    }

    /// Granted already, or granted on request.
    pub async fn ensure_permission(&self) -> Result<(), TrackingError> {
        if self.permission_status().await.is_granted() {
            return Ok(());
        }
        if self.request_permission().await.is_granted() {
            Ok(())
        } else {
            Err(TrackingError::PermissionDenied)
        }
    }
}

impl Drop for JourneyTracker {
    fn drop(&mut self) {
        self.release_subscription();
    }
}
