use std::future::Future;
use std::time::Duration;

use geofix::{PermissionStatus, PositionFix, UpdateFrequency};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::app_metrics::{AppMetrics, MetricsLogger};
use crate::error::TrackingError;
use crate::journey::JourneySnapshot;
use crate::journey_tracker::JourneyTracker;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Requests served by the tracker service, each with its reply channel
pub enum TrackerCommand {
    Start {
        frequency: UpdateFrequency,
        reply: oneshot::Sender<Result<(), TrackingError>>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    Locate {
        reply: oneshot::Sender<Result<PositionFix, TrackingError>>,
    },
    Snapshot {
        reply: oneshot::Sender<JourneySnapshot>,
    },
    PermissionStatus {
        reply: oneshot::Sender<PermissionStatus>,
    },
    RequestPermission {
        reply: oneshot::Sender<PermissionStatus>,
    },
}

/// Cloneable front end of a running [`TrackerService`]
#[derive(Clone)]
pub struct TrackerClient {
    commands: mpsc::Sender<TrackerCommand>,
}

impl TrackerClient {
    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> TrackerCommand) -> Result<T, TrackingError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TrackingError::ServiceClosed)?;
        response.await.map_err(|_| TrackingError::ServiceClosed)
    }

    pub async fn start(&self, frequency: UpdateFrequency) -> Result<(), TrackingError> {
        self.call(|reply| TrackerCommand::Start { frequency, reply }).await?
    }

    /// Returns false when no journey was active
    pub async fn stop(&self) -> Result<bool, TrackingError> {
        self.call(|reply| TrackerCommand::Stop { reply }).await
    }

    pub async fn locate(&self) -> Result<PositionFix, TrackingError> {
        self.call(|reply| TrackerCommand::Locate { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<JourneySnapshot, TrackingError> {
        self.call(|reply| TrackerCommand::Snapshot { reply }).await
    }

    pub async fn permission_status(&self) -> Result<PermissionStatus, TrackingError> {
        self.call(|reply| TrackerCommand::PermissionStatus { reply }).await
    }

    pub async fn request_permission(&self) -> Result<PermissionStatus, TrackingError> {
        self.call(|reply| TrackerCommand::RequestPermission { reply }).await
    }
}

/// Owns the tracker and serializes every access to it.
///
/// Commands and fixes are handled one at a time on a single task, so the
/// tracker itself never needs locking.
pub struct TrackerService {
    tracker: JourneyTracker,
    commands: mpsc::Receiver<TrackerCommand>,
    metrics: AppMetrics,
    metrics_logger: MetricsLogger,
}

impl TrackerService {
    pub fn new(tracker: JourneyTracker, status_interval: Duration) -> (Self, TrackerClient) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let service = Self {
            tracker,
            commands: rx,
            metrics: AppMetrics::new(),
            metrics_logger: MetricsLogger::new(status_interval),
        };
        (service, TrackerClient { commands: tx })
    }

    /// Serve commands and fixes until `shutdown` completes.
    ///
    /// Returns the number of status reports written.
    pub async fn run<F>(mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut commands_open = true;
        debug!("Status report every {:?}", self.metrics_logger.log_interval());

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Tracker shutting down");
                    break;
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All tracker clients dropped");
                        commands_open = false;
                    }
                },
                fix = self.tracker.next_fix(), if self.tracker.is_active() => match fix {
                    Some(fix) => self.handle_fix(fix),
                    None => {
                        self.tracker.stop();
                        warn!("Position source ended the fix stream, journey stopped");
                    }
                },
                _ = self.metrics_logger.due() => self.log_status(),
            }
        }

        self.tracker.stop();
        self.metrics_logger.reports()
    }

    async fn handle_command(&mut self, command: TrackerCommand) {
        // a dropped reply receiver only means the caller went away
        match command {
            TrackerCommand::Start { frequency, reply } => {
                let result = self.tracker.start(frequency).await;
                match result {
                    Ok(()) => self.metrics.subscriptions_opened += 1,
                    Err(_) => self.metrics.source_errors += 1,
                }
                let _ = reply.send(result);
            }
            TrackerCommand::Stop { reply } => {
                let _ = reply.send(self.tracker.stop());
            }
            TrackerCommand::Locate { reply } => {
                let result = self.tracker.locate().await;
                if result.is_err() {
                    self.metrics.source_errors += 1;
                }
                let _ = reply.send(result);
            }
            TrackerCommand::Snapshot { reply } => {
                let _ = reply.send(self.tracker.snapshot());
            }
            TrackerCommand::PermissionStatus { reply } => {
                let _ = reply.send(self.tracker.permission_status().await);
            }
            TrackerCommand::RequestPermission { reply } => {
                let _ = reply.send(self.tracker.request_permission().await);
            }
        }
    }

    fn handle_fix(&mut self, fix: PositionFix) {
        self.metrics.record_fix(&fix, self.tracker.is_active());
        self.tracker.handle_fix(fix);
    }

    fn log_status(&mut self) {
        self.metrics_logger.report(&mut self.metrics);
        debug!(frequency = ?self.tracker.frequency(), "\n{}", self.tracker.snapshot());
    }
}
