use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use geofix::{
    FixStreamReader, PermissionProvider, PermissionStatus, PositionFix, PositionSource, SourceError, Subscription,
    SubscriptionHandle, SubscriptionOptions,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{PermissionConfig, SourceConfig};
use crate::utilities::epoch_millis_now;

const FIX_CHANNEL_CAPACITY: usize = 64;
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Handle of a spawned emitter task, aborted on release
struct TaskHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle for TaskHandle {
    fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn build_source(config: &SourceConfig) -> Arc<dyn PositionSource> {
    match config {
        SourceConfig::Simulated { start_latitude, start_longitude, speed_ms, heading_deg } => {
            Arc::new(SimulatedSource::new(*start_latitude, *start_longitude, *speed_ms, *heading_deg))
        }
        SourceConfig::Replay { path } => Arc::new(ReplaySource::new(path)),
    }
}

// ========== Replay ==========

/// Replays fixes recorded in a JSON-lines file, one per sample interval.
pub struct ReplaySource {
    path: PathBuf,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Vec<PositionFix>, SourceError> {
        let file = File::open(&self.path)
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        let mut reader = FixStreamReader::new();
        let fixes = reader
            .read_all(BufReader::new(file))
            .map_err(|e| SourceError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        if reader.malformed_lines() > 0 {
            warn!("{} malformed lines skipped in {}", reader.malformed_lines(), self.path.display());
        }
        Ok(fixes)
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    async fn subscribe(&self, options: SubscriptionOptions) -> Result<Subscription, SourceError> {
        let fixes = self.load()?;
        if fixes.is_empty() {
            return Err(SourceError::Unavailable(format!("{}: no fixes to replay", self.path.display())));
        }
        info!("Replaying {} fixes from {}", fixes.len(), self.path.display());

        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        let interval = options.sample_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for fix in fixes {
                ticker.tick().await;
                if tx.send(fix).await.is_err() {
                    return;
                }
            }
            debug!("Replay finished");
        });
        Ok(Subscription::new(rx, Box::new(TaskHandle { task: Some(task) })))
    }

    async fn current_fix(&self) -> Result<PositionFix, SourceError> {
        self.load()?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NoFix(format!("{}: file holds no fixes", self.path.display())))
    }
}

// ========== Simulation ==========

#[derive(Debug, Clone, Copy, PartialEq)]
struct SimulatedRide {
    latitude: f64,
    longitude: f64,
    speed_ms: f64,
    heading_deg: f64,
}

impl SimulatedRide {
    /// Move along the heading for `elapsed`, flat-earth approximation
    fn advance(&mut self, elapsed: Duration) {
        let distance_m = self.speed_ms * elapsed.as_secs_f64();
        let heading = self.heading_deg.to_radians();
        let meters_per_degree_lon = METERS_PER_DEGREE * self.latitude.to_radians().cos().max(1e-6);
        self.latitude += distance_m * heading.cos() / METERS_PER_DEGREE;
        self.longitude += distance_m * heading.sin() / meters_per_degree_lon;
    }

    fn fix(&self, capture_time_ms: i64) -> PositionFix {
        PositionFix::new(self.latitude, self.longitude, capture_time_ms)
            .with_speed(self.speed_ms)
            .with_heading(self.heading_deg)
            .with_accuracy(3.0)
    }
}

/// Synthesises a ride along a straight line at constant speed.
pub struct SimulatedSource {
    ride: Arc<Mutex<SimulatedRide>>,
}

impl SimulatedSource {
    pub fn new(latitude: f64, longitude: f64, speed_ms: f64, heading_deg: f64) -> Self {
        Self {
            ride: Arc::new(Mutex::new(SimulatedRide { latitude, longitude, speed_ms, heading_deg })),
        }
    }

    fn current(&self) -> Result<SimulatedRide, SourceError> {
        self.ride
            .lock()
            .map(|ride| *ride)
            .map_err(|_| SourceError::Unavailable("simulation state poisoned".to_string()))
    }
}

#[async_trait]
impl PositionSource for SimulatedSource {
    async fn subscribe(&self, options: SubscriptionOptions) -> Result<Subscription, SourceError> {
        self.current()?;
        let (tx, rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        let ride = self.ride.clone();
        let interval = options.sample_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let fix = match ride.lock() {
                    Ok(mut ride) => {
                        ride.advance(interval);
                        ride.fix(epoch_millis_now())
                    }
                    Err(_) => return,
                };
                if tx.send(fix).await.is_err() {
                    return;
                }
            }
        });
        info!("Simulated ride started, one fix every {:?}", interval);
        Ok(Subscription::new(rx, Box::new(TaskHandle { task: Some(task) })))
    }

    async fn current_fix(&self) -> Result<PositionFix, SourceError> {
        let ride = self.current().map_err(|e| SourceError::NoFix(e.to_string()))?;
        Ok(ride.fix(epoch_millis_now()))
    }
}

// ========== Permissions ==========

/// Permission provider answering from configuration.
///
/// The outcome of a grant request sticks for the lifetime of the process.
pub struct ConfiguredPermissions {
    status: Mutex<PermissionStatus>,
    grant_on_request: bool,
}

impl ConfiguredPermissions {
    pub fn new(config: &PermissionConfig) -> Self {
        Self {
            status: Mutex::new(config.initial),
            grant_on_request: config.grant_on_request,
        }
    }
}

#[async_trait]
impl PermissionProvider for ConfiguredPermissions {
    async fn status(&self) -> PermissionStatus {
        match self.status.lock() {
            Ok(status) => *status,
            Err(_) => PermissionStatus::Denied,
        }
    }

    async fn request_grant(&self) -> PermissionStatus {
        let outcome = if self.grant_on_request {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        if let Ok(mut status) = self.status.lock() {
            *status = outcome;
        }
        info!("Location permission {}", outcome);
        outcome
    }
}
