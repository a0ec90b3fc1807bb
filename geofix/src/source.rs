use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{PositionFix, SourceError};

/// Rate at which a subscription delivers fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateFrequency {
    #[default]
    #[serde(rename = "1hz")]
    OneHz,
    #[serde(rename = "10hz")]
    TenHz,
}

impl UpdateFrequency {
    pub fn sample_interval(&self) -> Duration {
        match self {
            UpdateFrequency::OneHz => Duration::from_millis(1000),
            UpdateFrequency::TenHz => Duration::from_millis(100),
        }
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateFrequency::OneHz => write!(f, "1hz"),
            UpdateFrequency::TenHz => write!(f, "10hz"),
        }
    }
}

impl FromStr for UpdateFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1hz" => Ok(UpdateFrequency::OneHz),
            "10hz" => Ok(UpdateFrequency::TenHz),
            other => Err(format!("unknown update frequency '{}' (expected 1hz or 10hz)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyTier {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
    BestForNavigation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionOptions {
    pub accuracy: AccuracyTier,
    pub sample_interval: Duration,
    /// 0 disables distance-based suppression: every tick yields a fix attempt
    pub distance_filter_m: f64,
    pub allow_settings_prompt: bool,
}

impl SubscriptionOptions {
    /// Options used for journey tracking at the given rate
    pub fn for_frequency(frequency: UpdateFrequency) -> Self {
        Self {
            accuracy: AccuracyTier::BestForNavigation,
            sample_interval: frequency.sample_interval(),
            distance_filter_m: 0.0,
            allow_settings_prompt: true,
        }
    }
}

/// Releases the producer side of a subscription.
///
/// Implementations must be idempotent: releasing twice is the same as once.
pub trait SubscriptionHandle: Send + Sync {
    fn release(&mut self);
}

/// An open fix stream.
///
/// Owns both the receiving end of the stream and the handle of the producer.
/// Dropping it (or calling [`Subscription::release`]) stops the producer and
/// discards every fix still queued, so nothing is delivered afterwards.
pub struct Subscription {
    fixes: mpsc::Receiver<PositionFix>,
    handle: Box<dyn SubscriptionHandle>,
}

impl Subscription {
    pub fn new(fixes: mpsc::Receiver<PositionFix>, handle: Box<dyn SubscriptionHandle>) -> Self {
        Self { fixes, handle }
    }

    /// Wait for the next fix. `None` means the producer ended the stream.
    pub async fn next_fix(&mut self) -> Option<PositionFix> {
        self.fixes.recv().await
    }

    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.release();
        self.fixes.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Producer of position fixes.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Open a continuous fix stream.
    async fn subscribe(&self, options: SubscriptionOptions) -> Result<Subscription, SourceError>;

    /// One-shot read, independent of any open subscription.
    async fn current_fix(&self) -> Result<PositionFix, SourceError>;
}
