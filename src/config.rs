use geofix::{PermissionStatus, UpdateFrequency};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub position_source: SourceConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory where log files will be stored
    pub directory: String,
    /// Log file name prefix (date will be appended)
    pub file_prefix: String,
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: "./logs".to_string(),
            file_prefix: "journey_tracker".to_string(),
            level: "info".to_string(),
        }
    }
}

/// Where fixes come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic ride along a straight line
    Simulated {
        start_latitude: f64,
        start_longitude: f64,
        speed_ms: f64,
        heading_deg: f64,
    },
    /// Fixes replayed from a JSON-lines file
    Replay { path: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulated {
            start_latitude: 45.4642,
            start_longitude: 9.19,
            speed_ms: 5.0,
            heading_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub frequency: UpdateFrequency,
    /// Start a journey as soon as the tracker is up
    pub auto_start: bool,
    /// Interval between metrics and status log lines
    pub status_log_seconds: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frequency: UpdateFrequency::OneHz,
            auto_start: false,
            status_log_seconds: 60,
        }
    }
}

impl TrackingConfig {
    pub fn status_log_interval(&self) -> Duration {
        Duration::from_secs(self.status_log_seconds.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionConfig {
    /// Status reported before any request is made
    pub initial: PermissionStatus,
    /// Outcome of a grant request
    pub grant_on_request: bool,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            initial: PermissionStatus::Undetermined,
            grant_on_request: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub enabled: bool,
    pub port: u16,
    /// Served at `/` when set
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            static_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.position_source {
            SourceConfig::Simulated { start_latitude, start_longitude, speed_ms, .. } => {
                if !(-90.0..=90.0).contains(start_latitude) {
                    return Err(format!("Invalid simulated start latitude: {}", start_latitude));
                }
                if !(-180.0..=180.0).contains(start_longitude) {
                    return Err(format!("Invalid simulated start longitude: {}", start_longitude));
                }
                if *speed_ms < 0.0 {
                    return Err(format!("Invalid simulated speed: {} m/s", speed_ms));
                }
            }
            SourceConfig::Replay { path } => {
                if path.trim().is_empty() {
                    return Err("Replay source needs a file path".to_string());
                }
            }
        }
        if self.web.enabled && self.web.port == 0 {
            return Err("Web port must not be 0".to_string());
        }
        Ok(())
    }
}
