use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Grants access to location data.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current grant status, no side effects.
    async fn status(&self) -> PermissionStatus;

    /// Ask for a grant. May prompt the user; never returns `Undetermined`.
    async fn request_grant(&self) -> PermissionStatus;
}
