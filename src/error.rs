use geofix::SourceError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackingError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("could not start location watching: {0}")]
    SourceUnavailable(String),
    #[error("could not get location: {0}")]
    NoFix(String),
    #[error("tracker service is not running")]
    ServiceClosed,
}

impl From<SourceError> for TrackingError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Unavailable(reason) => TrackingError::SourceUnavailable(reason),
            SourceError::NoFix(reason) => TrackingError::NoFix(reason),
        }
    }
}
