use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("position source unavailable: {0}")]
    Unavailable(String),
    #[error("no position fix available: {0}")]
    NoFix(String),
}
