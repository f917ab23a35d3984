//! Error types.

use thiserror::Error;

/// Why a simulation could not be started.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    #[error("simulation already running")]
    AlreadyRunning,

    #[error("route has too few points to simulate")]
    InsufficientRoute,

    #[error("invalid simulation speed or tick interval")]
    InvalidTiming,
}

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Start(#[from] StartError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX parse error: {0}")]
    Gpx(String),

    #[error("failed to spawn ticker thread: {0}")]
    Thread(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
