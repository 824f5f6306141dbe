//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] mb_universalis::UpstreamError),

    #[error("Refresh error: {0}")]
    Refresh(#[from] mb_refresh::RefreshError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] mb_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
