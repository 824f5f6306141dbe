//! Refresh error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Core error: {0}")]
    Core(#[from] mb_core::CoreError),
}

pub type RefreshResult<T> = Result<T, RefreshError>;
