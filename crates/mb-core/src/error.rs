//! Error types for mb-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Invalid item id: {0}")]
    InvalidItemId(String),

    #[error("Unknown region code: {0}")]
    UnknownRegion(u8),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
