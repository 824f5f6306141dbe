//! Upstream error types.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Connect, timeout or body read failure.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Payload did not match the expected shape.
    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl UpstreamError {
    /// Whether another attempt may succeed.
    ///
    /// Transport failures and 408/429/5xx are transient. Everything else
    /// (other 4xx, parse failures, cancellation) is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            Self::Parse(_) | Self::Cancelled | Self::InvalidRequest(_) => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Parse(_) => "parse",
            Self::Cancelled => "cancelled",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> UpstreamError {
        UpstreamError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_retry_classification() {
        assert!(UpstreamError::Transport("reset".into()).is_retryable());
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(status(408).is_retryable());

        assert!(!status(404).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!UpstreamError::Parse("bad".into()).is_retryable());
        assert!(!UpstreamError::Cancelled.is_retryable());
        assert!(!UpstreamError::InvalidRequest("x".into()).is_retryable());
    }

    #[test]
    fn test_cancelled_flag() {
        assert!(UpstreamError::Cancelled.is_cancelled());
        assert!(!status(500).is_cancelled());
        assert_eq!(UpstreamError::Cancelled.kind(), "cancelled");
    }
}
