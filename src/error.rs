use std::time::Duration;
use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The Error type for run-level operations.
///
/// Per-item annotation failures never show up here; they are carried as
/// `LabelOrError::Failed` values. Only conditions that make the whole run
/// impossible (bad configuration, unreadable input, a closed admission gate)
/// surface as a `PipelineError`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Parquet error: {source}")]
    ParquetError {
        #[from]
        source: parquet::errors::ParquetError,
    },

    #[error("Arrow conversion error: {source}")]
    ArrowError {
        #[from]
        source: arrow::error::ArrowError,
    },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Admission gate closed: {0}")]
    GateClosed(String),

    #[error("Segmentation error: {0}")]
    SegmentationError(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Failure of a single request attempt against the completion endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, send/receive or HTTP status failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered, but the body was not a completion response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RequestError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RequestError::Timeout(_) | RequestError::Transport(_))
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RequestError::InvalidResponse(err.to_string())
        } else {
            RequestError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RequestError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(RequestError::Transport("connection refused".into()).is_retryable());
        assert!(!RequestError::InvalidResponse("expected value".into()).is_retryable());
    }
}
