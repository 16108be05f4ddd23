//! Error types for the Remora client

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the execution service or object store
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Local storage I/O failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) | Self::ApiError { status: 404, .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Check if the call itself failed in a way worth repeating
    ///
    /// Network blips, timeouts, throttling (429, 408) and server errors are
    /// transient. A connection dropped while sending the request or reading
    /// the body counts as a blip. Rejections and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(e) => match e.status() {
                Some(status) => status.is_server_error() || status.as_u16() == 429,
                None => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            },
            Self::ApiError { status, .. } => {
                self.is_server_error() || *status == 408 || *status == 429
            }
            Self::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
            ),
            Self::ParseError(_)
            | Self::NotFound(_)
            | Self::InvalidRequest(_)
            | Self::InvalidConfig(_)
            | Self::InternalError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttling_and_server_errors_are_transient() {
        assert!(ClientError::api_error(429, "slow down").is_transient());
        assert!(ClientError::api_error(503, "unavailable").is_transient());
        assert!(ClientError::api_error(408, "timeout").is_transient());
    }

    #[test]
    fn test_rejections_are_not_transient() {
        assert!(!ClientError::api_error(400, "bad target").is_transient());
        assert!(!ClientError::api_error(404, "no such job").is_transient());
        assert!(!ClientError::ParseError("garbage".into()).is_transient());
    }

    #[test]
    fn test_status_classification() {
        let err = ClientError::api_error(404, "missing");
        assert!(err.is_not_found());
        assert!(!err.is_server_error());
        assert!(ClientError::api_error(502, "bad gateway").is_server_error());
    }

    #[test]
    fn test_io_classification() {
        let err = ClientError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::TimedOut, "slow disk"),
        );
        assert!(err.is_transient());

        let err = ClientError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
