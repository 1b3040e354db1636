//! Error types for apipod

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate.
///
/// Only the streaming client and configuration path return these. Tool
/// execution never surfaces as `Error`: failures are encoded in a
/// [`ToolResult`](crate::types::ToolResult) with `is_error` set, so the
/// model can react to them on the next turn.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failure (connection, TLS, timeout)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error outside of tool execution
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Non-success status or error payload from the completion API
    #[error("API error: {0}")]
    Api(String),

    /// Failure while reading or assembling the event stream
    #[error("Streaming error: {0}")]
    Stream(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("missing api key");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Invalid configuration: missing api key");
    }

    #[test]
    fn test_error_api() {
        let err = Error::api("status 500: overloaded");
        assert!(matches!(err, Error::Api(_)));
        assert_eq!(err.to_string(), "API error: status 500: overloaded");
    }

    #[test]
    fn test_error_stream() {
        let err = Error::stream("connection reset mid-stream");
        assert!(matches!(err, Error::Stream(_)));
        assert_eq!(
            err.to_string(),
            "Streaming error: connection reset mid-stream"
        );
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }
    }
}
