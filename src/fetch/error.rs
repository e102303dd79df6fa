use serde_json::{json, Value};
use thiserror::Error;

/// Errors that can end an asynchronous fetch.
///
/// These never propagate out of a flow: the adapter records them as an
/// errored lifecycle context via `Value::from(&err)`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to connect or send the request
    #[error("Request to '{url}' failed: {source}")]
    ConnectionError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the total timeout
    #[error("Request to '{url}' timed out after {duration}s")]
    RequestTimeout { url: String, duration: u64 },

    /// Server answered with a non-success status
    #[error("Upstream error: {status} - {message}")]
    UpstreamError { status: u16, message: String },

    /// Response body was not valid JSON
    #[error("Failed to decode response from '{url}': {message}")]
    DecodeError { url: String, message: String },

    /// Invalid method, header or body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No tokio runtime to run the request on
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// Failure reported by a custom transport
    #[error("Transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Get error type string for the errored context payload
    pub fn error_type(&self) -> &'static str {
        match self {
            FetchError::ConnectionError { .. } => "connection_error",
            FetchError::RequestTimeout { .. } => "request_timeout",
            FetchError::UpstreamError { .. } => "upstream_error",
            FetchError::DecodeError { .. } => "decode_error",
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::NoRuntime(_) => "no_runtime",
            FetchError::Transport(_) => "transport_error",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::UpstreamError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<&FetchError> for Value {
    fn from(err: &FetchError) -> Self {
        let mut payload = json!({
            "kind": err.error_type(),
            "message": err.to_string(),
        });
        if let Some(status) = err.status() {
            payload["status"] = json!(status);
        }
        payload
    }
}

impl From<FetchError> for Value {
    fn from(err: FetchError) -> Self {
        Value::from(&err)
    }
}
