//! Error types for the trace observability SDK

use thiserror::Error;

/// Main error type for trace conversion and backend operations
#[derive(Error, Debug)]
pub enum TraceError {
    /// Runtime result could not be normalized (missing required structure)
    #[error("Malformed trace: {message}")]
    MalformedTrace {
        /// Error message
        message: String,
        /// Raw result data that failed to normalize
        data: Option<serde_json::Value>,
    },

    /// JSON decode error when parsing runtime output or backend responses
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Backend request failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// API key rejected by the backend
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session was already permanently closed
    #[error("Session {0} is closed")]
    SessionClosed(String),

    /// Session not known to the backend
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session lookup did not complete within the caller's deadline
    #[error("Session lookup timed out after {waited_ms}ms")]
    SessionLookupTimeout {
        /// How long the lookup waited before giving up
        waited_ms: u64,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, TraceError>;

impl TraceError {
    /// Create a malformed trace error
    pub fn malformed_trace(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MalformedTrace {
            message: msg.into(),
            data,
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a session closed error
    pub fn session_closed(session_id: impl Into<String>) -> Self {
        Self::SessionClosed(session_id.into())
    }

    /// Create a session not found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
