//! Error types for greenguard-core.
//!
//! This module defines the errors that can occur while classifying readings,
//! parsing stream payloads and talking to the backend.
//!
//! # Error Recovery Strategies
//!
//! Nothing in this crate is allowed to take the host process down. Every
//! failure degrades to a visible-but-non-blocking state:
//!
//! | Error Type | Strategy | Surfaced as |
//! |------------|----------|-------------|
//! | [`Error::ConnectionFailed`] | Reconnect after a fixed delay | Channel status |
//! | [`Error::Transport`] | Reconnect after a fixed delay | Channel status |
//! | [`Error::InvalidMessage`] | Drop the message, keep the stream | `warn!` log only |
//! | [`Error::Json`] | Drop the message, keep the stream | `warn!` log only |
//! | [`Error::InvalidData`] | Reject the value | Returned to caller |
//! | [`Error::InvalidConfig`] | Fix configuration and restart | Returned to caller |
//! | [`Error::Cancelled`] | Stop quietly | Returned to caller |
//!
//! Missing AQI data is not an error: the recommendation engine returns
//! [`crate::Recommendations::NoData`] instead.
//!
//! ## Example: Watching the Channel
//!
//! ```ignore
//! use greenguard_core::{ChannelEvent, RealtimeChannel};
//!
//! let channel = RealtimeChannel::websocket("http://localhost:8020")?;
//! let mut events = channel.subscribe();
//! channel.connect(40.7128, -74.006)?;
//!
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         ChannelEvent::StatusChanged { status } => println!("status: {status}"),
//!         ChannelEvent::Alert { alert } => println!("alert: {}", alert.message),
//!         _ => {}
//!     }
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the classification and streaming pipeline.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The streaming connection could not be established.
    #[error("Connection to {url} failed: {reason}")]
    ConnectionFailed {
        /// The endpoint that was dialled.
        url: String,
        /// Why the attempt failed.
        reason: String,
    },

    /// The transport failed after the connection was open.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A stream payload did not have the expected shape.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// A stream payload was not valid JSON.
    #[error("Malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A value failed validation.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a connection failure for an endpoint.
    pub fn connection_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the streaming channel recovers from this error by reconnecting.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ConnectionFailed { .. } | Error::Transport(_) | Error::Timeout { .. }
        )
    }
}

impl From<greenguard_types::ParseError> for Error {
    fn from(err: greenguard_types::ParseError) -> Self {
        match err {
            greenguard_types::ParseError::InvalidValue(msg) => Error::InvalidData(msg),
            // Handle future ParseError variants (non_exhaustive)
            other => Error::InvalidData(other.to_string()),
        }
    }
}

/// Result type alias using greenguard-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection_failed("ws://localhost:8020", "connection refused");
        assert!(err.to_string().contains("ws://localhost:8020"));
        assert!(err.to_string().contains("connection refused"));

        let err = Error::InvalidMessage("missing aqi".to_string());
        assert_eq!(err.to_string(), "Invalid message: missing aqi");

        let err = Error::timeout("connect", Duration::from_secs(10));
        assert!(err.to_string().contains("connect"));
        assert!(err.to_string().contains("10s"));

        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Transport("reset".into()).is_transient());
        assert!(Error::connection_failed("ws://x", "refused").is_transient());
        assert!(!Error::InvalidMessage("x".into()).is_transient());
        assert!(!Error::Cancelled.is_transient());
        assert!(!Error::invalid_config("x").is_transient());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = greenguard_types::ParseError::InvalidValue("latitude 91".into()).into();
        assert!(matches!(err, Error::InvalidData(ref m) if m == "latitude 91"));

        let err: Error = greenguard_types::ParseError::UnknownUserType("toddler".into()).into();
        assert!(err.to_string().contains("toddler"));
    }
}
