//! Error types for the camera link and analysis pipeline.
//!
//! All errors implement `std::error::Error` and carry enough context for the
//! embedding application to decide on a recovery action. Nothing here is fatal
//! to the process: connection failures are recovered by reconnecting, pipeline
//! failures by re-triggering the analysis.
//!
//! ## Error Categories
//!
//! - **Connection**: TCP connect/read failures on the camera or command link
//! - **Protocol**: invalid frame framing (non-fatal, absorbed by the receiver)
//! - **Transport / Status**: HTTP-level failures against the analysis API
//! - **Api / Decode**: the analysis service answered but the payload is unusable
//! - **Timeout / Cancelled**: deadline and cancellation outcomes

use std::time::Duration;
use thiserror::Error;

/// Result type alias for mycoscope operations.
pub type Result<T, E = VisionError> = std::result::Result<T, E>;

/// Main error type for camera-link and analysis operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VisionError {
    #[error("connection failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("protocol violation: {details}")]
    Protocol { details: String },

    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("transport error during {context}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context} returned HTTP status {status}")]
    Status { context: String, status: reqwest::StatusCode },

    #[error("analysis API rejected {context}: {reason}")]
    Api { context: String, reason: String },

    #[error("decode error in {context}: {details}")]
    Decode { context: String, details: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl VisionError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            VisionError::Connection { .. } => true,
            VisionError::Timeout { .. } => true,
            VisionError::Transport { .. } => true,
            VisionError::Status { status, .. } => status.is_server_error(),
            VisionError::Protocol { .. } => false,
            VisionError::Api { .. } => false,
            VisionError::Decode { .. } => false,
            VisionError::Cancelled => false,
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        VisionError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        VisionError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for framing violations.
    pub fn protocol_violation(details: impl Into<String>) -> Self {
        VisionError::Protocol { details: details.into() }
    }

    /// Helper constructor for HTTP transport errors with call context.
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        VisionError::Transport { context: context.into(), source }
    }

    /// Helper constructor for non-success HTTP statuses.
    pub fn status(context: impl Into<String>, status: reqwest::StatusCode) -> Self {
        VisionError::Status { context: context.into(), status }
    }

    /// Helper constructor for application-level API rejections.
    pub fn api(context: impl Into<String>, reason: impl Into<String>) -> Self {
        VisionError::Api { context: context.into(), reason: reason.into() }
    }

    /// Helper constructor for payload decode failures.
    pub fn decode(context: impl Into<String>, details: impl Into<String>) -> Self {
        VisionError::Decode { context: context.into(), details: details.into() }
    }
}

impl From<std::io::Error> for VisionError {
    fn from(err: std::io::Error) -> Self {
        VisionError::Connection {
            reason: "socket I/O failed".to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_contain_their_context(
                reason in ".*",
                details in ".*",
                duration_ms in 1u64..60_000u64
            ) {
                let connection = VisionError::connection_failed(reason.clone());
                let protocol = VisionError::protocol_violation(details.clone());
                let timeout = VisionError::Timeout { duration: Duration::from_millis(duration_ms) };

                prop_assert!(connection.to_string().contains(&reason));
                prop_assert!(protocol.to_string().contains(&details));
                prop_assert!(!timeout.to_string().is_empty());
            }

            #[test]
            fn io_conversion_preserves_source_message(message in ".*") {
                let io_err = std::io::Error::other(message.clone());
                let converted: VisionError = io_err.into();
                match converted {
                    VisionError::Connection { source: Some(source), .. } => {
                        prop_assert_eq!(source.to_string(), message);
                    }
                    _ => prop_assert!(false, "expected Connection error from io::Error"),
                }
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<VisionError>();

        let error = VisionError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retryable_classification() {
        assert!(VisionError::connection_failed("camera unreachable").is_retryable());
        assert!(VisionError::Timeout { duration: Duration::from_secs(3) }.is_retryable());
        assert!(VisionError::status("status poll", reqwest::StatusCode::BAD_GATEWAY).is_retryable());

        assert!(!VisionError::status("upload", reqwest::StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!VisionError::protocol_violation("zero-length frame").is_retryable());
        assert!(!VisionError::api("upload", "code 4000").is_retryable());
        assert!(!VisionError::decode("result", "missing field").is_retryable());
        assert!(!VisionError::Cancelled.is_retryable());
    }
}
