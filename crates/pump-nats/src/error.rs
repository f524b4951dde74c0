//! Error types and utilities for NATS operations.

use std::time::Duration;

use pump_core::ErrorKind;

/// Result type for all NATS operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for NATS operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// NATS client/connection errors
    #[error("NATS connection error: {0}")]
    Connection(#[from] async_nats::Error),

    /// Serialization errors when sending messages
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Subscription name is not `<stream>/<consumer>`
    #[error("Invalid subscription '{name}': {reason}")]
    InvalidSubscription { name: String, reason: String },

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Message delivery failed
    #[error("Message delivery failed to subject '{subject}': {reason}")]
    DeliveryFailed { subject: String, reason: String },

    /// Stream operation failed
    #[error("Stream operation failed on '{stream}': {error}")]
    StreamError { stream: String, error: String },

    /// Consumer operation failed
    #[error("Consumer '{consumer}' error: {reason}")]
    ConsumerError { consumer: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("NATS operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create an invalid subscription error
    pub fn invalid_subscription(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubscription {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a delivery failed error
    pub fn delivery_failed(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Create a stream error
    pub fn stream_error(stream: impl Into<String>, error: impl Into<String>) -> Self {
        Self::StreamError {
            stream: stream.into(),
            error: error.into(),
        }
    }

    /// Create a consumer error
    pub fn consumer_error(consumer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConsumerError {
            consumer: consumer.into(),
            reason: reason.into(),
        }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Converts into an engine error of the given kind.
    ///
    /// A malformed subscription name is always reported as a bad request.
    pub fn into_core(self, kind: ErrorKind) -> pump_core::Error {
        let kind = match self {
            Self::InvalidSubscription { .. } => ErrorKind::BadRequest,
            _ => kind,
        };

        pump_core::Error::new(kind, self.to_string()).with_source(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_subscription_is_a_bad_request() {
        let error = Error::invalid_subscription("events", "missing consumer");
        let error = error.into_core(ErrorKind::Resource);
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert!(error.message().contains("events"));
    }

    #[test]
    fn other_errors_keep_the_requested_kind() {
        let error = Error::stream_error("EVENTS", "stream not found");
        assert_eq!(error.into_core(ErrorKind::Resource).kind(), ErrorKind::Resource);
    }
}
