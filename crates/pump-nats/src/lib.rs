#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "pump_nats::client";

/// Tracing target for NATS connection operations.
///
/// Use this target for logging connection establishment, reconnection, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "pump_nats::connection";

/// Tracing target for JetStream subscription operations.
pub const TRACING_TARGET_STREAM: &str = "pump_nats::stream";

/// Tracing target for metrics publication.
pub const TRACING_TARGET_METRICS: &str = "pump_nats::metrics";

mod client;
mod error;
pub mod metrics;
pub mod stream;

pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
pub use metrics::{MetricObservation, NatsMetricsProvider};
pub use stream::{NatsSubscriptionProvider, SubscriptionName};
