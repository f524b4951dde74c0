//! Job metrics published on NATS subjects.

mod observation;
mod publisher;

pub use observation::MetricObservation;
pub use publisher::NatsMetricsProvider;
