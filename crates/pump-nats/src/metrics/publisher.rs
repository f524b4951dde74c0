use async_trait::async_trait;
use jiff::Timestamp;
use pump_core::ErrorKind;
use pump_core::metrics::{MetricKind, MetricsClient, MetricsProvider};

use super::MetricObservation;
use crate::{Error, NatsClient, TRACING_TARGET_METRICS};

/// Publishes job metrics as JSON documents on NATS subjects.
#[derive(Debug, Clone)]
pub struct NatsMetricsProvider {
    client: NatsClient,
    release: String,
}

impl NatsMetricsProvider {
    /// Creates a new provider tagging every observation with `release`.
    pub fn new(client: NatsClient, release: impl Into<String>) -> Self {
        Self {
            client,
            release: release.into(),
        }
    }
}

#[async_trait]
impl MetricsProvider for NatsMetricsProvider {
    async fn open(&self) -> pump_core::Result<Box<dyn MetricsClient>> {
        if !self.client.is_connected() {
            return Err(pump_core::Error::resource("NATS connection is not established"));
        }

        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl MetricsClient for NatsMetricsProvider {
    async fn publish(&self, job_id: &str, metric: MetricKind, value: u64) -> pump_core::Result<()> {
        let observation = MetricObservation {
            job_id: job_id.to_owned(),
            metric,
            value,
            release: self.release.clone(),
            observed_at: Timestamp::now(),
        };

        let subject = observation.subject(self.client.config().metrics_subject());
        let payload = serde_json::to_vec(&observation)
            .map_err(|e| Error::from(e).into_core(ErrorKind::Metrics))?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| e.into_core(ErrorKind::Metrics))?;

        tracing::trace!(
            target: TRACING_TARGET_METRICS,
            subject = %subject,
            job_id = %job_id,
            value,
            "Published metric"
        );

        Ok(())
    }
}
