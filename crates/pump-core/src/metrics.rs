//! Metrics emission abstractions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

use crate::{Result, TRACING_TARGET_METRICS};

/// Names of the observations published after a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumIter, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    /// Number of job invocations, always one per job.
    Invocations,
    /// Number of messages pumped.
    Messages,
    /// Job duration in seconds.
    Duration,
}

/// A connected metrics client.
#[async_trait]
pub trait MetricsClient: Send + Sync {
    /// Publishes one observation for the job.
    async fn publish(&self, job_id: &str, metric: MetricKind, value: u64) -> Result<()>;
}

/// Opens metrics clients.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Opens a client for one job.
    async fn open(&self) -> Result<Box<dyn MetricsClient>>;
}

/// The observations published for a successful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobMetrics {
    /// Total number of messages pumped.
    pub messages: u64,
    /// Elapsed seconds.
    pub duration_seconds: u64,
}

impl JobMetrics {
    /// Returns the observations in publication order.
    #[must_use]
    pub fn observations(&self) -> [(MetricKind, u64); 3] {
        [
            (MetricKind::Invocations, 1),
            (MetricKind::Messages, self.messages),
            (MetricKind::Duration, self.duration_seconds),
        ]
    }

    /// Publishes all observations, stopping at the first failure.
    pub async fn emit(&self, client: &dyn MetricsClient, job_id: &str) -> Result<()> {
        for (metric, value) in self.observations() {
            client.publish(job_id, metric, value).await?;
            tracing::debug!(
                target: TRACING_TARGET_METRICS,
                job_id = %job_id,
                metric = %metric,
                value,
                "Metric published"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn observations_cover_every_metric() {
        let metrics = JobMetrics {
            messages: 7,
            duration_seconds: 12,
        };

        let kinds: Vec<_> = metrics.observations().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, MetricKind::iter().collect::<Vec<_>>());
        assert_eq!(metrics.observations()[0], (MetricKind::Invocations, 1));
        assert_eq!(metrics.observations()[1], (MetricKind::Messages, 7));
    }

    #[test]
    fn metric_names() {
        assert_eq!(MetricKind::Invocations.as_ref(), "invocations");
        assert_eq!(MetricKind::Duration.to_string(), "duration");
    }
}
