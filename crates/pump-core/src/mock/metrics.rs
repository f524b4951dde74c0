use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::lock;
use crate::metrics::{MetricKind, MetricsClient, MetricsProvider};
use crate::{Error, Result};

/// One recorded metric observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub job_id: String,
    pub metric: MetricKind,
    pub value: u64,
}

/// Metrics sink that records every observation.
#[derive(Debug, Clone, Default)]
pub struct MockMetrics {
    inner: Arc<Mutex<MetricsLog>>,
}

#[derive(Debug, Default)]
struct MetricsLog {
    observations: Vec<Observation>,
    fail_open: bool,
    fail_publish: bool,
}

impl MockMetrics {
    /// Creates an empty metrics sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every open fail with a resource error.
    pub fn fail_open(&self) {
        lock(&self.inner).fail_open = true;
    }

    /// Makes every publish fail.
    pub fn fail_publish(&self) {
        lock(&self.inner).fail_publish = true;
    }

    /// Recorded observations, in publication order.
    pub fn observations(&self) -> Vec<Observation> {
        lock(&self.inner).observations.clone()
    }

    /// Values recorded for one metric.
    pub fn values(&self, metric: MetricKind) -> Vec<u64> {
        lock(&self.inner)
            .observations
            .iter()
            .filter(|o| o.metric == metric)
            .map(|o| o.value)
            .collect()
    }
}

#[async_trait]
impl MetricsProvider for MockMetrics {
    async fn open(&self) -> Result<Box<dyn MetricsClient>> {
        if lock(&self.inner).fail_open {
            return Err(Error::resource("metrics client unavailable"));
        }

        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl MetricsClient for MockMetrics {
    async fn publish(&self, job_id: &str, metric: MetricKind, value: u64) -> Result<()> {
        let mut log = lock(&self.inner);
        if log.fail_publish {
            return Err(Error::metrics(format!("cannot publish '{metric}'")));
        }

        log.observations.push(Observation {
            job_id: job_id.to_owned(),
            metric,
            value,
        });
        Ok(())
    }
}
