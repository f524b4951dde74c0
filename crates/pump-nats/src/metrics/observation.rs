use jiff::Timestamp;
use pump_core::metrics::MetricKind;
use serde::{Deserialize, Serialize};

/// One metric value as published on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricObservation {
    /// Job the value belongs to.
    pub job_id: String,
    /// Metric name.
    pub metric: MetricKind,
    /// Observed value.
    pub value: u64,
    /// Release of the service that produced the value.
    pub release: String,
    /// When the value was published.
    pub observed_at: Timestamp,
}

impl MetricObservation {
    /// Returns the subject this observation is published on.
    pub fn subject(&self, prefix: &str) -> String {
        format!("{prefix}.{}", self.metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_payload() {
        let observation = MetricObservation {
            job_id: "job-1".into(),
            metric: MetricKind::Messages,
            value: 7,
            release: "v1.0.0".into(),
            observed_at: Timestamp::UNIX_EPOCH,
        };

        assert_eq!(observation.subject("pump.metrics"), "pump.metrics.messages");

        let json = serde_json::to_value(&observation).unwrap();
        assert_eq!(json["metric"], "messages");
        assert_eq!(json["value"], 7);
        assert_eq!(json["observed_at"], "1970-01-01T00:00:00Z");
    }
}
