use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, JobContext, Result};

/// Lowest accepted quiescence window, in seconds.
pub const MIN_MAX_STALL_SECS: u64 = 5;

/// Describes a single pump invocation.
///
/// A job is created once per request and never mutated. It names the
/// subscription to drain, the table to write into, and the limits that
/// bound the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job identifier, used as the metrics and tracing key.
    #[serde(default)]
    pub id: String,
    /// Where messages are read from.
    pub source: SourceSpec,
    /// Where rows are written to.
    pub target: TargetSpec,
    /// Hard wall-clock ceiling for the whole job, in seconds.
    pub max_duration: u64,
}

/// Subscription side of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Name of an existing subscription.
    pub subscription: String,
    /// Seconds without a message after which the job stops.
    pub max_stall: u64,
}

/// Sink side of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Dataset (schema) holding the target table.
    pub dataset: String,
    /// Name of an existing table.
    pub table: String,
    /// Number of buffered rows that triggers a flush.
    pub batch_size: usize,
    /// Whether the sink drops fields it does not know instead of failing.
    #[serde(default)]
    pub ignore_unknowns: bool,
}

impl JobSpec {
    /// Checks the job for missing or out-of-range fields.
    ///
    /// Resource existence is not checked here; that happens when the
    /// engine opens the subscription and the sink.
    pub fn validate(&self) -> Result<()> {
        if self.source.subscription.trim().is_empty() {
            return Err(Error::bad_request("source.subscription is required"));
        }

        if self.source.max_stall < MIN_MAX_STALL_SECS {
            return Err(Error::bad_request(format!(
                "source.max_stall must be at least {MIN_MAX_STALL_SECS} seconds, got {}",
                self.source.max_stall
            )));
        }

        if self.target.dataset.trim().is_empty() {
            return Err(Error::bad_request("target.dataset is required"));
        }

        if self.target.table.trim().is_empty() {
            return Err(Error::bad_request("target.table is required"));
        }

        if self.target.batch_size == 0 {
            return Err(Error::bad_request("target.batch_size must be positive"));
        }

        if self.max_duration == 0 {
            return Err(Error::bad_request("max_duration must be positive"));
        }

        Ok(())
    }

    /// Returns the wall-clock ceiling as a [`Duration`].
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.max_duration)
    }

    /// Returns the identifiers attached to terminal errors.
    #[must_use]
    pub fn context(&self) -> JobContext {
        JobContext {
            job_id: self.id.clone(),
            subscription: self.source.subscription.clone(),
            target: self.target.qualified_name(),
        }
    }
}

impl SourceSpec {
    /// Returns the quiescence window as a [`Duration`].
    #[must_use]
    pub fn stall_window(&self) -> Duration {
        Duration::from_secs(self.max_stall)
    }
}

impl TargetSpec {
    /// Returns the table name in `dataset.table` form.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.dataset, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn job() -> JobSpec {
        JobSpec {
            id: "job-1".into(),
            source: SourceSpec {
                subscription: "EVENTS/pump".into(),
                max_stall: 30,
            },
            target: TargetSpec {
                dataset: "public".into(),
                table: "events".into(),
                batch_size: 100,
                ignore_unknowns: false,
            },
            max_duration: 300,
        }
    }

    #[test]
    fn valid_job_passes() {
        assert!(job().validate().is_ok());
    }

    #[test]
    fn stall_floor_is_enforced() {
        let mut spec = job();
        spec.source.max_stall = 4;
        let error = spec.validate().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::BadRequest);

        spec.source.max_stall = MIN_MAX_STALL_SECS;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn required_fields_are_checked() {
        let mut spec = job();
        spec.source.subscription = "  ".into();
        assert!(spec.validate().is_err());

        let mut spec = job();
        spec.target.dataset.clear();
        assert!(spec.validate().is_err());

        let mut spec = job();
        spec.target.table.clear();
        assert!(spec.validate().is_err());

        let mut spec = job();
        spec.target.batch_size = 0;
        assert!(spec.validate().is_err());

        let mut spec = job();
        spec.max_duration = 0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn empty_id_is_allowed() {
        let mut spec = job();
        spec.id.clear();
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn deserializes_nested_schema() {
        let body = r#"{
            "source": { "subscription": "EVENTS/pump", "max_stall": 10 },
            "target": { "dataset": "public", "table": "events", "batch_size": 3 },
            "max_duration": 60
        }"#;

        let spec: JobSpec = serde_json::from_str(body).unwrap();
        assert_eq!(spec.id, "");
        assert!(!spec.target.ignore_unknowns);
        assert_eq!(spec.target.qualified_name(), "public.events");
        assert_eq!(spec.source.stall_window(), Duration::from_secs(10));
        assert_eq!(spec.deadline(), Duration::from_secs(60));
    }
}
