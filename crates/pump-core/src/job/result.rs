use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::JobSpec;
use crate::engine::StopReason;

/// Summary of a completed pump job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpResult {
    /// When the job started.
    pub executed_on: Timestamp,
    /// Whole seconds from start to the terminal event.
    pub duration_seconds: u64,
    /// Total number of messages appended to the sink.
    pub message_count: u64,
    /// The job as it was requested.
    pub request: JobSpec,
    /// Build identifier of the service that ran the job.
    pub release: String,
    /// What ended the subscription stream.
    pub stop_reason: StopReason,
}
