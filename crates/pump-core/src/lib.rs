#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for engine lifecycle events.
///
/// Use this target for job start/finish, flushes, and terminal errors.
pub const TRACING_TARGET_ENGINE: &str = "pump_core::engine";

/// Tracing target for the stall and deadline monitors.
pub const TRACING_TARGET_MONITOR: &str = "pump_core::monitor";

/// Tracing target for metrics emission.
pub const TRACING_TARGET_METRICS: &str = "pump_core::metrics";

mod engine;
mod error;
mod job;
pub mod metrics;
pub mod sink;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use engine::{AckMode, EngineConfig, PumpEngine, StopReason};
pub use error::{BoxedError, Error, ErrorKind, JobContext, Result};
pub use job::{JobSpec, MIN_MAX_STALL_SECS, PumpResult, SourceSpec, TargetSpec};
