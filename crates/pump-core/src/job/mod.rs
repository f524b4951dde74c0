//! Job description and result types.

mod result;
mod spec;

pub use result::PumpResult;
pub use spec::{JobSpec, MIN_MAX_STALL_SECS, SourceSpec, TargetSpec};
