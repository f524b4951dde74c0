#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging.

/// Tracing target for request handlers.
pub const TRACING_TARGET_HANDLER: &str = "pump_server::handler";

/// Tracing target for service state initialization.
pub const TRACING_TARGET_SERVICE: &str = "pump_server::service";

mod error;

pub mod handler;
pub mod middleware;
pub mod service;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};
