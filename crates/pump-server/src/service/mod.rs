//! Application state and dependency injection.

mod config;
mod state;

pub use crate::service::config::{ServiceConfig, ServiceConfigBuilder};
pub use crate::service::state::{JobTimeLimit, ServiceState};
pub use crate::{Error, Result};
