//! In-memory collaborators for testing the engine.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! pump-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use pump_core::mock::{MockMetrics, MockSink, MockSubscription};
//!
//! let subscription = MockSubscription::with_messages(7, Duration::from_millis(100));
//! let sink = MockSink::default();
//! let metrics = MockMetrics::default();
//! let engine = mock::engine(&subscription, &sink, &metrics, EngineConfig::default());
//! ```

mod metrics;
mod sink;
mod source;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use metrics::{MockMetrics, Observation};
pub use sink::MockSink;
pub use source::{Delivery, MockSubscription};

use crate::{EngineConfig, PumpEngine};

/// Builds an engine wired to the given mocks.
pub fn engine(
    subscription: &MockSubscription,
    sink: &MockSink,
    metrics: &MockMetrics,
    config: EngineConfig,
) -> PumpEngine {
    PumpEngine::new(
        config,
        Arc::new(subscription.clone()),
        Arc::new(sink.clone()),
        Arc::new(metrics.clone()),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
