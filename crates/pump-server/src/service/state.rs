use std::sync::Arc;
use std::time::Duration;

use pump_core::{JobSpec, PumpEngine};
use pump_nats::{NatsMetricsProvider, NatsSubscriptionProvider};
use pump_postgres::PgSinkProvider;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_SERVICE;
use crate::service::{Result, ServiceConfig};

/// Longest job the service accepts, if any.
///
/// A job runs until its deadline and may then wait up to its stall window
/// plus one stall check for the message that crosses it. A job whose worst
/// case exceeds the limit would outlive the request that started it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTimeLimit(Option<Duration>);

impl JobTimeLimit {
    /// Accepts only jobs that end within `limit`.
    pub const fn new(limit: Duration) -> Self {
        Self(Some(limit))
    }

    /// Accepts jobs of any length.
    pub const fn unbounded() -> Self {
        Self(None)
    }

    /// Rejects `spec` when its worst-case run exceeds the limit.
    pub fn check(&self, spec: &JobSpec, stall_check_interval: Duration) -> Result<(), String> {
        let Some(limit) = self.0 else {
            return Ok(());
        };

        let worst_case = spec.deadline() + spec.source.stall_window() + stall_check_interval;
        if worst_case > limit {
            return Err(format!(
                "max_duration plus max_stall may run {}s, longer than the {}s request limit",
                worst_case.as_secs(),
                limit.as_secs()
            ));
        }
        Ok(())
    }
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    engine: PumpEngine,
    shutdown: CancellationToken,
    job_time_limit: JobTimeLimit,
}

impl ServiceState {
    /// Creates the state around an already built engine.
    pub fn new(engine: PumpEngine) -> Self {
        Self {
            engine,
            shutdown: CancellationToken::new(),
            job_time_limit: JobTimeLimit::unbounded(),
        }
    }

    /// Rejects jobs that could run longer than `limit`.
    ///
    /// Set this to the request timeout so a job never outlives its request.
    pub fn with_job_time_limit(mut self, limit: Duration) -> Self {
        self.job_time_limit = JobTimeLimit::new(limit);
        self
    }

    /// Initializes application state from configuration.
    ///
    /// Connects to NATS and Postgres and wires them into the engine.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let nats = config.connect_nats().await?;
        let postgres = config.connect_postgres().await?;

        let engine = PumpEngine::new(
            config.engine_config(),
            Arc::new(NatsSubscriptionProvider::new(nats.clone())),
            Arc::new(PgSinkProvider::new(postgres)),
            Arc::new(NatsMetricsProvider::new(nats, &config.release)),
        );

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            release = %config.release,
            ack_mode = %config.ack_mode,
            "Service state initialized"
        );

        Ok(Self::new(engine))
    }

    /// Returns the build identifier reported by the service.
    #[inline]
    pub fn release(&self) -> &str {
        &self.engine.config().release
    }

    /// Returns the token that stops every running job when cancelled.
    ///
    /// Cancelled jobs still flush their pending batch and publish metrics.
    #[inline]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(engine: PumpEngine);
impl_di!(shutdown: CancellationToken);
impl_di!(job_time_limit: JobTimeLimit);

#[cfg(test)]
mod tests {
    use pump_core::{SourceSpec, TargetSpec};

    use super::*;

    fn spec(max_duration: u64, max_stall: u64) -> JobSpec {
        JobSpec {
            id: "job-1".into(),
            source: SourceSpec {
                subscription: "EVENTS/pump".into(),
                max_stall,
            },
            target: TargetSpec {
                dataset: "public".into(),
                table: "events".into(),
                batch_size: 10,
                ignore_unknowns: false,
            },
            max_duration,
        }
    }

    #[test]
    fn limit_counts_the_stall_tail() {
        let interval = Duration::from_secs(5);
        let limit = JobTimeLimit::new(Duration::from_secs(60));

        assert!(limit.check(&spec(50, 5), interval).is_ok());
        assert!(limit.check(&spec(50, 6), interval).is_err());
        assert!(limit.check(&spec(55, 5), interval).is_err());
    }

    #[test]
    fn unbounded_limit_accepts_any_job() {
        let limit = JobTimeLimit::default();
        assert!(limit.check(&spec(86_400, 600), Duration::from_secs(5)).is_ok());
    }
}
