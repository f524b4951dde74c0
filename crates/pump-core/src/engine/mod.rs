//! The pump engine.
//!
//! One [`PumpEngine`] is shared by every job in the process. Each call to
//! [`PumpEngine::run`] opens its own subscription stream, sink writer, and
//! metrics client, and keeps its state in its own lock domain.

mod handler;
mod monitor;
mod state;
mod termination;


use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tokio_util::sync::CancellationToken;

use self::handler::PumpHandler;
use self::monitor::{DeadlineMonitor, StallMonitor};
use self::state::RunState;
pub use self::termination::StopReason;
use self::termination::Termination;
use crate::metrics::{JobMetrics, MetricsProvider};
use crate::sink::SinkProvider;
use crate::source::SubscriptionProvider;
use crate::{JobSpec, PumpResult, Result, TRACING_TARGET_ENGINE};

/// Default interval between two stall checks.
pub const DEFAULT_STALL_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// When a delivered message is acknowledged to its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AckMode {
    /// Right after the row is buffered, before it is written.
    ///
    /// A failed append or flush loses the buffered rows.
    #[default]
    OnAppend,
    /// After the insert that contains the row has succeeded.
    ///
    /// A failed flush leads to redelivery instead of loss.
    OnFlush,
}

/// Explicit configuration of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Build identifier echoed in every result.
    pub release: String,
    /// Interval between two stall checks.
    pub stall_check_interval: Duration,
    /// Acknowledgement policy.
    pub ack_mode: AckMode,
}

impl EngineConfig {
    /// Creates a configuration with the given release and default settings.
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            ..Self::default()
        }
    }

    /// Sets the interval between two stall checks.
    #[must_use]
    pub fn with_stall_check_interval(mut self, interval: Duration) -> Self {
        self.stall_check_interval = interval;
        self
    }

    /// Sets the acknowledgement policy.
    #[must_use]
    pub fn with_ack_mode(mut self, ack_mode: AckMode) -> Self {
        self.ack_mode = ack_mode;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            release: "v0.0.1-default".to_owned(),
            stall_check_interval: DEFAULT_STALL_CHECK_INTERVAL,
            ack_mode: AckMode::default(),
        }
    }
}

/// Drains subscriptions into sinks in batches.
#[derive(Clone)]
pub struct PumpEngine {
    inner: Arc<PumpEngineInner>,
}

struct PumpEngineInner {
    config: EngineConfig,
    subscriptions: Arc<dyn SubscriptionProvider>,
    sinks: Arc<dyn SinkProvider>,
    metrics: Arc<dyn MetricsProvider>,
}

impl PumpEngine {
    /// Creates a new engine from its configuration and collaborators.
    pub fn new(
        config: EngineConfig,
        subscriptions: Arc<dyn SubscriptionProvider>,
        sinks: Arc<dyn SinkProvider>,
        metrics: Arc<dyn MetricsProvider>,
    ) -> Self {
        let inner = PumpEngineInner {
            config,
            subscriptions,
            sinks,
            metrics,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Runs one job to completion.
    pub async fn run(&self, spec: JobSpec) -> Result<PumpResult> {
        self.run_until(spec, CancellationToken::new()).await
    }

    /// Runs one job, stopping early if `shutdown` is cancelled.
    ///
    /// A shutdown is handled like a stall or deadline: the pending batch is
    /// written and metrics are published before the result is returned.
    #[tracing::instrument(
        name = "pump",
        skip_all,
        fields(
            job_id = %spec.id,
            subscription = %spec.source.subscription,
            target = %spec.target.qualified_name(),
        )
    )]
    pub async fn run_until(&self, spec: JobSpec, shutdown: CancellationToken) -> Result<PumpResult> {
        let context = spec.context();
        spec.validate().map_err(|e| e.with_context(&context))?;

        match self.pump(&spec, &shutdown).await {
            Ok(result) => {
                tracing::info!(
                    target: TRACING_TARGET_ENGINE,
                    message_count = result.message_count,
                    duration_seconds = result.duration_seconds,
                    stop_reason = %result.stop_reason,
                    "Pump job completed"
                );
                Ok(result)
            }
            Err(error) => {
                let error = error.with_context(&context);
                tracing::error!(
                    target: TRACING_TARGET_ENGINE,
                    kind = %error.kind(),
                    error = %error,
                    "Pump job failed"
                );
                Err(error)
            }
        }
    }

    async fn pump(&self, spec: &JobSpec, shutdown: &CancellationToken) -> Result<PumpResult> {
        let config = &self.inner.config;
        let executed_on = Timestamp::now();

        let mut stream = self
            .inner
            .subscriptions
            .open_stream(&spec.source.subscription)
            .await?;
        let writer = self.inner.sinks.open(&spec.target).await?;
        let metrics = self.inner.metrics.open().await?;

        tracing::info!(
            target: TRACING_TARGET_ENGINE,
            batch_size = spec.target.batch_size,
            max_stall = spec.source.max_stall,
            max_duration = spec.max_duration,
            ack_mode = %config.ack_mode,
            "Pump job started"
        );

        let state = Arc::new(RunState::new(writer, spec.target.batch_size));
        let termination = Termination::new(shutdown);
        let monitor = StallMonitor::spawn(
            state.clone(),
            spec.source.stall_window(),
            config.stall_check_interval,
            termination.clone(),
        );

        let handler = PumpHandler::new(
            state.clone(),
            termination.clone(),
            DeadlineMonitor::new(spec.deadline()),
            config.ack_mode,
        );

        let received = stream.receive(&handler, termination.token()).await;
        monitor.stop().await;
        let elapsed = state.elapsed();

        if let Err(error) = received {
            termination.request(StopReason::Failed);
            handler.report_unflushed().await;
            return Err(error);
        }

        let stop_reason = termination.resolve();
        handler.finish().await?;

        let message_count = state.lock().await.total();
        let duration_seconds = elapsed.as_secs();
        let job_metrics = JobMetrics {
            messages: message_count,
            duration_seconds,
        };
        job_metrics.emit(metrics.as_ref(), &spec.id).await?;

        Ok(PumpResult {
            executed_on,
            duration_seconds,
            message_count,
            request: spec.clone(),
            release: config.release.clone(),
            stop_reason,
        })
    }
}

impl std::fmt::Debug for PumpEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpEngine")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
