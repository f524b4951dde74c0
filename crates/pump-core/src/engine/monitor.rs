use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::state::RunState;
use super::termination::{StopReason, Termination};
use crate::TRACING_TARGET_MONITOR;

/// Background task that stops a job whose subscription went quiet.
///
/// Ticks every `period`, compares the time since the last delivery with the
/// quiescence window, and requests termination once it is exceeded. The
/// monitor exits after firing and is not re-armed.
pub(crate) struct StallMonitor {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl StallMonitor {
    pub fn spawn(
        state: Arc<RunState>,
        window: Duration,
        period: Duration,
        termination: Termination,
    ) -> Self {
        let stop = CancellationToken::new();
        let cancelled = stop.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let idle = state.idle();
                        if idle > window {
                            tracing::info!(
                                target: TRACING_TARGET_MONITOR,
                                idle_ms = idle.as_millis() as u64,
                                window_secs = window.as_secs(),
                                "Subscription stalled, stopping job"
                            );
                            termination.request(StopReason::Stalled);
                            break;
                        }
                    }
                }
            }
        });

        Self { stop, handle }
    }

    /// Stops the monitor and waits for it to exit.
    pub async fn stop(self) {
        self.stop.cancel();
        if let Err(error) = self.handle.await {
            tracing::warn!(
                target: TRACING_TARGET_MONITOR,
                error = %error,
                "Stall monitor exited abnormally"
            );
        }
    }
}

/// Inline check of the job's wall-clock ceiling.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DeadlineMonitor {
    limit: Duration,
}

impl DeadlineMonitor {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// Requests termination if the job has run past its ceiling.
    pub fn check(&self, state: &RunState, termination: &Termination) -> bool {
        let elapsed = state.elapsed();
        if elapsed <= self.limit {
            return false;
        }

        if termination.request(StopReason::Deadline) {
            tracing::info!(
                target: TRACING_TARGET_MONITOR,
                elapsed_ms = elapsed.as_millis() as u64,
                limit_secs = self.limit.as_secs(),
                "Job reached its maximum duration, stopping job"
            );
        }

        true
    }
}
