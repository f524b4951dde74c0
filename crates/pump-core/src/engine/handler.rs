use std::sync::Arc;

use async_trait::async_trait;

use super::AckMode;
use super::monitor::DeadlineMonitor;
use super::state::{BatchAccumulator, RunState};
use super::termination::{StopReason, Termination};
use crate::source::{AckHandle, Message, MessageHandler};
use crate::{Result, TRACING_TARGET_ENGINE};

/// Per-message critical section of a running job.
pub(crate) struct PumpHandler {
    state: Arc<RunState>,
    termination: Termination,
    deadline: DeadlineMonitor,
    ack_mode: AckMode,
}

impl PumpHandler {
    pub fn new(
        state: Arc<RunState>,
        termination: Termination,
        deadline: DeadlineMonitor,
        ack_mode: AckMode,
    ) -> Self {
        Self {
            state,
            termination,
            deadline,
            ack_mode,
        }
    }

    /// Writes whatever is left in the batch after the stream stopped.
    pub async fn finish(&self) -> Result<u64> {
        let mut batch = self.state.lock().await;
        flush(&mut batch).await
    }

    /// Logs rows that were buffered but will never be written.
    pub async fn report_unflushed(&self) {
        let batch = self.state.lock().await;
        let unflushed = batch.unflushed();
        if unflushed == 0 {
            return;
        }

        match self.ack_mode {
            AckMode::OnAppend => tracing::error!(
                target: TRACING_TARGET_ENGINE,
                rows = unflushed,
                "Acknowledged rows were lost without being written"
            ),
            AckMode::OnFlush => tracing::warn!(
                target: TRACING_TARGET_ENGINE,
                rows = unflushed,
                "Unwritten rows were not acknowledged and will be redelivered"
            ),
        }
    }

    fn fail(&self) {
        self.termination.request(StopReason::Failed);
    }
}

#[async_trait]
impl MessageHandler for PumpHandler {
    async fn handle(&self, message: Message) -> Result<()> {
        let mut batch = self.state.lock().await;
        self.state.touch();

        let (row, handle) = message.into_parts();
        if let Err(error) = batch.append(row) {
            self.fail();
            return Err(error);
        }

        match self.ack_mode {
            AckMode::OnAppend => acknowledge(&handle).await,
            AckMode::OnFlush => batch.defer_ack(handle),
        }

        if batch.is_full()
            && let Err(error) = flush(&mut batch).await
        {
            self.fail();
            return Err(error);
        }

        self.deadline.check(&self.state, &self.termination);
        Ok(())
    }
}

async fn flush(batch: &mut BatchAccumulator) -> Result<u64> {
    let (rows, deferred) = batch.flush().await?;
    if rows > 0 {
        tracing::debug!(
            target: TRACING_TARGET_ENGINE,
            rows,
            total = batch.total(),
            flushes = batch.flushes(),
            "Batch written"
        );
    }

    for handle in &deferred {
        acknowledge(handle).await;
    }

    Ok(rows)
}

/// Acknowledges a message. A failed ack only leads to redelivery.
async fn acknowledge(handle: &AckHandle) {
    if let Err(error) = handle.ack().await {
        tracing::warn!(
            target: TRACING_TARGET_ENGINE,
            message_id = %handle.id(),
            error = %error,
            "Failed to acknowledge message"
        );
    }
}
