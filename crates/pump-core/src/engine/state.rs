use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::Result;
use crate::sink::SinkWriter;
use crate::source::AckHandle;

/// Shared state of one running job.
///
/// The accumulator is guarded by a single mutex held for each message's
/// critical section. The last delivery time is also published through an
/// atomic so the stall monitor never takes the lock.
pub(crate) struct RunState {
    started: Instant,
    last_message_ms: AtomicU64,
    batch: Mutex<BatchAccumulator>,
}

impl RunState {
    pub fn new(writer: Box<dyn SinkWriter>, batch_size: usize) -> Self {
        Self {
            started: Instant::now(),
            last_message_ms: AtomicU64::new(0),
            batch: Mutex::new(BatchAccumulator::new(writer, batch_size)),
        }
    }

    /// Time since the job started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records a delivery at the current instant.
    pub fn touch(&self) {
        let millis = u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_message_ms.store(millis, Ordering::Release);
    }

    /// Time since the most recent delivery, or since the start.
    pub fn idle(&self) -> Duration {
        let last = Duration::from_millis(self.last_message_ms.load(Ordering::Acquire));
        self.elapsed().saturating_sub(last)
    }

    pub async fn lock(&self) -> MutexGuard<'_, BatchAccumulator> {
        self.batch.lock().await
    }
}

/// Pending rows and the counters that describe them.
pub(crate) struct BatchAccumulator {
    writer: Box<dyn SinkWriter>,
    batch_size: usize,
    in_batch: usize,
    total: u64,
    flushes: u64,
    deferred: Vec<AckHandle>,
}

impl BatchAccumulator {
    fn new(writer: Box<dyn SinkWriter>, batch_size: usize) -> Self {
        Self {
            writer,
            batch_size,
            in_batch: 0,
            total: 0,
            flushes: 0,
            deferred: Vec::new(),
        }
    }

    /// Buffers one row. Counters only move when the writer accepts it.
    pub fn append(&mut self, row: Bytes) -> Result<()> {
        self.writer.append(row)?;
        self.in_batch += 1;
        self.total += 1;
        Ok(())
    }

    /// Holds an acknowledgement until the batch is written.
    pub fn defer_ack(&mut self, handle: AckHandle) {
        self.deferred.push(handle);
    }

    pub fn is_full(&self) -> bool {
        self.in_batch >= self.batch_size
    }

    /// Writes the pending rows. An empty batch does not reach the sink.
    ///
    /// Returns the number of rows written together with the acknowledgements
    /// that were waiting on them.
    pub async fn flush(&mut self) -> Result<(u64, Vec<AckHandle>)> {
        if self.in_batch == 0 {
            return Ok((0, Vec::new()));
        }

        let rows = self.writer.insert().await?;
        self.in_batch = 0;
        self.flushes += 1;
        Ok((rows, std::mem::take(&mut self.deferred)))
    }

    /// Rows the writer still holds without having written them.
    pub fn unflushed(&self) -> usize {
        self.writer.pending()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
