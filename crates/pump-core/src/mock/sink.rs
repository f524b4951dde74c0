use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::lock;
use crate::sink::{SinkProvider, SinkWriter};
use crate::{Error, Result, TargetSpec};

/// Sink that records every written batch.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    inner: Arc<Mutex<SinkLog>>,
}

#[derive(Debug, Default)]
struct SinkLog {
    batches: Vec<Vec<Bytes>>,
    opened: Vec<TargetSpec>,
    appends: u64,
    inserts: usize,
    fail_open: bool,
    fail_append_on: Option<u64>,
    fail_insert_on: Option<usize>,
}

impl MockSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every open fail with a resource error.
    pub fn fail_open(&self) {
        lock(&self.inner).fail_open = true;
    }

    /// Makes the `n`-th append (1-based) fail.
    pub fn fail_append_on(&self, n: u64) {
        lock(&self.inner).fail_append_on = Some(n);
    }

    /// Makes the `n`-th insert call (1-based) fail.
    pub fn fail_insert_on(&self, n: usize) {
        lock(&self.inner).fail_insert_on = Some(n);
    }

    /// Successfully written batches, in order.
    pub fn batches(&self) -> Vec<Vec<Bytes>> {
        lock(&self.inner).batches.clone()
    }

    /// Sizes of the successfully written batches.
    pub fn batch_sizes(&self) -> Vec<usize> {
        lock(&self.inner).batches.iter().map(Vec::len).collect()
    }

    /// Number of insert calls, failed ones included.
    pub fn insert_calls(&self) -> usize {
        lock(&self.inner).inserts
    }

    /// Targets passed to every open call.
    pub fn opened(&self) -> Vec<TargetSpec> {
        lock(&self.inner).opened.clone()
    }
}

#[async_trait]
impl SinkProvider for MockSink {
    async fn open(&self, target: &TargetSpec) -> Result<Box<dyn SinkWriter>> {
        let mut log = lock(&self.inner);
        log.opened.push(target.clone());
        if log.fail_open {
            return Err(Error::resource(format!(
                "table '{}' does not exist",
                target.qualified_name()
            )));
        }

        Ok(Box::new(MockWriter {
            sink: self.clone(),
            pending: Vec::new(),
        }))
    }
}

struct MockWriter {
    sink: MockSink,
    pending: Vec<Bytes>,
}

#[async_trait]
impl SinkWriter for MockWriter {
    fn append(&mut self, row: Bytes) -> Result<()> {
        let mut log = lock(&self.sink.inner);
        log.appends += 1;
        if log.fail_append_on == Some(log.appends) {
            return Err(Error::append("row rejected"));
        }

        self.pending.push(row);
        Ok(())
    }

    async fn insert(&mut self) -> Result<u64> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let mut log = lock(&self.sink.inner);
        log.inserts += 1;
        if log.fail_insert_on == Some(log.inserts) {
            return Err(Error::flush("insert rejected"));
        }

        let rows = std::mem::take(&mut self.pending);
        let count = rows.len() as u64;
        log.batches.push(rows);
        Ok(count)
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }
}
