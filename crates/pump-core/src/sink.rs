//! Tabular sink abstractions.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Result, TargetSpec};

/// A session writing rows into one table.
///
/// Rows are buffered by [`append`](SinkWriter::append) and written by
/// [`insert`](SinkWriter::insert).
#[async_trait]
pub trait SinkWriter: Send {
    /// Buffers one row payload in memory without any I/O.
    fn append(&mut self, row: Bytes) -> Result<()>;

    /// Writes every buffered row and clears the buffer on success.
    ///
    /// Returns the number of rows written. An empty buffer is a no-op.
    async fn insert(&mut self) -> Result<u64>;

    /// Returns the number of buffered rows.
    fn pending(&self) -> usize;
}

/// Opens sink writers for a target table.
#[async_trait]
pub trait SinkProvider: Send + Sync {
    /// Opens a writer for the table described by `target`.
    async fn open(&self, target: &TargetSpec) -> Result<Box<dyn SinkWriter>>;
}
