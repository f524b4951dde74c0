use async_trait::async_trait;
use bytes::Bytes;
use diesel::sql_types::Jsonb;
use diesel_async::RunQueryDsl;
use pump_core::ErrorKind;
use pump_core::sink::SinkWriter;

use super::{RowBuffer, TableRef};
use crate::{PgClient, PgError, TRACING_TARGET_WRITER};

/// Writes buffered JSON rows into one table with a single statement per batch.
pub struct PgTableWriter {
    client: PgClient,
    table: TableRef,
    rows: RowBuffer,
}

impl PgTableWriter {
    /// Creates a writer for `table` starting from an empty buffer.
    pub fn new(client: PgClient, table: TableRef, rows: RowBuffer) -> Self {
        Self {
            client,
            table,
            rows,
        }
    }

    #[inline]
    pub fn table(&self) -> &TableRef {
        &self.table
    }
}

#[async_trait]
impl SinkWriter for PgTableWriter {
    fn append(&mut self, row: Bytes) -> pump_core::Result<()> {
        self.rows.push(&row).map_err(|e| {
            pump_core::Error::append(format!("cannot append row to {}", self.table))
                .with_source(e)
        })
    }

    async fn insert(&mut self) -> pump_core::Result<u64> {
        if self.rows.is_empty() {
            return Ok(0);
        }

        let statement = self.rows.insert_statement(&self.table);
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(|e| e.into_core(ErrorKind::Flush))?;

        let query = diesel::sql_query(statement);
        let written = if self.rows.binds_rows() {
            query
                .bind::<Jsonb, _>(self.rows.to_json())
                .execute(&mut *conn)
                .await
        } else {
            query.execute(&mut *conn).await
        }
        .map_err(|e| PgError::from(e).into_core(ErrorKind::Flush))?;

        tracing::debug!(
            target: TRACING_TARGET_WRITER,
            table = %self.table,
            rows = written,
            "Inserted batch"
        );

        self.rows.clear();
        Ok(written as u64)
    }

    fn pending(&self) -> usize {
        self.rows.len()
    }
}

impl std::fmt::Debug for PgTableWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTableWriter")
            .field("table", &self.table)
            .field("pending", &self.rows.len())
            .finish_non_exhaustive()
    }
}
