use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::sql_types::Text;
use diesel_async::RunQueryDsl;
use pump_core::sink::{SinkProvider, SinkWriter};
use pump_core::{ErrorKind, TargetSpec};

use super::{PgTableWriter, RowBuffer, TableRef};
use crate::{PgClient, PgError, PgResult, TRACING_TARGET_WRITER};

const COLUMNS_QUERY: &str = "SELECT column_name::text AS column_name \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 \
     ORDER BY ordinal_position";

#[derive(QueryableByName)]
struct ColumnName {
    #[diesel(sql_type = Text)]
    column_name: String,
}

/// Opens table writers against a PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PgSinkProvider {
    client: PgClient,
}

impl PgSinkProvider {
    /// Creates a new provider over a pooled client.
    pub fn new(client: PgClient) -> Self {
        Self { client }
    }

    /// Returns the columns of `table` in ordinal order.
    ///
    /// An empty list means the table does not exist or is not visible.
    pub async fn columns(&self, table: &TableRef) -> PgResult<Vec<String>> {
        let mut conn = self.client.get_connection().await?;

        let rows: Vec<ColumnName> = diesel::sql_query(COLUMNS_QUERY)
            .bind::<Text, _>(table.schema())
            .bind::<Text, _>(table.table())
            .load(&mut *conn)
            .await
            .map_err(PgError::from)?;

        Ok(rows.into_iter().map(|row| row.column_name).collect())
    }
}

#[async_trait]
impl SinkProvider for PgSinkProvider {
    async fn open(&self, target: &TargetSpec) -> pump_core::Result<Box<dyn SinkWriter>> {
        let table =
            TableRef::new(&target.dataset, &target.table).map_err(pump_core::Error::bad_request)?;

        let columns = self
            .columns(&table)
            .await
            .map_err(|e| e.into_core(ErrorKind::Resource))?;

        if columns.is_empty() {
            return Err(pump_core::Error::resource(format!(
                "table {table} does not exist"
            )));
        }

        tracing::debug!(
            target: TRACING_TARGET_WRITER,
            table = %table,
            columns = columns.len(),
            ignore_unknowns = target.ignore_unknowns,
            "Opened table writer"
        );

        let rows = RowBuffer::new(columns, target.ignore_unknowns);
        Ok(Box::new(PgTableWriter::new(self.client.clone(), table, rows)))
    }
}
