//! Table sink writing pump batches into PostgreSQL.

mod provider;
mod row_buffer;
mod table_ref;
mod table_writer;

pub use provider::PgSinkProvider;
pub use row_buffer::{RowBuffer, RowError};
pub use table_ref::{TableRef, quote_ident};
pub use table_writer::PgTableWriter;
