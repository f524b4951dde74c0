use std::collections::{BTreeSet, HashSet};

use serde_json::{Map, Value};

use super::{TableRef, quote_ident};

/// Why a payload could not be buffered.
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    /// The payload is not valid JSON.
    #[error("row is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The payload is valid JSON but not an object.
    #[error("row must be a JSON object")]
    NotAnObject,

    /// The payload has keys that are not columns of the table.
    #[error("row has unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),
}

/// Rows waiting to be inserted into one table.
///
/// Keeps the table's columns in ordinal order and tracks which of them
/// appear in the buffered rows, so the insert only names those columns.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    columns: Vec<String>,
    known: HashSet<String>,
    ignore_unknowns: bool,
    present: BTreeSet<usize>,
    rows: Vec<Value>,
}

impl RowBuffer {
    /// Creates an empty buffer for a table with the given columns.
    pub fn new(columns: Vec<String>, ignore_unknowns: bool) -> Self {
        let known = columns.iter().cloned().collect();
        Self {
            columns,
            known,
            ignore_unknowns,
            present: BTreeSet::new(),
            rows: Vec::new(),
        }
    }

    /// Parses and buffers one JSON object payload.
    pub fn push(&mut self, payload: &[u8]) -> Result<(), RowError> {
        let Value::Object(fields) = serde_json::from_slice(payload)? else {
            return Err(RowError::NotAnObject);
        };

        let mut unknown = Vec::new();
        let mut row = Map::with_capacity(fields.len());
        for (key, value) in fields {
            if self.known.contains(&key) {
                row.insert(key, value);
            } else {
                unknown.push(key);
            }
        }

        if !unknown.is_empty() && !self.ignore_unknowns {
            unknown.sort();
            return Err(RowError::UnknownFields(unknown));
        }

        for (index, column) in self.columns.iter().enumerate() {
            if row.contains_key(column) {
                self.present.insert(index);
            }
        }

        self.rows.push(Value::Object(row));
        Ok(())
    }

    /// Number of buffered rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the buffered rows as one JSON array.
    pub fn to_json(&self) -> Value {
        Value::Array(self.rows.clone())
    }

    /// Returns whether the insert statement takes the rows as `$1`.
    ///
    /// It does not when no buffered row sets a known column: every row is
    /// then written with the column defaults.
    #[inline]
    pub fn binds_rows(&self) -> bool {
        !self.present.is_empty()
    }

    /// Returns the insert statement for the buffered rows.
    ///
    /// The statement takes the rows as a single `jsonb` array bound to `$1`,
    /// unless [`binds_rows`](Self::binds_rows) is false.
    pub fn insert_statement(&self, table: &TableRef) -> String {
        let target = table.quoted();
        if !self.binds_rows() {
            return self.defaults_statement(&target);
        }

        let columns = self
            .present
            .iter()
            .map(|&index| quote_ident(&self.columns[index]))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {target} ({columns}) \
             SELECT {columns} FROM jsonb_populate_recordset(NULL::{target}, $1)"
        )
    }

    /// One `DEFAULT` row per buffered row, keyed on the first column.
    fn defaults_statement(&self, target: &str) -> String {
        let column = self.columns.first().map(|c| quote_ident(c));
        match column {
            Some(column) => {
                let values = vec!["(DEFAULT)"; self.rows.len()].join(", ");
                format!("INSERT INTO {target} ({column}) VALUES {values}")
            }
            None => format!("INSERT INTO {target} DEFAULT VALUES"),
        }
    }

    /// Drops every buffered row.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.present.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(ignore_unknowns: bool) -> RowBuffer {
        let columns = ["id", "kind", "payload"].map(String::from).to_vec();
        RowBuffer::new(columns, ignore_unknowns)
    }

    #[test]
    fn buffers_known_fields() {
        let mut rows = buffer(false);
        rows.push(br#"{"kind":"click","payload":{"x":1}}"#).unwrap();
        rows.push(br#"{"kind":"view"}"#).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.to_json()[1]["kind"], "view");
    }

    #[test]
    fn rejects_unknown_fields_when_strict() {
        let mut rows = buffer(false);
        let error = rows.push(br#"{"kind":"click","zeta":1,"alpha":2}"#).unwrap_err();

        assert!(matches!(&error, RowError::UnknownFields(f) if f == &["alpha", "zeta"]));
        assert!(rows.is_empty());
    }

    #[test]
    fn drops_unknown_fields_when_tolerant() {
        let mut rows = buffer(true);
        rows.push(br#"{"kind":"click","extra":true}"#).unwrap();

        let json = rows.to_json();
        assert_eq!(json[0]["kind"], "click");
        assert!(json[0].get("extra").is_none());
    }

    #[test]
    fn rejects_non_objects() {
        let mut rows = buffer(true);
        assert!(matches!(rows.push(b"[1,2]"), Err(RowError::NotAnObject)));
        assert!(matches!(rows.push(b"not json"), Err(RowError::InvalidJson(_))));
    }

    #[test]
    fn statement_lists_present_columns_in_table_order() {
        let table = TableRef::new("public", "events").unwrap();
        let mut rows = buffer(false);
        rows.push(br#"{"payload":{},"kind":"a"}"#).unwrap();

        assert_eq!(
            rows.insert_statement(&table),
            "INSERT INTO \"public\".\"events\" (\"kind\", \"payload\") \
             SELECT \"kind\", \"payload\" FROM jsonb_populate_recordset(NULL::\"public\".\"events\", $1)"
        );

        rows.clear();
        assert!(rows.is_empty());
        rows.push(br#"{"id":1}"#).unwrap();
        assert!(rows.insert_statement(&table).contains("(\"id\")"));
    }

    #[test]
    fn empty_rows_are_written_with_defaults() {
        let table = TableRef::new("public", "events").unwrap();
        let mut rows = buffer(false);
        rows.push(b"{}").unwrap();
        rows.push(b"{}").unwrap();

        assert!(!rows.binds_rows());
        assert_eq!(
            rows.insert_statement(&table),
            "INSERT INTO \"public\".\"events\" (\"id\") VALUES (DEFAULT), (DEFAULT)"
        );
    }

    #[test]
    fn rows_with_only_unknown_fields_are_written_with_defaults() {
        let table = TableRef::new("public", "events").unwrap();
        let mut rows = buffer(true);
        rows.push(br#"{"extra":1}"#).unwrap();
        rows.push(b"{}").unwrap();

        let sql = rows.insert_statement(&table);
        assert!(!sql.contains("()"));
        assert!(sql.ends_with("VALUES (DEFAULT), (DEFAULT)"));

        rows.push(br#"{"kind":"a"}"#).unwrap();
        assert!(rows.binds_rows());
        assert!(rows.insert_statement(&table).contains("(\"kind\")"));
    }
}
