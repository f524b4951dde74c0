use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex")
});

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// A validated `schema.table` pair.
///
/// The job's dataset names the schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    schema: String,
    table: String,
}

impl TableRef {
    /// Validates both identifiers.
    ///
    /// Identifiers start with a letter or underscore, contain only ASCII
    /// letters, digits, and underscores, and are at most 63 bytes long.
    pub fn new(schema: &str, table: &str) -> Result<Self, String> {
        for (part, value) in [("dataset", schema), ("table", table)] {
            if !IDENTIFIER_RE.is_match(value) {
                return Err(format!("invalid {part} identifier '{value}'"));
            }
        }

        Ok(Self {
            schema: schema.to_owned(),
            table: table.to_owned(),
        })
    }

    #[inline]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the quoted `"schema"."table"` form.
    pub fn quoted(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        let table = TableRef::new("analytics", "page_views_2024").unwrap();
        assert_eq!(table.to_string(), "analytics.page_views_2024");
        assert_eq!(table.quoted(), r#""analytics"."page_views_2024""#);
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        for (schema, table) in [
            ("", "events"),
            ("public", ""),
            ("public", "events; DROP TABLE users"),
            ("public", "1events"),
            ("pub\"lic", "events"),
            ("public", &"e".repeat(64)),
        ] {
            assert!(TableRef::new(schema, table).is_err(), "{schema}.{table}");
        }
    }

    #[test]
    fn quoting_escapes_quotes() {
        assert_eq!(quote_ident("plain"), r#""plain""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
