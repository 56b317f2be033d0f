// ABOUTME: Builds every SQL string the exporter sends to the server
// ABOUTME: Catalog lookups on information_schema and per-table data selects

use super::value::{serialize, SqlValue};

// Queries are plain interpolated strings; the session executes them without
// parameter binding. Keep all construction here so that can change in one place.

fn string_literal(value: &str) -> String {
    serialize(&SqlValue::text(value))
}

/// Quote an identifier with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Table names of a database, in a stable order
pub fn list_tables(database: &str) -> String {
    format!(
        "select table_name from information_schema.tables \
         where table_schema = {} order by table_name",
        string_literal(database)
    )
}

/// Column name, declared type and key flag of one table, in declaration order
pub fn describe_columns(database: &str, table: &str) -> String {
    format!(
        "select column_name, column_type, column_key from information_schema.columns \
         where table_schema = {} and table_name = {} order by ordinal_position",
        string_literal(database),
        string_literal(table)
    )
}

/// Column names only, in declaration order
pub fn column_names(database: &str, table: &str) -> String {
    format!(
        "select column_name from information_schema.columns \
         where table_schema = {} and table_name = {} order by ordinal_position",
        string_literal(database),
        string_literal(table)
    )
}

/// Every row of a table, projected over the given columns
pub fn select_rows(table: &str, columns: &[String]) -> String {
    let projection = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("select {} from {}", projection, quote_identifier(table))
}

pub fn server_version() -> String {
    "select version()".to_string()
}
