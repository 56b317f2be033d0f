// ABOUTME: Catalog introspection through information_schema
// ABOUTME: Discovers tables and their column definitions in catalog order

use super::query;
use crate::dump::value::SqlValue;
use crate::error::{ExportError, Result};
use crate::session::Session;

/// Value of `column_key` for primary key columns
const PRIMARY_KEY: &str = "PRI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Declared type as the catalog reports it, e.g. `varchar(255)`
    pub column_type: String,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// Primary key column names in catalog order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

fn text_cell(value: Option<&SqlValue>, query: &str, what: &str) -> Result<String> {
    match value {
        Some(SqlValue::Null) => Ok(String::new()),
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExportError::query(query, format!("{} is not text: {}", what, v))),
        None => Err(ExportError::query(query, format!("missing {} column", what))),
    }
}

/// List every table of `database`
pub async fn list_tables<S: Session + ?Sized>(session: &mut S, database: &str) -> Result<Vec<String>> {
    let sql = query::list_tables(database);
    let names = session.fetch_scalars(&sql).await?;
    names
        .iter()
        .map(|name| text_cell(Some(name), &sql, "table_name"))
        .collect()
}

/// Read the column definitions of one table
pub async fn describe_table<S: Session + ?Sized>(
    session: &mut S,
    database: &str,
    table: &str,
) -> Result<TableDescriptor> {
    let sql = query::describe_columns(database, table);
    let rows = session.fetch_all(&sql).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        columns.push(ColumnDescriptor {
            name: text_cell(row.first(), &sql, "column_name")?,
            column_type: text_cell(row.get(1), &sql, "column_type")?,
            primary_key: text_cell(row.get(2), &sql, "column_key")? == PRIMARY_KEY,
        });
    }

    Ok(TableDescriptor {
        name: table.to_string(),
        columns,
    })
}

/// Column names of one table
pub async fn column_names<S: Session + ?Sized>(
    session: &mut S,
    database: &str,
    table: &str,
) -> Result<Vec<String>> {
    let sql = query::column_names(database, table);
    let names = session.fetch_scalars(&sql).await?;
    names
        .iter()
        .map(|name| text_cell(Some(name), &sql, "column_name"))
        .collect()
}
