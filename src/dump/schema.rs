// ABOUTME: Schema extractor writing one create table statement per table
// ABOUTME: Column definitions and primary key clause come from the catalog

use super::catalog::{self, TableDescriptor};
use crate::error::{IoContext, Phase, Result};
use crate::progress::Progress;
use crate::session::Session;
use std::io::Write;

/// Name of the schema file inside the staging area
pub const SCHEMA_FILE: &str = "schema.sql";

/// Render the create statement of one table
///
/// A table without primary key columns still gets `primary key()`, which
/// MySQL rejects; restoring such a dump needs that line removed by hand.
pub fn create_statement(table: &TableDescriptor) -> String {
    let mut out = format!("create table {} (\n", table.name);
    for column in &table.columns {
        out.push_str(&format!("    {} {},\n", column.name, column.column_type));
    }
    out.push_str(&format!("    primary key({})", table.primary_key().join(", ")));
    out.push_str("\n);\n");
    out
}

/// Write the schema of every table of `database` into `out`
///
/// Returns the tables in the order they were written.
pub async fn dump_schema<S, W>(
    session: &mut S,
    database: &str,
    out: &mut W,
    progress: &dyn Progress,
) -> Result<Vec<TableDescriptor>>
where
    S: Session + ?Sized,
    W: Write + Send,
{
    let tables = catalog::list_tables(session, database).await?;
    let total = tables.len();
    tracing::debug!("Dumping schema of {} table(s)", total);

    let mut written = Vec::with_capacity(total);
    for (idx, name) in tables.iter().enumerate() {
        let table = catalog::describe_table(session, database, name)
            .await
            .map_err(|e| e.in_table(Phase::Schema, name.as_str()))?;

        if table.primary_key().is_empty() {
            tracing::warn!(
                "Table '{}' has no primary key, its create statement ends with an empty primary key()",
                name
            );
        }

        out.write_all(create_statement(&table).as_bytes())
            .io_context(|| format!("writing schema of '{}'", name))
            .map_err(|e| e.in_table(Phase::Schema, name.as_str()))?;

        progress.report(Phase::Schema, idx + 1, total, name);
        written.push(table);
    }

    out.flush().io_context(|| "flushing schema file")?;
    Ok(written)
}
