// ABOUTME: Table data extractor streaming rows into one .dmp file per table
// ABOUTME: Rows are comma separated serialized literals terminated by a newline

use super::catalog;
use super::query;
use super::value::serialize;
use crate::error::{ExportError, IoContext, Phase, Result};
use crate::progress::Progress;
use crate::session::{Row, Session};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Extension of per-table data files
pub const DATA_EXTENSION: &str = "dmp";

/// Path of the data file of `table` inside `dir`
///
/// The file name must be a single plain path component, so a table called
/// `../x` or `a/b` is refused instead of escaping or nesting below `dir`.
pub fn data_file_path(dir: &Path, table: &str) -> Result<PathBuf> {
    let file_name = format!("{}.{}", table, DATA_EXTENSION);
    let mut components = Path::new(&file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == file_name.as_str() => {
            Ok(dir.join(file_name))
        }
        _ => Err(ExportError::Argument(format!(
            "table name '{}' cannot be used as a data file name",
            table
        ))),
    }
}

/// Stream the rows of `query` into `out`, returning the number of rows
///
/// Each line holds the row's literals joined by `,`. Text literals keep any
/// commas inside their quotes, so a reader must split lines with
/// [`super::value::split_row`] rather than on every comma.
pub async fn write_rows<S, W>(session: &mut S, sql: &str, out: &mut W) -> Result<u64>
where
    S: Session + ?Sized,
    W: Write + Send,
{
    let mut count = 0u64;
    session
        .for_each_row(sql, &mut |row: Row| -> Result<()> {
            let mut first = true;
            for value in &row {
                if !first {
                    out.write_all(b",").io_context(|| "writing row")?;
                }
                first = false;
                out.write_all(serialize(value).as_bytes())
                    .io_context(|| "writing row")?;
            }
            out.write_all(b"\n").io_context(|| "writing row")?;
            count += 1;
            Ok(())
        })
        .await?;
    Ok(count)
}

async fn dump_table<S: Session + ?Sized>(
    session: &mut S,
    database: &str,
    table: &str,
    dir: &Path,
) -> Result<u64> {
    let columns = catalog::column_names(session, database, table).await?;
    let sql = query::select_rows(table, &columns);

    let path = data_file_path(dir, table)?;
    let file = File::create(&path).io_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let rows = write_rows(session, &sql, &mut out).await?;
    out.flush()
        .io_context(|| format!("flushing {}", path.display()))?;
    Ok(rows)
}

/// Write one data file per table of `database` into `dir`
///
/// The first failing table aborts the phase; files already written stay in
/// `dir` for the caller to discard with the staging area.
pub async fn dump_tables<S: Session + ?Sized>(
    session: &mut S,
    database: &str,
    dir: &Path,
    progress: &dyn Progress,
) -> Result<u64> {
    let tables = catalog::list_tables(session, database).await?;
    let total = tables.len();
    tracing::debug!("Dumping data of {} table(s)", total);

    let mut total_rows = 0;
    for (idx, table) in tables.iter().enumerate() {
        let rows = dump_table(session, database, table, dir)
            .await
            .map_err(|e| e.in_table(Phase::Data, table.as_str()))?;
        tracing::debug!("  {}: {} row(s)", table, rows);
        total_rows += rows;
        progress.report(Phase::Data, idx + 1, total, table);
    }

    Ok(total_rows)
}
