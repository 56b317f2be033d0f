// ABOUTME: In-memory session that answers the exporter's catalog and data queries
// ABOUTME: Used by unit and integration tests to run exports without a server

use crate::config::ConnectionParams;
use crate::dump::query;
use crate::dump::value::SqlValue;
use crate::error::{ExportError, Result};
use crate::session::{Row, Session};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct MemoryTable {
    name: String,
    columns: Vec<(String, String, bool)>,
    rows: Vec<Row>,
}

/// A fake database holding tables in insertion order.
///
/// Queries are matched against the exact strings built by
/// [`crate::dump::query`]; anything else fails as a query error.
pub struct MemorySession {
    database: String,
    tables: Vec<MemoryTable>,
    fail_on: Option<String>,
    closed: Arc<AtomicBool>,
    queries: Vec<String>,
}

impl MemorySession {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: Vec::new(),
            fail_on: None,
            closed: Arc::new(AtomicBool::new(false)),
            queries: Vec::new(),
        }
    }

    /// Add a table given `(name, type, is_primary_key)` columns and its rows
    pub fn table(mut self, name: &str, columns: &[(&str, &str, bool)], rows: Vec<Row>) -> Self {
        self.tables.push(MemoryTable {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, t, pk)| (n.to_string(), t.to_string(), *pk))
                .collect(),
            rows,
        });
        self
    }

    /// Fail every query containing `fragment`
    pub fn fail_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    /// Flag set once [`Session::close`] has run
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Queries received so far
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    fn answer(&self, sql: &str) -> Result<Vec<Row>> {
        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(ExportError::query(sql, "injected failure"));
            }
        }

        if sql == query::list_tables(&self.database) {
            return Ok(self
                .tables
                .iter()
                .map(|t| vec![SqlValue::text(&t.name)])
                .collect());
        }

        for table in &self.tables {
            if sql == query::describe_columns(&self.database, &table.name) {
                return Ok(table
                    .columns
                    .iter()
                    .map(|(name, column_type, pk)| {
                        vec![
                            SqlValue::text(name),
                            SqlValue::text(column_type),
                            SqlValue::text(if *pk { "PRI" } else { "" }),
                        ]
                    })
                    .collect());
            }
            if sql == query::column_names(&self.database, &table.name) {
                return Ok(table
                    .columns
                    .iter()
                    .map(|(name, _, _)| vec![SqlValue::text(name)])
                    .collect());
            }
            let names: Vec<String> = table.columns.iter().map(|c| c.0.clone()).collect();
            if sql == query::select_rows(&table.name, &names) {
                return Ok(table.rows.clone());
            }
        }

        if sql == query::server_version() {
            return Ok(vec![vec![SqlValue::text("8.0.0-memory")]]);
        }

        Err(ExportError::query(sql, "unknown query"))
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn open(params: &ConnectionParams) -> Result<Self> {
        Err(ExportError::connection(format!(
            "cannot connect to {}: in-memory sessions are built with MemorySession::new",
            params.display_name()
        )))
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<Row>> {
        self.queries.push(sql.to_string());
        self.answer(sql)
    }

    async fn close(self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
