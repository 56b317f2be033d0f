// ABOUTME: MySQL session backed by mysql_async
// ABOUTME: Opens the connection, runs queries serially and maps driver errors

use super::value::from_mysql;
use crate::config::ConnectionParams;
use crate::error::{ExportError, Result};
use crate::session::{Row, Session};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder};

/// A single live connection to a MySQL server.
pub struct MySqlSession {
    conn: Conn,
}

impl MySqlSession {
    /// Connect with the given parameters, applying the documented defaults
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(params.host())
            .tcp_port(params.port())
            .user(Some(params.user()))
            .pass(Some(params.password()))
            .db_name(Some(params.database.as_str()));

        tracing::debug!(
            "Connecting to {}:{} as '{}'",
            params.host(),
            params.port(),
            params.user()
        );

        let conn = Conn::new(opts)
            .await
            .map_err(|e| connection_error(params, e))?;

        Ok(Self { conn })
    }
}

/// Turn a driver error into a connection error with a hint for common causes
fn connection_error(params: &ConnectionParams, e: mysql_async::Error) -> ExportError {
    let error_msg = e.to_string();
    let message = if error_msg.contains("Access denied") {
        format!(
            "Authentication failed for user '{}'.\n\
             Please verify your database credentials.\n\
             Error: {}",
            params.user(),
            error_msg
        )
    } else if error_msg.contains("Unknown database") {
        format!(
            "Database '{}' does not exist on {}.\n\
             Error: {}",
            params.database,
            params.host(),
            error_msg
        )
    } else if error_msg.contains("Connection refused") {
        format!(
            "Connection refused: Unable to reach {}:{}.\n\
             Please check:\n\
             - The host and port are correct\n\
             - The database server is running\n\
             - Firewall rules allow connections\n\
             Error: {}",
            params.host(),
            params.port(),
            error_msg
        )
    } else if error_msg.contains("timed out") || error_msg.contains("timeout") {
        format!(
            "Connection timeout: {} did not respond in time.\n\
             Error: {}",
            params.host(),
            error_msg
        )
    } else {
        format!(
            "Failed to connect to {}: {}",
            params.display_name(),
            error_msg
        )
    };

    ExportError::Connection {
        message,
        source: Some(Box::new(e)),
    }
}

fn into_row(row: mysql_async::Row) -> Row {
    let columns = row.columns();
    row.unwrap()
        .into_iter()
        .enumerate()
        .map(|(idx, value)| from_mysql(value, columns.get(idx)))
        .collect()
}

#[async_trait]
impl Session for MySqlSession {
    async fn open(params: &ConnectionParams) -> Result<Self> {
        Self::connect(params).await
    }

    async fn fetch_all(&mut self, query: &str) -> Result<Vec<Row>> {
        tracing::trace!("fetch_all: {}", query);
        // exec goes through the binary protocol, so numbers arrive typed
        let rows: Vec<mysql_async::Row> = self
            .conn
            .exec(query, ())
            .await
            .map_err(|e| ExportError::query(query, e))?;
        Ok(rows.into_iter().map(into_row).collect())
    }

    async fn fetch_one(&mut self, query: &str) -> Result<Option<Row>> {
        tracing::trace!("fetch_one: {}", query);
        let row: Option<mysql_async::Row> = self
            .conn
            .exec_first(query, ())
            .await
            .map_err(|e| ExportError::query(query, e))?;
        Ok(row.map(into_row))
    }

    async fn for_each_row(
        &mut self,
        query: &str,
        f: &mut (dyn FnMut(Row) -> Result<()> + Send),
    ) -> Result<()> {
        tracing::trace!("for_each_row: {}", query);
        let mut result = self
            .conn
            .exec_iter(query, ())
            .await
            .map_err(|e| ExportError::query(query, e))?;
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| ExportError::query(query, e))?
        {
            f(into_row(row))?;
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .map_err(|e| ExportError::connection(format!("Failed to close connection: {}", e)))
    }
}
