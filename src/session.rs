// ABOUTME: Database session abstraction used by the extractors
// ABOUTME: Serial query execution returning rows of typed scalar values

use crate::config::ConnectionParams;
use crate::dump::value::SqlValue;
use crate::error::Result;
use async_trait::async_trait;

pub type Row = Vec<SqlValue>;

/// One live connection to the source database.
///
/// Queries arrive fully substituted (see [`crate::dump::query`]) and are
/// issued one at a time; nothing ever runs two queries concurrently on a
/// session.
#[async_trait]
pub trait Session: Send {
    /// Establish a new session
    async fn open(params: &ConnectionParams) -> Result<Self>
    where
        Self: Sized;

    /// Fetch every row of a query
    async fn fetch_all(&mut self, query: &str) -> Result<Vec<Row>>;

    /// Fetch the first row, if any
    async fn fetch_one(&mut self, query: &str) -> Result<Option<Row>> {
        Ok(self.fetch_all(query).await?.into_iter().next())
    }

    /// Fetch the first column of every row
    async fn fetch_scalars(&mut self, query: &str) -> Result<Vec<SqlValue>> {
        let rows = self.fetch_all(query).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Feed rows to `f` one by one without holding the whole result set.
    ///
    /// Stops at the first error returned by `f`.
    async fn for_each_row(
        &mut self,
        query: &str,
        f: &mut (dyn FnMut(Row) -> Result<()> + Send),
    ) -> Result<()> {
        for row in self.fetch_all(query).await? {
            f(row)?;
        }
        Ok(())
    }

    /// Close the session, consuming it
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
