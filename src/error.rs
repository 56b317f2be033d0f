// ABOUTME: Error taxonomy for export runs
// ABOUTME: Connection, query, IO, archive and argument failures with phase/table context

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

/// The extraction phase an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Schema,
    Data,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Schema => write!(f, "dump schema"),
            Phase::Data => write!(f, "dump tables"),
        }
    }
}

/// Main error type for export operations.
///
/// None of these are retried: every variant aborts the run, and the
/// orchestrator still removes the staging area and closes the session.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The database session could not be established
    #[error("Connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A catalog or data query failed
    #[error("Query failed: {message}\n  Query: {query}")]
    Query { query: String, message: String },

    /// Staging file, directory or archive file IO failed
    #[error("IO error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The zip writer rejected an entry or could not be finalized
    #[error("Archive error while {context}: {source}")]
    Archive {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// Malformed invocation or configuration, raised before any database contact
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Any of the above, raised while processing a specific table
    #[error("[{phase}] table '{table}': {source}")]
    Table {
        phase: Phase,
        table: String,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    pub fn connection(message: impl Into<String>) -> Self {
        ExportError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn query(query: impl Into<String>, message: impl fmt::Display) -> Self {
        ExportError::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ExportError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn archive(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        ExportError::Archive {
            context: context.into(),
            source,
        }
    }

    /// Attach the phase and table being processed
    pub fn in_table(self, phase: Phase, table: impl Into<String>) -> Self {
        ExportError::Table {
            phase,
            table: table.into(),
            source: Box::new(self),
        }
    }
}

/// Shorthand for mapping `std::io::Error` with a description of the operation.
pub trait IoContext<T> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context<F, S>(self, context: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| ExportError::io(context(), e))
    }
}
