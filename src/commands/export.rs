// ABOUTME: Export command orchestrating connect, staging, schema, data and archive phases
// ABOUTME: Guarantees staging removal and session close on every exit path

use crate::config::ExportConfig;
use crate::dump::{self, data, schema};
use crate::error::{ExportError, IoContext, Result};
use crate::mysql::MySqlSession;
use crate::progress::{ConsoleProgress, Progress, QuietProgress};
use crate::session::Session;
use crate::utils::{format_bytes, format_duration};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Prefix of staging directories, also used to find stale ones
pub const STAGING_PREFIX: &str = ".mysql-dump-";

/// Lifecycle of one export run.
///
/// Any failure moves straight to `CleanedUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Connecting,
    StagingPrepared,
    SchemaDumped,
    DataDumped,
    Archived,
    CleanedUp,
}

/// What a successful run produced and how long each phase took
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub database: String,
    pub archive: PathBuf,
    pub tables: usize,
    pub rows: u64,
    pub archive_bytes: u64,
    pub schema_elapsed: Duration,
    pub data_elapsed: Duration,
    pub archive_elapsed: Duration,
    pub total_elapsed: Duration,
    /// Staging directory that could not be removed after the archive was written
    pub staging_left_behind: Option<PathBuf>,
}

struct PhaseOutput {
    tables: usize,
    rows: u64,
    archive_bytes: u64,
    schema_elapsed: Duration,
    data_elapsed: Duration,
    archive_elapsed: Duration,
    staging_left_behind: Option<PathBuf>,
}

fn advance(state: &mut ExportState, next: ExportState) {
    tracing::debug!("Export state {:?} -> {:?}", state, next);
    *state = next;
}

/// Runs exports against a session of type `S`.
///
/// The session is opened on first use and closed at the end of every
/// [`Exporter::run`], whether it succeeded or not.
pub struct Exporter<'a, S: Session> {
    config: ExportConfig,
    progress: &'a dyn Progress,
    session: Option<S>,
    state: ExportState,
}

impl<'a, S: Session> Exporter<'a, S> {
    pub fn new(config: ExportConfig, progress: &'a dyn Progress) -> Self {
        Self {
            config,
            progress,
            session: None,
            state: ExportState::Idle,
        }
    }

    /// Use an already open session instead of connecting
    pub fn with_session(config: ExportConfig, progress: &'a dyn Progress, session: S) -> Self {
        Self {
            config,
            progress,
            session: Some(session),
            state: ExportState::Idle,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Open the session unless one is already open
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        advance(&mut self.state, ExportState::Connecting);
        let mut session = S::open(&self.config.connection).await?;

        match session.fetch_one(&dump::query::server_version()).await {
            Ok(Some(row)) => tracing::info!(
                "Connected to {} (server {})",
                self.config.connection.display_name(),
                row.first().and_then(|v| v.as_str()).unwrap_or("unknown")
            ),
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not read server version: {}", e),
        }

        self.session = Some(session);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        }
    }

    /// Export the configured database into the configured archive
    ///
    /// Steps:
    /// 1. Connects (no-op when a session is already open)
    /// 2. Creates a fresh staging directory
    /// 3. Writes `schema.sql`, then one `<table>.dmp` per table
    /// 4. Zips the staging directory into the destination
    ///
    /// The staging directory is removed and the session closed no matter
    /// which step failed.
    pub async fn run(&mut self) -> Result<ExportSummary> {
        let started = Instant::now();
        self.state = ExportState::Idle;
        if let Err(e) = self.config.validate() {
            advance(&mut self.state, ExportState::CleanedUp);
            return Err(e);
        }

        self.progress.line(&format!(
            "Dumping '{}' database into '{}'",
            self.config.connection.display_name(),
            self.config.output.display()
        ));

        let outcome = match self.connect().await {
            Ok(()) => self.run_staged().await,
            Err(e) => Err(e),
        };
        let closed = self.close().await;
        advance(&mut self.state, ExportState::CleanedUp);

        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                self.progress.abandon();
                if let Err(close_err) = closed {
                    tracing::warn!("Failed to close database session: {}", close_err);
                }
                return Err(e);
            }
        };
        closed?;

        let summary = ExportSummary {
            database: self.config.connection.database.clone(),
            archive: self.config.output.clone(),
            tables: output.tables,
            rows: output.rows,
            archive_bytes: output.archive_bytes,
            schema_elapsed: output.schema_elapsed,
            data_elapsed: output.data_elapsed,
            archive_elapsed: output.archive_elapsed,
            total_elapsed: started.elapsed(),
            staging_left_behind: output.staging_left_behind,
        };
        self.progress.line(&format!(
            "Finished dumping of database in {} ({} tables, {} rows, {})",
            format_duration(summary.total_elapsed),
            summary.tables,
            summary.rows,
            format_bytes(summary.archive_bytes)
        ));
        if let Some(path) = &summary.staging_left_behind {
            self.progress.line(&format!(
                "Staging directory '{}' could not be removed; delete it manually",
                path.display()
            ));
        }
        Ok(summary)
    }

    async fn run_staged(&mut self) -> Result<PhaseOutput> {
        let staging = create_staging(self.config.staging_dir.as_deref())?;
        advance(&mut self.state, ExportState::StagingPrepared);
        tracing::debug!("Using staging directory: {}", staging.path().display());

        let outcome = self.run_phases(staging.path()).await;
        let left_behind = remove_staging(staging);

        outcome.map(|mut output| {
            output.staging_left_behind = left_behind;
            output
        })
    }

    async fn run_phases(&mut self, dir: &Path) -> Result<PhaseOutput> {
        let progress = self.progress;
        let database = self.config.connection.database.clone();
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ExportError::connection("database session is not open"))?;

        progress.line("Dumping the table schema into schema file...");
        let phase_start = Instant::now();
        let schema_path = dir.join(schema::SCHEMA_FILE);
        let file = File::create(&schema_path)
            .io_context(|| format!("creating {}", schema_path.display()))?;
        let mut out = BufWriter::new(file);
        let tables = schema::dump_schema(&mut *session, &database, &mut out, progress).await?;
        drop(out);
        let schema_elapsed = phase_start.elapsed();
        advance(&mut self.state, ExportState::SchemaDumped);
        progress.line(&format!(
            "Dumped table schema in {}",
            format_duration(schema_elapsed)
        ));

        progress.line("Dumping the table data into data files...");
        let phase_start = Instant::now();
        let rows = data::dump_tables(&mut *session, &database, dir, progress).await?;
        let data_elapsed = phase_start.elapsed();
        advance(&mut self.state, ExportState::DataDumped);
        progress.line(&format!(
            "Dumped table data in {}",
            format_duration(data_elapsed)
        ));

        let destination = &self.config.output;
        progress.line(&format!(
            "Compressing database information into '{}'...",
            destination.display()
        ));
        let phase_start = Instant::now();
        dump::create_archive(dir, destination)?;
        let archive_elapsed = phase_start.elapsed();
        advance(&mut self.state, ExportState::Archived);
        progress.line(&format!(
            "Compressed database information in {}",
            format_duration(archive_elapsed)
        ));

        let archive_bytes = std::fs::metadata(destination)
            .io_context(|| format!("reading size of {}", destination.display()))?
            .len();

        Ok(PhaseOutput {
            tables: tables.len(),
            rows,
            archive_bytes,
            schema_elapsed,
            data_elapsed,
            archive_elapsed,
            staging_left_behind: None,
        })
    }
}

/// Remove the staging directory, returning its path if it is still on disk
fn remove_staging(staging: TempDir) -> Option<PathBuf> {
    let path = staging.path().to_path_buf();
    match staging.close() {
        Ok(()) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(
                "Failed to remove staging directory {}: {}",
                path.display(),
                e
            );
            path.exists().then_some(path)
        }
    }
}

/// Create a fresh, empty staging directory under `root` (system temp dir by default)
fn create_staging(root: Option<&Path>) -> Result<TempDir> {
    let root = root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&root)
        .io_context(|| format!("creating staging root {}", root.display()))?;
    tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&root)
        .io_context(|| format!("creating staging directory in {}", root.display()))
}

/// Export a MySQL database as configured
///
/// # Examples
///
/// ```no_run
/// # use mysql_dump::commands::export;
/// # use mysql_dump::config::ExportConfig;
/// # async fn example() -> mysql_dump::error::Result<()> {
/// let summary = export(ExportConfig::new("shop", "shop.zip")).await?;
/// println!("{} tables in {:?}", summary.tables, summary.total_elapsed);
/// # Ok(())
/// # }
/// ```
pub async fn export(config: ExportConfig) -> Result<ExportSummary> {
    let progress: Box<dyn Progress> = if config.quiet {
        Box::new(QuietProgress)
    } else {
        Box::new(ConsoleProgress::new())
    };
    Exporter::<MySqlSession>::new(config, progress.as_ref())
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::SqlValue;
    use crate::testing::MemorySession;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    fn shop() -> MemorySession {
        MemorySession::new("shop")
            .table(
                "customers",
                &[("id", "int(11)", true), ("name", "varchar(64)", false)],
                vec![vec![SqlValue::Integer(1), SqlValue::text("Ann")]],
            )
            .table(
                "orders",
                &[("id", "int(11)", true), ("customer_id", "int(11)", false)],
                vec![vec![SqlValue::Integer(10), SqlValue::Integer(1)]],
            )
    }

    fn config(out: &Path, staging: &Path) -> ExportConfig {
        let mut config = ExportConfig::new("shop", out.join("shop.zip"));
        config.staging_dir = Some(staging.to_path_buf());
        config
    }

    #[tokio::test]
    async fn test_run_produces_archive_and_cleans_up() {
        let out = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let session = shop();
        let closed = session.closed_flag();

        let mut exporter =
            Exporter::with_session(config(out.path(), staging.path()), &QuietProgress, session);
        let summary = exporter.run().await.unwrap();

        assert_eq!(summary.tables, 2);
        assert_eq!(summary.rows, 2);
        assert!(summary.archive_bytes > 0);
        assert!(out.path().join("shop.zip").exists());
        assert_eq!(exporter.state(), ExportState::CleanedUp);
        assert!(!exporter.is_connected());
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
        assert!(summary.staging_left_behind.is_none());
    }

    #[test]
    fn test_remove_staging_reports_nothing_when_gone() {
        let root = tempdir().unwrap();
        let staging = create_staging(Some(root.path())).unwrap();
        let path = staging.path().to_path_buf();
        std::fs::write(path.join("schema.sql"), "create table t (\n);\n").unwrap();

        assert_eq!(remove_staging(staging), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_staging_tolerates_already_removed_dir() {
        let root = tempdir().unwrap();
        let staging = create_staging(Some(root.path())).unwrap();
        std::fs::remove_dir_all(staging.path()).unwrap();

        assert_eq!(remove_staging(staging), None);
    }

    #[tokio::test]
    async fn test_query_failure_closes_session_and_removes_staging() {
        let out = tempdir().unwrap();
        let staging = tempdir().unwrap();
        let session = shop().fail_on("from `orders`");
        let closed = session.closed_flag();

        let mut exporter =
            Exporter::with_session(config(out.path(), staging.path()), &QuietProgress, session);
        let err = exporter.run().await.unwrap_err();

        assert!(err.to_string().contains("orders"));
        assert_eq!(exporter.state(), ExportState::CleanedUp);
        assert!(closed.load(Ordering::SeqCst));
        assert!(!out.path().join("shop.zip").exists());
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_happens_before_staging() {
        let out = tempdir().unwrap();
        let staging = tempdir().unwrap();

        let mut exporter: Exporter<MemorySession> =
            Exporter::new(config(out.path(), staging.path()), &QuietProgress);
        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, ExportError::Connection { .. }));
        assert_eq!(exporter.state(), ExportState::CleanedUp);
        assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connecting() {
        let staging = tempdir().unwrap();
        let mut config = config(staging.path(), staging.path());
        config.connection.database = String::new();

        let session = shop();
        let closed = session.closed_flag();
        let mut exporter = Exporter::with_session(config, &QuietProgress, session);
        let err = exporter.run().await.unwrap_err();

        assert!(matches!(err, ExportError::Argument(_)));
        assert_eq!(exporter.state(), ExportState::CleanedUp);
        assert!(!closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_connect_is_noop_when_open() {
        let staging = tempdir().unwrap();
        let mut exporter =
            Exporter::with_session(config(staging.path(), staging.path()), &QuietProgress, shop());
        exporter.connect().await.unwrap();
        assert!(exporter.is_connected());
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[test]
    fn test_staging_directories_are_fresh() {
        let root = tempdir().unwrap();
        let a = create_staging(Some(root.path())).unwrap();
        let b = create_staging(Some(root.path())).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(STAGING_PREFIX));
        assert_eq!(std::fs::read_dir(a.path()).unwrap().count(), 0);
    }
}
