// ABOUTME: CLI entry point for mysql-dump
// ABOUTME: Parses arguments, builds the export configuration and runs the export

use anyhow::Context;
use clap::Parser;
use mysql_dump::commands;
use mysql_dump::config::{ConnectionParams, ExportConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mysql-dump")]
#[command(about = "Export a MySQL database schema and data into a zip archive", long_about = None)]
#[command(version)]
struct Cli {
    /// Name of the database to export
    #[arg(short = 'd', long)]
    database: Option<String>,
    /// Database server host (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,
    /// Database server port (default: 3306)
    #[arg(long)]
    port: Option<u16>,
    /// User to connect as (default: root)
    #[arg(short = 'u', long)]
    user: Option<String>,
    /// Password for the user (default: empty)
    #[arg(short = 'p', long)]
    password: Option<String>,
    /// Destination archive file (default: export.zip)
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,
    /// Directory in which the temporary staging directory is created
    #[arg(long)]
    staging_dir: Option<PathBuf>,
    /// Path to a TOML file with connection and output settings
    #[arg(long = "config")]
    config_path: Option<PathBuf>,
    /// Suppress all progress output
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Cli {
    /// File settings first, then flags given on the command line
    fn into_config(self) -> anyhow::Result<ExportConfig> {
        let mut config = match &self.config_path {
            Some(path) => ExportConfig::from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
            None => ExportConfig::default(),
        };

        config.connection.merge(ConnectionParams {
            database: self.database.unwrap_or_default(),
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
        });
        if let Some(file) = self.file {
            config.output = file;
        }
        if self.staging_dir.is_some() {
            config.staging_dir = self.staging_dir;
        }
        config.quiet |= self.quiet;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.into_config()?;

    // Initialize logging - RUST_LOG wins, otherwise INFO (ERROR when quiet)
    let default_level = if config.quiet { "error" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    // Clean up staging directories left behind by killed runs (older than 24 hours)
    if let Err(e) = mysql_dump::utils::cleanup_stale_staging_dirs(86400) {
        tracing::warn!("Failed to clean up stale staging directories: {}", e);
    }

    commands::export(config).await?;
    Ok(())
}
