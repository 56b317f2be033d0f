// ABOUTME: Export configuration: connection parameters, output paths and quiet mode
// ABOUTME: Loads optional TOML files and applies documented defaults for unset values

use crate::error::{ExportError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_USER: &str = "root";
pub const DEFAULT_OUTPUT: &str = "export.zip";

/// Connection parameters for the source database
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionParams {
    pub database: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ConnectionParams {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Host, `127.0.0.1` when unset or empty
    pub fn host(&self) -> &str {
        non_empty(&self.host).unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// User, `root` when unset or empty
    pub fn user(&self) -> &str {
        non_empty(&self.user).unwrap_or(DEFAULT_USER)
    }

    /// Password, empty when unset
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// `database@host` for display
    pub fn display_name(&self) -> String {
        format!("{}@{}", self.database, self.host())
    }

    /// Overlay values from `other` that are set
    pub fn merge(&mut self, other: ConnectionParams) {
        if !other.database.is_empty() {
            self.database = other.database;
        }
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Everything a single export run needs
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub connection: ConnectionParams,
    /// Destination archive path
    pub output: PathBuf,
    /// Parent directory for the staging area, system temp dir when unset
    pub staging_dir: Option<PathBuf>,
    /// Suppress all progress output
    pub quiet: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            staging_dir: None,
            quiet: false,
        }
    }
}

impl ExportConfig {
    pub fn new(database: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            connection: ConnectionParams::new(database),
            output: output.into(),
            ..Default::default()
        }
    }

    /// Load a configuration file
    ///
    /// ```toml
    /// output = "backups/shop.zip"
    ///
    /// [connection]
    /// database = "shop"
    /// host = "db.internal"
    /// user = "backup"
    /// password = "secret"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExportError::io(format!("reading {}", path.display()), e))?;
        Self::from_toml(&content)
            .map_err(|e| ExportError::Argument(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject configurations that cannot produce an archive
    pub fn validate(&self) -> Result<()> {
        if self.connection.database.trim().is_empty() {
            return Err(ExportError::Argument(
                "a database name is required (--database)".to_string(),
            ));
        }
        if self.output.as_os_str().is_empty() {
            return Err(ExportError::Argument(
                "the destination archive path cannot be empty".to_string(),
            ));
        }
        if self.output.is_dir() {
            return Err(ExportError::Argument(format!(
                "destination '{}' is a directory",
                self.output.display()
            )));
        }
        Ok(())
    }
}
