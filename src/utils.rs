// ABOUTME: Utility functions for display formatting and resource cleanup
// ABOUTME: Duration/size formatting, identifier sanitizing and stale staging removal

use crate::commands::export::STAGING_PREFIX;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Sanitize an identifier (table name, column name) for display
///
/// Removes control characters and limits length so catalog names cannot
/// garble progress lines.
///
/// **Note**: This is for display purposes only. Query strings are built in
/// [`crate::dump::query`].
///
/// # Examples
///
/// ```
/// # use mysql_dump::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
///
/// let long_name = "a".repeat(200);
/// assert_eq!(sanitize_identifier(&long_name).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Format an elapsed duration into a short human-readable string
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use mysql_dump::utils::format_duration;
/// assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < 3_600_000 {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    } else {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        format!("{}h {}m", hours, minutes)
    }
}

/// Format bytes into human-readable string
///
/// Converts byte count into appropriate units (B, KB, MB, GB, TB)
/// with one decimal place of precision.
///
/// # Examples
///
/// ```
/// # use mysql_dump::utils::format_bytes;
/// assert_eq!(format_bytes(1024), "1.0 KB");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(1073741824), "1.0 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_idx])
}

/// Remove staging directories older than `max_age_secs` from the system temp dir
///
/// Staging directories are removed at the end of every run, but a process
/// killed with SIGKILL never gets there. Returns how many were removed.
pub fn cleanup_stale_staging_dirs(max_age_secs: u64) -> io::Result<usize> {
    cleanup_stale_staging_dirs_in(&std::env::temp_dir(), Duration::from_secs(max_age_secs))
}

fn cleanup_stale_staging_dirs_in(root: &Path, max_age: Duration) -> io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_dir() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => {
                tracing::debug!("Removed stale staging directory {}", entry.path().display());
                removed += 1;
            }
            Err(e) => tracing::warn!(
                "Failed to remove stale staging directory {}: {}",
                entry.path().display(),
                e
            ),
        }
    }

    Ok(removed)
}
