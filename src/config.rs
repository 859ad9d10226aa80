//! Configuration and data directory setup.
//!
//! The track library lives in the platform-standard data directory:
//!
//! - Linux: `~/.local/share/setforge/library.db`
//! - macOS: `~/Library/Application Support/setforge/library.db`
//! - Windows: `%APPDATA%\setforge\library.db`
//!
//! Everything here is path resolution; connection handling lives in
//! [`crate::db`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Returns the platform-appropriate database file path, creating the
/// `setforge` data subdirectory if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the
/// subdirectory cannot be created.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("library.db"))
}

/// Returns the setforge data directory, creating it if needed.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!("Could not determine the system data directory for this platform")
    })?;

    let dir = data_dir.join("setforge");
    fs::create_dir_all(&dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Check file permissions.",
            dir.display()
        )
    })?;
    Ok(dir)
}

/// Runtime configuration. Currently just the database location, which the
/// CLI can override per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
}

impl RuntimeConfig {
    pub fn new() -> Result<Self> {
        Ok(Self {
            db_path: get_db_path()?,
        })
    }

    #[must_use]
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self { db_path }
    }
}
