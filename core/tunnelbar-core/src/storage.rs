//! Storage configuration and path management for tunnelbar.
//!
//! All file paths tunnelbar touches are decided here, so tests can inject a
//! temp directory with [`StorageConfig::with_root`] instead of touching `~`.

use std::path::{Path, PathBuf};

use crate::error::{Result, TunnelbarError};

/// Central configuration for all tunnelbar storage paths.
///
/// Production code uses [`StorageConfig::from_home`] which points to
/// `~/.tunnelbar/`. Tests use [`StorageConfig::with_root`] for isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all tunnelbar data (default: ~/.tunnelbar)
    root: PathBuf,
}

impl StorageConfig {
    /// Resolves the default root under the user's home directory.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(TunnelbarError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".tunnelbar"),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml (polling, capacity, command overrides).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to data.json (favorites and recent locations).
    pub fn data_file(&self) -> PathBuf {
        self.root.join("data.json")
    }

    /// Path to logs/ directory (daily rolling CLI logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs_err::create_dir_all(self.logs_dir())
            .map_err(|e| TunnelbarError::io("Failed to create tunnelbar directories", e))
    }
}
