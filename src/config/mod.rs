// Copyright 2025 Eric Jingryd (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rules file management with atomic writes and backup support.
//!
//! This module provides safe, transactional operations for the remap rules
//! file. Key features:
//!
//! - **Atomic writes**: Uses temp-file-then-rename to prevent corruption
//! - **Automatic backups**: Every write creates a timestamped backup
//! - **Validated saves**: A buffer that fails validation is never written
//! - **Hot reload**: `FileWatcher` reports edits made outside the tool
//!
//! # Example
//!
//! ```no_run
//! use keyremap::config::ConfigManager;
//!
//! let manager = ConfigManager::new(ConfigManager::default_path())?;
//! let buffer = manager.load()?;
//!
//! // Validate, merge Left/Right pairs, back up and write atomically
//! manager.begin_transaction()?.commit(&buffer)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
pub mod transaction;
pub mod watcher;

pub use error::ConfigError;
pub use transaction::ConfigTransaction;
pub use watcher::FileWatcher;

use chrono::{Local, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::parser::parse_rules_file;
use crate::core::types::RemapBuffer;

/// Where rules live unless `--config` says otherwise
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/keyremap/remaps.conf";

const BACKUP_TIMESTAMP: &str = "%Y-%m-%d_%H%M%S";

/// Manages the rules file with safe atomic operations.
///
/// Reads are direct; all writes go through `ConfigTransaction` so that a
/// backup exists before the file changes.
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
    backup_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager for the given rules file.
    ///
    /// The file must exist. A `backups` directory is created next to it if
    /// needed. Symlinked files are allowed but logged.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file doesn't exist.
    /// Returns `ConfigError::BackupDirNotWritable` if the backup directory
    /// cannot be created.
    pub fn new(config_path: PathBuf) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }

        if config_path.read_link().is_ok() {
            warn!("Rules file is a symlink: {}", config_path.display());
        }

        // e.g. ~/.config/keyremap/remaps.conf → ~/.config/keyremap/backups/
        let backup_dir = config_path
            .parent()
            .ok_or_else(|| {
                ConfigError::BackupDirNotWritable(PathBuf::from(
                    "Rules file has no parent directory",
                ))
            })?
            .join("backups");

        if !backup_dir.exists() {
            fs::create_dir_all(&backup_dir)
                .map_err(|_| ConfigError::BackupDirNotWritable(backup_dir.clone()))?;
        }

        if backup_dir.metadata()?.permissions().readonly() {
            return Err(ConfigError::BackupDirNotWritable(backup_dir));
        }

        Ok(Self {
            config_path,
            backup_dir,
        })
    }

    /// Default rules file location with `~` expanded
    pub fn default_path() -> PathBuf {
        expand_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Reads the current rules file content.
    pub fn read_config(&self) -> Result<String, ConfigError> {
        Ok(fs::read_to_string(&self.config_path)?)
    }

    /// Reads and parses the rules file.
    ///
    /// Parsing does not validate; see `core::validator`.
    pub fn load(&self) -> Result<RemapBuffer, ConfigError> {
        let content = self.read_config()?;
        Ok(parse_rules_file(&content, &self.config_path)?)
    }

    /// Starts a transaction, backing up the current file.
    pub fn begin_transaction(&self) -> Result<ConfigTransaction<'_>, ConfigError> {
        ConfigTransaction::begin(self)
    }

    /// Copies the current file to `backups/<name>.<timestamp>`.
    pub fn create_timestamped_backup(&self) -> Result<PathBuf, ConfigError> {
        let content = fs::read_to_string(&self.config_path)?;
        let timestamp = Local::now().format(BACKUP_TIMESTAMP);

        let backup_path = self
            .backup_dir
            .join(format!("{}.{}", self.file_name()?, timestamp));

        fs::write(&backup_path, &content)?;
        info!("Created backup {}", backup_path.display());

        Ok(backup_path)
    }

    /// Backups of this rules file, newest first.
    ///
    /// Files in the backup directory that don't follow the
    /// `<name>.<timestamp>` pattern are ignored.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let prefix = format!("{}.", self.file_name()?);

        let mut backups: Vec<(NaiveDateTime, PathBuf)> = fs::read_dir(&self.backup_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let stamp = name.strip_prefix(&prefix)?;
                let parsed = NaiveDateTime::parse_from_str(stamp, BACKUP_TIMESTAMP).ok()?;
                Some((parsed, path))
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Deletes all but the `keep` most recent backups.
    ///
    /// Returns how many were deleted.
    pub fn cleanup_old_backups(&self, keep: usize) -> Result<usize, ConfigError> {
        let backups = self.list_backups()?;
        let mut deleted = 0;

        for old in backups.iter().skip(keep) {
            fs::remove_file(old)?;
            deleted += 1;
        }

        Ok(deleted)
    }

    /// Restores the rules file from a backup.
    ///
    /// The current file is backed up first, so a restore can itself be undone.
    pub fn restore_backup(&self, backup_path: &Path) -> Result<(), ConfigError> {
        if !backup_path.exists() {
            return Err(ConfigError::BackupFailed(format!(
                "Backup file does not exist: {}",
                backup_path.display()
            )));
        }
        if !backup_path.is_file() {
            return Err(ConfigError::BackupFailed(format!(
                "Backup path is not a file: {}",
                backup_path.display()
            )));
        }

        let content = fs::read_to_string(backup_path)?;
        self.create_timestamped_backup()?;
        transaction::atomic_write(&self.config_path, &content)?;

        info!("Restored rules from {}", backup_path.display());
        Ok(())
    }

    fn file_name(&self) -> Result<&str, ConfigError> {
        self.config_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ConfigError::BackupFailed(format!(
                    "Rules path has no usable file name: {}",
                    self.config_path.display()
                ))
            })
    }
}

/// Expands `~` and environment variables in a user-supplied path.
///
/// Paths that fail to expand (unset variables, non-UTF-8) are returned as is.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str().map(shellexpand::full) {
        Some(Ok(expanded)) => PathBuf::from(expanded.as_ref()),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests;
