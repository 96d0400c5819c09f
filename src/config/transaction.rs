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

//! Rules file transaction with automatic backup
//!
//! Saving a buffer is all-or-nothing:
//! 1. `begin()` - Creates a timestamped backup immediately
//! 2. `commit()` - Validates, merges Left/Right pairs, writes atomically
//! 3. `rollback()` - Restores the backup taken in `begin()`

use atomic_write_file::AtomicWriteFile;
use std::{fs, io::Write, path::Path, path::PathBuf};
use tracing::{debug, warn};

use crate::config::{ConfigError, ConfigManager};
use crate::core::normalizer::pre_process_remap_table;
use crate::core::parser::format_rules;
use crate::core::types::RemapBuffer;
use crate::core::validator::{check_if_remappings_are_valid, validate_buffer, RemapErrorKind};

/// Atomic rules file transaction with automatic backup.
///
/// # Example
///
/// ```no_run
/// use keyremap::config::{ConfigManager, ConfigTransaction};
/// use std::path::PathBuf;
///
/// let manager = ConfigManager::new(PathBuf::from("remaps.conf"))?;
/// let buffer = manager.load()?;
///
/// let tx = ConfigTransaction::begin(&manager)?;
/// match tx.commit(&buffer) {
///     Ok(saved) => println!("Saved {} rules", saved.len()),
///     Err(e) => eprintln!("Save rejected: {}", e),
/// }
/// # Ok::<(), keyremap::config::ConfigError>(())
/// ```
pub struct ConfigTransaction<'a> {
    manager: &'a ConfigManager,
    backup_path: PathBuf,
}

impl<'a> ConfigTransaction<'a> {
    /// Begins a new transaction by creating a timestamped backup.
    ///
    /// The transaction cannot outlive the manager it borrows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules file cannot be read or the backup
    /// cannot be written. Nothing is modified in that case.
    pub fn begin(manager: &'a ConfigManager) -> Result<Self, ConfigError> {
        let backup_path = manager.create_timestamped_backup()?;

        Ok(Self {
            manager,
            backup_path,
        })
    }

    /// Path of the backup taken when the transaction began
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Validates `buffer` and writes it atomically.
    ///
    /// The whole buffer is rejected if any rule is invalid. Accepted buffers
    /// are normalised (Left/Right pairs with the same target merge into the
    /// generic modifier) before being written. Returns the buffer as saved.
    ///
    /// This method consumes the transaction, preventing accidental
    /// double-commits.
    pub fn commit(self, buffer: &RemapBuffer) -> Result<RemapBuffer, ConfigError> {
        if check_if_remappings_are_valid(buffer) == RemapErrorKind::RemapUnsuccessful {
            if let Err(reason) = validate_buffer(buffer) {
                warn!("Not saving {}: {}", self.manager.config_path().display(), reason);
                return Err(ConfigError::ValidationFailed(reason));
            }
        }

        let merged = pre_process_remap_table(buffer);
        debug!(
            "Saving {} rules ({} before merging)",
            merged.len(),
            buffer.len()
        );

        self.commit_content(&format_rules(&merged))?;
        Ok(merged)
    }

    /// Writes `new_content` verbatim, without validation.
    ///
    /// The backup created during `begin()` remains available for rollback.
    pub fn commit_content(self, new_content: &str) -> Result<(), ConfigError> {
        atomic_write(self.manager.config_path(), new_content)
    }

    /// Restores the rules file to its state when the transaction began.
    ///
    /// Borrows `self`, so it can be retried.
    pub fn rollback(&self) -> Result<(), ConfigError> {
        let backup_content = fs::read_to_string(&self.backup_path).map_err(|e| {
            ConfigError::BackupFailed(format!(
                "Cannot read backup {}: {}",
                self.backup_path.display(),
                e
            ))
        })?;

        atomic_write(self.manager.config_path(), &backup_content)
    }
}

/// Replaces `path` with `content` via temp file and rename.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), ConfigError> {
    let mut file = AtomicWriteFile::options().open(path).map_err(|e| {
        ConfigError::WriteFailed(format!("Failed to open for atomic write: {}", e))
    })?;

    file.write_all(content.as_bytes())
        .map_err(|e| ConfigError::WriteFailed(format!("Failed to write content: {}", e)))?;

    file.commit()
        .map_err(|e| ConfigError::WriteFailed(format!("Failed to commit atomic write: {}", e)))?;

    Ok(())
}
