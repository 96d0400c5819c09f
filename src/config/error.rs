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

use std::path::PathBuf;
use thiserror::Error;

use crate::core::parser::ParseError;
use crate::core::validator::ValidationError;

/// Errors that can occur during rules file management.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Rules file does not exist.
    #[error("Rules file not found: {0}")]
    NotFound(PathBuf),
    /// Backup directory cannot be created or written to.
    #[error("Backup directory not writable: {0}")]
    BackupDirNotWritable(PathBuf),
    /// Failed to create or restore a backup file.
    #[error("Failed to create backup: {0}")]
    BackupFailed(String),
    /// Atomic write operation failed.
    #[error("Atomic write failed: {0}")]
    WriteFailed(String),
    /// Rules file could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Rule buffer failed validation; nothing was written.
    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    /// File watcher could not be set up.
    #[error("Failed to watch rules file: {0}")]
    Watch(#[from] notify::Error),
    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
