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

//! Remapping engine lifecycle
//!
//! `RemapEngine` is what a host drives: `apply()` validates, compiles and
//! publishes a rule buffer; `enable()` and `disable()` attach and detach the
//! keyboard hook. Both toggles are idempotent.
//!
//! # Example
//!
//! ```no_run
//! use keyremap::core::parser::parse_rules_file;
//! use keyremap::engine::RemapEngine;
//! use std::path::Path;
//!
//! let buffer = parse_rules_file("remap = CapsLock, Escape\n", Path::new("inline"))?;
//!
//! let mut engine = RemapEngine::new();
//! engine.apply(&buffer)?;
//! engine.enable()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;
use tracing::info;

use crate::core::compiler::compile;
use crate::core::types::RemapBuffer;
use crate::core::validator::{validate_buffer, ValidationError};
use crate::hook::TableHandle;
use crate::platform::{install_hook, HookInstaller, InstalledHook};

/// Errors from the engine and the platform hook
#[derive(Debug, Error)]
pub enum EngineError {
    /// The buffer failed validation; the live tables were left untouched
    #[error("Remapping rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("Failed to install keyboard hook: {0}")]
    HookInstall(String),

    #[error("Failed to remove keyboard hook: {0}")]
    HookUninstall(String),

    /// No low-level keyboard hook on this platform
    #[error("Keyboard hooks are not supported on {0}")]
    Unsupported(String),
}

pub struct RemapEngine {
    tables: TableHandle,
    hook: Option<Box<dyn InstalledHook>>,
    installer: HookInstaller,
}

impl RemapEngine {
    /// Engine using the platform keyboard hook
    pub fn new() -> Self {
        Self::with_installer(install_hook)
    }

    /// Engine using a custom hook installer
    pub fn with_installer(installer: HookInstaller) -> Self {
        Self {
            tables: TableHandle::default(),
            hook: None,
            installer,
        }
    }

    /// Shared handle to the live tables
    pub fn tables(&self) -> &TableHandle {
        &self.tables
    }

    /// Validates and compiles `buffer`, then publishes the result.
    ///
    /// An invalid buffer is rejected as a whole and the previous tables stay
    /// live.
    pub fn apply(&self, buffer: &RemapBuffer) -> Result<(), EngineError> {
        publish_buffer(&self.tables, buffer)
    }

    /// Installs the keyboard hook. Does nothing if already enabled.
    pub fn enable(&mut self) -> Result<(), EngineError> {
        if self.hook.is_some() {
            return Ok(());
        }

        self.hook = Some((self.installer)(self.tables.clone())?);
        info!("Remapping enabled");
        Ok(())
    }

    /// Removes the hook and publishes empty tables. Does nothing if already
    /// disabled.
    pub fn disable(&mut self) -> Result<(), EngineError> {
        let Some(mut hook) = self.hook.take() else {
            return Ok(());
        };

        hook.uninstall()?;
        self.tables.clear();
        info!("Remapping disabled");
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.hook.is_some()
    }
}

impl Default for RemapEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RemapEngine {
    fn drop(&mut self) {
        if let Some(mut hook) = self.hook.take() {
            let _ = hook.uninstall();
        }
    }
}

/// Validates, compiles and publishes `buffer` to `tables`.
///
/// Usable from any thread holding a clone of the handle, e.g. a reload
/// watcher. On rejection the live generation is left as it was.
pub fn publish_buffer(tables: &TableHandle, buffer: &RemapBuffer) -> Result<(), EngineError> {
    validate_buffer(buffer)?;
    tables.publish(compile(buffer));
    Ok(())
}
