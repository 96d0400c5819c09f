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

//! OS integration
//!
//! Only Windows has a low-level keyboard hook. Elsewhere `install_hook`
//! reports `EngineError::Unsupported`, and the rest of the crate (parsing,
//! validation, compilation, simulation) works unchanged.

#[cfg(windows)]
pub mod windows;

use crate::engine::EngineError;
use crate::hook::TableHandle;

/// A keyboard hook that is currently receiving events
pub trait InstalledHook {
    /// Releases every key the dispatcher holds down, then detaches the hook.
    ///
    /// Calling it twice is harmless.
    fn uninstall(&mut self) -> Result<(), EngineError>;
}

/// Signature shared by the platform installer and test doubles
pub type HookInstaller = fn(TableHandle) -> Result<Box<dyn InstalledHook>, EngineError>;

/// Installs the platform keyboard hook on the calling thread.
///
/// The calling thread must pump messages (see `run_message_loop`) for the
/// hook to receive events.
#[cfg(windows)]
pub fn install_hook(tables: TableHandle) -> Result<Box<dyn InstalledHook>, EngineError> {
    let hook = windows::KeyboardHook::install(tables)?;
    Ok(Box::new(hook))
}

#[cfg(not(windows))]
pub fn install_hook(_tables: TableHandle) -> Result<Box<dyn InstalledHook>, EngineError> {
    Err(EngineError::Unsupported(std::env::consts::OS.to_string()))
}

/// Blocks the calling thread delivering hook callbacks until the thread
/// receives a quit message.
#[cfg(windows)]
pub fn run_message_loop() -> Result<(), EngineError> {
    windows::run_message_loop();
    Ok(())
}

#[cfg(not(windows))]
pub fn run_message_loop() -> Result<(), EngineError> {
    Err(EngineError::Unsupported(std::env::consts::OS.to_string()))
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn test_install_hook_unsupported_off_windows() {
        let result = install_hook(TableHandle::default());
        assert!(matches!(result, Err(EngineError::Unsupported(_))));
    }
}
