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

//! OS seam of the dispatcher
//!
//! The dispatcher never talks to the platform directly. Everything it needs
//! from the OS goes through `InputBackend`: the Windows hook implements it on
//! top of `SendInput`/`GetAsyncKeyState`, and `hook::simulate` implements it
//! in memory for tests and the `simulate` command.

use crate::core::types::KeyCode;
use crate::hook::synth::KeyEvent;

/// Input injection, key-state queries and focus resolution
pub trait InputBackend {
    /// Injects events in order.
    ///
    /// Returns how many events the platform accepted, which may be fewer than
    /// requested.
    fn send_input(&mut self, events: &[KeyEvent]) -> usize;

    /// Whether a physical key is logically held right now, including keys
    /// held by injected input. Queried outside the event stream.
    fn is_key_held(&self, key: KeyCode) -> bool;

    /// Executable name of the process owning the focused window, if known.
    fn foreground_process(&self) -> Option<String>;
}
