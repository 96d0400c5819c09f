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

//! src/hook/mod.rs
//!
//! Runtime side of the engine
//!
//! Everything here runs on the hook thread, one event at a time:
//! - `synth`: Construction and tagging of injected input
//! - `backend`: The `InputBackend` seam to the OS
//! - `publish`: Hand-over of compiled table generations
//! - `dispatcher`: The per-event state machine
//! - `simulate`: An in-memory OS for tests and dry runs

pub mod backend;
pub mod dispatcher;
pub mod publish;
pub mod simulate;
pub mod synth;

pub use backend::InputBackend;
pub use dispatcher::{Disposition, HookDispatcher};
pub use publish::TableHandle;
pub use simulate::{SimulatedBackend, Simulator};
pub use synth::{InputBatch, KeyEvent, KeyTransition, INJECTED_MARKER};

#[cfg(test)]
mod tests;
