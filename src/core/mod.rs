// Copyright 2025 bakri (tidynest@proton.me)
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

//! src/core/mod.rs
//!
//! Core remapping logic
//!
//! This module contains the data structures and algorithms that turn a
//! user-authored rule set into runtime lookup tables:
//! - Type definitions for keys, shortcuts and rules
//! - Generic vs. Left/Right modifier normalisation
//! - Duplicate-source detection per (scope, condition)
//! - Buffer validation and orphaned-key reporting
//! - Compilation into single-key and shortcut tables
//! - Rules file parsing
//!
//! Nothing here touches the OS, so every layer is unit-testable on any
//! platform. All of it runs on the configuration thread, never in the hook.

pub mod compiler;
pub mod conflict;
pub mod keys;
pub mod normalizer;
pub mod parser;
pub mod types;
pub mod validator;

pub use compiler::{compile, CompiledTables, ShortcutTable, SingleKeyTable};
pub use conflict::{Conflict, ConflictDetector};
pub use types::*;
pub use validator::{
    check_if_remappings_are_valid, get_orphaned_keys, validate_buffer, RemapErrorKind,
    ValidationError,
};

#[cfg(test)]
mod tests;
