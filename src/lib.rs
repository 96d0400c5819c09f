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

//! keyremap
//!
//! A keyboard remapping engine: a rule compiler that validates and
//! normalises user-authored remaps, and a low-level hook dispatcher that
//! applies them to live keyboard input.
//!
//! # Features
//!
//! - **Single-key remaps:** key to key, key to shortcut, or disabled,
//!   with `always`, `alone` and `combination` conditions
//! - **Shortcut remaps:** shortcut to shortcut or key, globally or per
//!   application
//! - **Generic vs. Left/Right modifiers:** `Ctrl` matches either side;
//!   matching Left/Right pairs are merged on save
//! - **Conflict detection:** duplicate sources per (scope, condition) are
//!   rejected before anything is saved or applied
//! - **Atomic operations:** timestamped backups and atomic writes
//! - **Hot reload:** rules file edits are republished without a restart
//!
//! # Architecture
//!
//! - **`core`:** Pure logic (types, parser, normaliser, validation, compiler)
//! - **`hook`:** Event dispatcher, input synthesis, table publication, and an
//!   OS simulator for testing
//! - **`platform`:** Windows `WH_KEYBOARD_LL` hook and `SendInput` backend
//! - **`engine`:** `apply` / `enable` / `disable` lifecycle
//! - **`config`:** Rules file loading, transactions, backups, watching
//!
//! # Examples
//!
//! ## Checking a rules file
//!
//! ```no_run
//! use keyremap::core::parser::parse_rules_file;
//! use keyremap::core::{check_if_remappings_are_valid, RemapErrorKind};
//! use std::path::Path;
//!
//! let content = std::fs::read_to_string("remaps.conf")?;
//! let buffer = parse_rules_file(&content, Path::new("remaps.conf"))?;
//!
//! if check_if_remappings_are_valid(&buffer) == RemapErrorKind::NoError {
//!     println!("{} rules OK", buffer.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Replaying keys through the dispatcher
//!
//! ```
//! use keyremap::core::{compile, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget};
//! use keyremap::hook::Simulator;
//!
//! let buffer = RemapBuffer::from(vec![RemapRule::new(
//!     RemapSource::Key(KeyCode(0x41)),
//!     RemapTarget::Key(KeyCode(0x42)),
//! )]);
//!
//! let mut sim = Simulator::from_tables(compile(&buffer));
//! sim.tap(KeyCode(0x41));
//! assert!(sim.delivered().iter().all(|e| e.key == KeyCode(0x42)));
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod hook;
pub mod platform;

// Re-export commonly used types for convenience
pub use core::{Condition, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget, Scope, Shortcut};
pub use engine::{EngineError, RemapEngine};
