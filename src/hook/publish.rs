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

//! Publication of compiled table generations
//!
//! The configuration thread compiles a complete `CompiledTables` and swaps it
//! in with `publish`. The hook thread takes its own `Arc` to the current
//! generation per event, so it always works on one self-consistent set and a
//! new generation can be detected with `Arc::ptr_eq`.

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::core::compiler::CompiledTables;

/// Shared slot holding the live table generation
#[derive(Clone, Debug, Default)]
pub struct TableHandle {
    current: Arc<RwLock<Arc<CompiledTables>>>,
}

impl TableHandle {
    pub fn new(tables: CompiledTables) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(tables))),
        }
    }

    /// Replaces the live generation in one step.
    pub fn publish(&self, tables: CompiledTables) {
        let next = Arc::new(tables);
        info!(
            "Publishing tables: {} single-key entries, {} shortcut entries",
            next.single_keys.len(),
            next.slot_count()
        );

        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Publishes tables that remap nothing.
    pub fn clear(&self) {
        self.publish(CompiledTables::empty());
    }

    /// The live generation.
    pub fn current(&self) -> Arc<CompiledTables> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}
