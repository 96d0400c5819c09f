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

//! Rule buffer → runtime lookup tables
//!
//! Compilation always starts from empty tables (full reset, never a merge with
//! a previous generation). It is expected to run on buffers that already
//! passed validation, but stays robust to programmatic input: malformed
//! entries are dropped one by one and logged, never failing the whole apply.
//!
//! # Table shapes
//! - `SingleKeyTable`: physical key → remaps per condition. Generic modifiers
//!   are always expanded to their Left/Right keys.
//! - `ShortcutTable`: immutable arena of shortcut entries, indexed by terminal
//!   key. Each entry carries a `slot` unique across the whole `CompiledTables`
//!   generation; the dispatcher keeps its engagement state in a parallel array
//!   indexed by that slot.
//! - `AppShortcutTable`: lower-cased process name → `ShortcutTable`.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::core::normalizer::expand;
use crate::core::types::{
    Condition, KeyCode, RemapBuffer, RemapSource, RemapTarget, Scope, Shortcut,
};

/// A single-key remap as stored at runtime
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SingleKeyRemap {
    pub target: RemapTarget,
    pub condition: Condition,
}

/// Physical key → remaps, at most one per condition
#[derive(Clone, Debug, Default, Serialize)]
pub struct SingleKeyTable {
    entries: HashMap<KeyCode, Vec<SingleKeyRemap>>,
}

impl SingleKeyTable {
    /// Inserts a remap unless the key already has one for this condition.
    ///
    /// Returns false when the entry was skipped.
    pub fn insert(&mut self, key: KeyCode, remap: SingleKeyRemap) -> bool {
        let remaps = self.entries.entry(key).or_default();
        if remaps.iter().any(|r| r.condition == remap.condition) {
            return false;
        }
        remaps.push(remap);
        true
    }

    /// All remaps of a physical key (empty when unmapped).
    pub fn get(&self, key: KeyCode) -> &[SingleKeyRemap] {
        self.entries.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lookup(&self, key: KeyCode, condition: Condition) -> Option<&RemapTarget> {
        self.get(key)
            .iter()
            .find(|r| r.condition == condition)
            .map(|r| &r.target)
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.entries.contains_key(&key)
    }

    /// Number of (key, condition) entries
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key code, for stable display.
    pub fn sorted(&self) -> Vec<(KeyCode, &SingleKeyRemap)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .flat_map(|(key, remaps)| remaps.iter().map(move |r| (*key, r)))
            .collect();
        all.sort_by_key(|(key, remap)| (*key, remap.condition));
        all
    }
}

/// One shortcut remap in a compiled table
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ShortcutEntry {
    pub source: Shortcut,
    pub target: RemapTarget,
    /// Index into the dispatcher's engagement array
    pub slot: usize,
}

/// Immutable shortcut arena indexed by terminal key
#[derive(Clone, Debug, Default, Serialize)]
pub struct ShortcutTable {
    entries: Vec<ShortcutEntry>,
    #[serde(skip)]
    by_action: HashMap<KeyCode, Vec<usize>>,
}

impl ShortcutTable {
    /// Inserts an entry unless an identical source is already present.
    ///
    /// Returns false when the entry was skipped.
    pub fn insert(&mut self, source: Shortcut, target: RemapTarget, slot: usize) -> bool {
        let Some(action) = source.action_key() else {
            return false;
        };

        if self.entries.iter().any(|e| e.source == source) {
            return false;
        }

        let index = self.entries.len();
        let modifier_count = source.modifiers().len();
        self.entries.push(ShortcutEntry {
            source,
            target,
            slot,
        });

        // Keep candidates most-specific first so Ctrl+Shift+A wins over Ctrl+A
        let candidates = self.by_action.entry(action).or_default();
        let position = candidates
            .iter()
            .position(|&i| self.entries[i].source.modifiers().len() < modifier_count)
            .unwrap_or(candidates.len());
        candidates.insert(position, index);
        true
    }

    /// Entries whose terminal key is `action`, most modifiers first.
    pub fn candidates(&self, action: KeyCode) -> impl Iterator<Item = &ShortcutEntry> + '_ {
        self.by_action
            .get(&action)
            .into_iter()
            .flatten()
            .map(|&i| &self.entries[i])
    }

    pub fn get(&self, source: &Shortcut) -> Option<&ShortcutEntry> {
        self.entries.iter().find(|e| &e.source == source)
    }

    pub fn entries(&self) -> &[ShortcutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lower-cased process name → shortcut table
pub type AppShortcutTable = HashMap<String, ShortcutTable>;

/// One complete, self-consistent generation of runtime tables
#[derive(Clone, Debug, Default, Serialize)]
pub struct CompiledTables {
    pub single_keys: SingleKeyTable,
    pub global_shortcuts: ShortcutTable,
    pub app_shortcuts: AppShortcutTable,
    slot_count: usize,
}

impl CompiledTables {
    /// Tables that remap nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of shortcut entries across the global and per-app tables.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Finds the entry owning an engagement slot.
    pub fn entry_for_slot(&self, slot: usize) -> Option<&ShortcutEntry> {
        std::iter::once(&self.global_shortcuts)
            .chain(self.app_shortcuts.values())
            .flat_map(|table| table.entries())
            .find(|entry| entry.slot == slot)
    }

    pub fn is_empty(&self) -> bool {
        self.single_keys.is_empty() && self.slot_count == 0
    }
}

/// Compiles single-key rules into a fresh table.
///
/// Generic modifier sources are expanded to both physical keys with the same
/// target. Entries with an incomplete shortcut target are skipped. The runtime
/// single-key table is global; app-scoped single-key rules are skipped.
pub fn apply_single_key_remappings(buffer: &RemapBuffer) -> SingleKeyTable {
    let mut table = SingleKeyTable::default();

    for rule in buffer {
        let RemapSource::Key(source) = rule.source else {
            continue;
        };

        if source.is_null() {
            debug!("Skipping single-key rule with empty source: {}", rule);
            continue;
        }

        if let RemapTarget::Chord(shortcut) = &rule.target {
            if !shortcut.is_complete() {
                warn!("Skipping single-key rule with incomplete target: {}", rule);
                continue;
            }
        }

        if let Scope::App(name) = &rule.scope {
            warn!(
                "Single-key rules apply globally; ignoring rule scoped to '{}': {}",
                name, rule
            );
            continue;
        }

        for key in expand(source) {
            let remap = SingleKeyRemap {
                target: rule.target.clone(),
                condition: rule.condition,
            };
            if !table.insert(key, remap) {
                warn!("Skipping duplicate single-key entry for {}: {}", key, rule);
            }
        }
    }

    table
}

/// Compiles shortcut rules into fresh global and per-application tables.
///
/// Entries with an incomplete source or target shortcut are skipped. Slots are
/// numbered from zero across both tables.
pub fn apply_shortcut_remappings(buffer: &RemapBuffer) -> (ShortcutTable, AppShortcutTable) {
    let mut global = ShortcutTable::default();
    let mut apps = AppShortcutTable::new();
    let mut next_slot = 0;

    for rule in buffer {
        let RemapSource::Chord(source) = &rule.source else {
            continue;
        };

        if !source.is_complete() {
            warn!("Skipping shortcut rule with incomplete source: {}", rule);
            continue;
        }

        if let RemapTarget::Chord(target) = &rule.target {
            if !target.is_complete() {
                warn!("Skipping shortcut rule with incomplete target: {}", rule);
                continue;
            }
        }

        let table = match &rule.scope {
            Scope::Global => &mut global,
            Scope::App(name) => apps.entry(name.clone()).or_default(),
        };

        if table.insert(source.clone(), rule.target.clone(), next_slot) {
            next_slot += 1;
        } else {
            warn!("Skipping duplicate shortcut entry: {}", rule);
        }
    }

    (global, apps)
}

/// Compiles a buffer into one complete generation of tables.
pub fn compile(buffer: &RemapBuffer) -> CompiledTables {
    let single_keys = apply_single_key_remappings(buffer);
    let (global_shortcuts, app_shortcuts) = apply_shortcut_remappings(buffer);
    let slot_count = global_shortcuts.len()
        + app_shortcuts.values().map(ShortcutTable::len).sum::<usize>();

    debug!(
        "Compiled {} single-key entries and {} shortcut entries",
        single_keys.len(),
        slot_count
    );

    CompiledTables {
        single_keys,
        global_shortcuts,
        app_shortcuts,
        slot_count,
    }
}
