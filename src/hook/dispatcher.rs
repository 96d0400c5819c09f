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

//! Low-level keyboard event state machine
//!
//! `HookDispatcher::handle` runs once per keyboard event on the hook thread
//! and decides whether the physical event is forwarded or suppressed. Layers,
//! in priority order:
//!
//! 1. **Injected input**: events carrying `INJECTED_MARKER` are forwarded
//!    untouched.
//! 2. **Single-key remaps**: `Always` fires on Down. `Alone`/`Combination`
//!    keys are held back until the next event decides which one applies.
//!    A consumed event never reaches the shortcut layer.
//! 3. **Shortcut remaps**: the focused application's table first, then the
//!    global table. A shortcut matches when its terminal key goes Down and
//!    exactly its modifier families are held.
//! 4. Anything else is forwarded.
//!
//! # Engagement
//! ```text
//!            terminal Down, modifiers match
//!   IDLE ─────────────────────────────────────▶ ENGAGED
//!    ▲   [dummy↑] [src mods↑] [dst mods↓] [dst↓]   │ terminal Down (repeat): [dst↓]
//!    │                                             │
//!    └─────────────────────────────────────────────┘
//!        terminal Up or source modifier Up:
//!        [dst↑] [dst mods↑] [held src mods↓]
//! ```
//!
//! Engagement state lives in a vector indexed by `ShortcutEntry::slot`, owned
//! by the dispatcher and never shared with the configuration thread. When a
//! new table generation is published, everything the old generation pressed
//! is released before the new tables are used.
//!
//! The dispatcher is fail-open: misses, short injections and unknown focus
//! all end in the physical event being forwarded or suppressed as already
//! decided, never in an error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::core::compiler::{CompiledTables, ShortcutEntry};
use crate::core::normalizer::{overlaps, physical_sides, to_physical};
use crate::core::types::{Condition, KeyCode, ModifierKind, RemapTarget, Shortcut};
use crate::hook::backend::InputBackend;
use crate::hook::publish::TableHandle;
use crate::hook::synth::{InputBatch, KeyEvent, KeyTransition};

/// The platform detaches hooks that stall; warn well before that happens.
const HOOK_BUDGET: Duration = Duration::from_millis(10);

/// What happens to the physical event
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    Forward,
    Suppress,
}

/// Runtime state of one engaged shortcut
#[derive(Clone, Debug, PartialEq)]
struct Engagement {
    /// Terminal key of the source shortcut
    trigger: KeyCode,
    /// Source modifiers as written (may be generic)
    modifiers: Vec<KeyCode>,
    /// Destination terminal key (`Null` for disabled shortcuts)
    key: KeyCode,
    /// Held source modifiers released on engagement
    released: Vec<KeyCode>,
    /// Destination modifiers pressed on engagement
    pressed: Vec<KeyCode>,
}

pub struct HookDispatcher<B: InputBackend> {
    backend: B,
    tables: TableHandle,
    generation: Arc<CompiledTables>,
    engaged: Vec<Option<Engagement>>,
    /// Single-key sources whose target is currently pressed
    fired: HashMap<KeyCode, RemapTarget>,
    /// Single-key source waiting for Alone/Combination resolution
    pending: Option<KeyCode>,
    /// Physical keys currently down
    physical: HashSet<KeyCode>,
    /// Keys whose Down was suppressed, so their Up must be too
    swallowed: HashSet<KeyCode>,
    /// Keys pressed by injection during the current event. The OS key state
    /// does not include them until the hook returns.
    replayed: HashSet<KeyCode>,
}

impl<B: InputBackend> HookDispatcher<B> {
    pub fn new(backend: B, tables: TableHandle) -> Self {
        let generation = tables.current();
        Self {
            backend,
            tables,
            engaged: idle_slots(generation.slot_count()),
            generation,
            fired: HashMap::new(),
            pending: None,
            physical: HashSet::new(),
            swallowed: HashSet::new(),
            replayed: HashSet::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Number of shortcuts currently engaged
    pub fn engaged_count(&self) -> usize {
        self.engaged.iter().flatten().count()
    }

    /// Processes one event from the global keyboard stream.
    pub fn handle(&mut self, event: KeyEvent) -> Disposition {
        if event.is_injected() {
            trace!("Forwarding injected {}", event);
            return Disposition::Forward;
        }

        let start = Instant::now();
        self.replayed.clear();
        self.refresh_generation();

        match event.transition {
            KeyTransition::Down => self.physical.insert(event.key),
            KeyTransition::Up => self.physical.remove(&event.key),
        };

        let interrupts = event.is_down() && self.pending.is_some_and(|key| key != event.key);

        let mut disposition = match self.dispatch_single_key(event) {
            Some(disposition) => disposition,
            None => self.dispatch_shortcut(event),
        };

        if interrupts && disposition == Disposition::Forward {
            // Injected output of the held-back key must reach the application first
            let mut batch = InputBatch::new();
            batch.press(event.key);
            self.inject(batch);
            disposition = Disposition::Suppress;
        }

        let elapsed = start.elapsed();
        if elapsed > HOOK_BUDGET {
            warn!("Keyboard hook processing took {:?} for {}", elapsed, event);
        }

        disposition
    }

    /// Releases every key this dispatcher holds down synthetically.
    ///
    /// Engaged shortcuts are disengaged, fired single-key targets released and
    /// a held-back key is replayed.
    pub fn release_all(&mut self) {
        let mut batch = InputBatch::new();

        for slot in self.engaged.iter_mut() {
            if let Some(engagement) = slot.take() {
                batch.append(disengage(&engagement, &self.physical));
            }
        }

        for (key, target) in self.fired.drain() {
            batch.release_target(&target);
            if self.physical.contains(&key) {
                self.swallowed.insert(key);
            }
        }

        if let Some(key) = self.pending.take() {
            batch.press(key);
        }

        self.inject(batch);
    }

    fn refresh_generation(&mut self) {
        let current = self.tables.current();
        if Arc::ptr_eq(&current, &self.generation) {
            return;
        }

        if self.engaged_count() > 0 || !self.fired.is_empty() || self.pending.is_some() {
            debug!("Table generation changed; releasing synthesized keys");
            self.release_all();
        }

        self.engaged = idle_slots(current.slot_count());
        self.generation = current;
    }

    // ------------------------------------------------------------------
    // Single-key layer
    // ------------------------------------------------------------------

    fn dispatch_single_key(&mut self, event: KeyEvent) -> Option<Disposition> {
        let key = event.key;

        match event.transition {
            KeyTransition::Down => {
                if let Some(target) = self.fired.get(&key) {
                    // Auto-repeat repeats the terminal key only
                    let mut batch = InputBatch::new();
                    if let Some(terminal) = target.terminal_key() {
                        batch.press(to_physical(terminal));
                    }
                    self.inject(batch);
                    return Some(Disposition::Suppress);
                }

                match self.pending {
                    Some(pending) if pending == key => return Some(Disposition::Suppress),
                    Some(pending) => self.resolve_interrupted(pending),
                    None => {}
                }

                let generation = Arc::clone(&self.generation);
                let remaps = generation.single_keys.get(key);
                if remaps.is_empty() {
                    return None;
                }

                let target_for = |condition: Condition| {
                    remaps
                        .iter()
                        .find(|remap| remap.condition == condition)
                        .map(|remap| remap.target.clone())
                };

                if let Some(target) = target_for(Condition::Always) {
                    self.fire(key, target);
                    return Some(Disposition::Suppress);
                }

                if self.physical.iter().any(|&other| other != key) {
                    let target = target_for(Condition::Combination)?;
                    self.fire(key, target);
                    return Some(Disposition::Suppress);
                }

                debug!("Holding back {} until the next event", key);
                self.pending = Some(key);
                Some(Disposition::Suppress)
            }
            KeyTransition::Up => {
                if self.pending == Some(key) {
                    self.pending = None;
                    self.resolve_alone(key);
                    return Some(Disposition::Suppress);
                }

                let target = self.fired.remove(&key)?;
                let mut batch = InputBatch::new();
                batch.release_target(&target);
                self.inject(batch);
                Some(Disposition::Suppress)
            }
        }
    }

    fn fire(&mut self, key: KeyCode, target: RemapTarget) {
        debug!("Remapping {} -> {}", key, target);
        let mut batch = InputBatch::new();
        batch.press_target(&target);
        self.inject(batch);
        self.fired.insert(key, target);
    }

    /// Another key went Down while `key` was held back.
    fn resolve_interrupted(&mut self, key: KeyCode) {
        self.pending = None;
        match self.generation.single_keys.lookup(key, Condition::Combination) {
            Some(target) => {
                let target = target.clone();
                self.replayed.extend(target_keys(&target));
                self.fire(key, target);
            }
            None => {
                let mut batch = InputBatch::new();
                batch.press(key);
                self.inject(batch);
                self.replayed.insert(key);
            }
        }
    }

    /// `key` went Up with nothing pressed in between.
    fn resolve_alone(&mut self, key: KeyCode) {
        let mut batch = InputBatch::new();
        match self.generation.single_keys.lookup(key, Condition::Alone) {
            Some(target) => {
                debug!("Remapping lone {} -> {}", key, target);
                batch.press_target(target).release_target(target);
            }
            None => {
                batch.tap(key);
            }
        }
        self.inject(batch);
    }

    // ------------------------------------------------------------------
    // Shortcut layer
    // ------------------------------------------------------------------

    fn dispatch_shortcut(&mut self, event: KeyEvent) -> Disposition {
        match event.transition {
            KeyTransition::Down => self.shortcut_down(event.key),
            KeyTransition::Up => self.shortcut_up(event.key),
        }
    }

    fn shortcut_down(&mut self, key: KeyCode) -> Disposition {
        let repeat = self
            .engaged
            .iter()
            .flatten()
            .find(|engagement| engagement.trigger == key)
            .map(|engagement| engagement.key);

        if let Some(destination) = repeat {
            let mut batch = InputBatch::new();
            batch.press(destination);
            self.inject(batch);
            return Disposition::Suppress;
        }

        let generation = Arc::clone(&self.generation);
        match self.find_shortcut(&generation, key) {
            Some(entry) => {
                self.engage(entry);
                self.swallowed.insert(key);
                Disposition::Suppress
            }
            None => {
                self.swallowed.remove(&key);
                Disposition::Forward
            }
        }
    }

    fn shortcut_up(&mut self, key: KeyCode) -> Disposition {
        let mut suppress = self.swallowed.remove(&key);
        let mut batch = InputBatch::new();

        for slot in self.engaged.iter_mut() {
            let Some(engagement) = slot.as_ref() else {
                continue;
            };

            if engagement.trigger == key {
                debug!("Disengaging on terminal key release of {}", key);
                batch.append(disengage(engagement, &self.physical));
                suppress = true;
                *slot = None;
            } else if engagement.modifiers.iter().any(|&m| overlaps(m, key)) {
                debug!("Disengaging on modifier release of {}", key);
                batch.append(disengage(engagement, &self.physical));
                // The application already saw this modifier go up
                suppress |= engagement.released.contains(&key);
                *slot = None;
            }
        }

        self.inject(batch);

        if suppress {
            Disposition::Suppress
        } else {
            Disposition::Forward
        }
    }

    /// Finds the entry matching `key` plus the held modifiers.
    fn find_shortcut<'t>(
        &self,
        tables: &'t CompiledTables,
        key: KeyCode,
    ) -> Option<&'t ShortcutEntry> {
        if !tables.app_shortcuts.is_empty() {
            match self.backend.foreground_process() {
                Some(process) => {
                    let entry = tables
                        .app_shortcuts
                        .get(&process.to_lowercase())
                        .and_then(|table| {
                            table
                                .candidates(key)
                                .find(|entry| self.modifiers_match(&entry.source))
                        });
                    if entry.is_some() {
                        return entry;
                    }
                }
                None => trace!("Focused process unknown; using global shortcuts"),
            }
        }

        tables
            .global_shortcuts
            .candidates(key)
            .find(|entry| self.modifiers_match(&entry.source))
    }

    /// Every source modifier family is held, and no other family is.
    fn modifiers_match(&self, source: &Shortcut) -> bool {
        ModifierKind::ALL.iter().all(|&kind| {
            let sides = physical_sides(kind);
            match source.modifier_of(kind) {
                Some(required) => sides
                    .iter()
                    .any(|&side| overlaps(required, side) && self.is_held(side)),
                None => !sides.iter().any(|&side| self.is_held(side)),
            }
        })
    }

    fn is_held(&self, key: KeyCode) -> bool {
        self.replayed.contains(&key) || self.backend.is_key_held(key)
    }

    fn engage(&mut self, entry: &ShortcutEntry) {
        let destination_modifiers: &[KeyCode] = match &entry.target {
            RemapTarget::Chord(shortcut) => shortcut.modifiers(),
            RemapTarget::Key(_) => &[],
        };
        let destination = entry
            .target
            .terminal_key()
            .map(to_physical)
            .unwrap_or(KeyCode::NULL);

        // Held source modifiers the destination does not keep
        let mut released = Vec::new();
        for &modifier in entry.source.modifiers() {
            let Some((kind, _)) = modifier.modifier() else {
                continue;
            };
            for side in physical_sides(kind) {
                if overlaps(modifier, side)
                    && self.is_held(side)
                    && !destination_modifiers.iter().any(|&d| overlaps(d, side))
                {
                    released.push(side);
                }
            }
        }

        // Destination modifiers not already held
        let mut pressed = Vec::new();
        for &modifier in destination_modifiers {
            let Some((kind, _)) = modifier.modifier() else {
                continue;
            };
            let held = physical_sides(kind).iter().any(|&side| {
                overlaps(modifier, side)
                    && self.is_held(side)
                    && !released.contains(&side)
            });
            if !held {
                pressed.push(to_physical(modifier));
            }
        }

        let mut batch = InputBatch::new();
        if !released.is_empty() {
            batch.release(KeyCode::DUMMY);
        }
        for &key in &released {
            batch.release(key);
        }
        for &key in &pressed {
            batch.press(key);
        }
        batch.press(destination);

        debug!("Engaging {} -> {}", entry.source, entry.target);
        self.inject(batch);

        let engagement = Engagement {
            trigger: entry.source.action_key().unwrap_or(KeyCode::NULL),
            modifiers: entry.source.modifiers().to_vec(),
            key: destination,
            released,
            pressed,
        };

        match self.engaged.get_mut(entry.slot) {
            Some(slot) => *slot = Some(engagement),
            None => warn!("Shortcut slot {} outside the current generation", entry.slot),
        }
    }

    fn inject(&mut self, batch: InputBatch) {
        if batch.is_empty() {
            return;
        }

        let requested = batch.len();
        let delivered = self.backend.send_input(batch.events());
        if delivered < requested {
            warn!(
                "Input injection delivered {} of {} events",
                delivered, requested
            );
        }
    }
}

/// Releases the destination and re-presses released source modifiers that
/// are still physically held.
fn disengage(engagement: &Engagement, physical: &HashSet<KeyCode>) -> InputBatch {
    let mut batch = InputBatch::new();
    batch.release(engagement.key);
    for &key in engagement.pressed.iter().rev() {
        batch.release(key);
    }
    for &key in &engagement.released {
        if physical.contains(&key) {
            batch.press(key);
        }
    }
    batch
}

/// Physical keys `InputBatch::press_target` presses for `target`.
fn target_keys(target: &RemapTarget) -> Vec<KeyCode> {
    match target {
        RemapTarget::Key(key) => vec![to_physical(*key)],
        RemapTarget::Chord(shortcut) => shortcut.keys().map(to_physical).collect(),
    }
}

fn idle_slots(count: usize) -> Vec<Option<Engagement>> {
    let mut slots = Vec::with_capacity(count);
    slots.resize_with(count, || None);
    slots
}
