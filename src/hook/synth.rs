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

//! Synthetic input construction
//!
//! Every event this engine injects is built here and stamped with
//! `INJECTED_MARKER` in its extra-info field. The OS hands injected events
//! back to the same low-level hook, and the dispatcher forwards anything
//! carrying the marker without looking at it again.
//!
//! An `InputBatch` is emitted in array order and treated as one indivisible
//! unit by the dispatcher, even though the platform delivers its events one at
//! a time.

use serde::Serialize;
use std::fmt;

use crate::core::normalizer::to_physical;
use crate::core::types::{KeyCode, RemapTarget};

/// Extra-info tag carried by every synthesized event ("KRMP")
pub const INJECTED_MARKER: usize = 0x4B52_4D50;

/// Direction of a key event
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum KeyTransition {
    Down,
    Up,
}

/// One keyboard event as seen by, or sent from, the low-level hook
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub transition: KeyTransition,
    pub scan_code: u32,
    pub extra_info: usize,
}

impl KeyEvent {
    /// Event coming from the keyboard itself
    pub fn physical(key: KeyCode, transition: KeyTransition) -> Self {
        Self {
            key,
            transition,
            scan_code: 0,
            extra_info: 0,
        }
    }

    pub fn down(key: KeyCode) -> Self {
        Self::physical(key, KeyTransition::Down)
    }

    pub fn up(key: KeyCode) -> Self {
        Self::physical(key, KeyTransition::Up)
    }

    /// Event produced by this engine
    pub fn injected(key: KeyCode, transition: KeyTransition) -> Self {
        Self {
            extra_info: INJECTED_MARKER,
            ..Self::physical(key, transition)
        }
    }

    pub fn is_injected(&self) -> bool {
        self.extra_info == INJECTED_MARKER
    }

    pub fn is_down(&self) -> bool {
        self.transition == KeyTransition::Down
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.transition {
            KeyTransition::Down => '+',
            KeyTransition::Up => '-',
        };
        write!(f, "{}{}", self.key, sign)?;
        if self.is_injected() {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Ordered batch of synthetic key events
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InputBatch {
    events: Vec<KeyEvent>,
}

impl InputBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a key Down. `Null` keys are skipped.
    pub fn press(&mut self, key: KeyCode) -> &mut Self {
        self.push(key, KeyTransition::Down)
    }

    /// Appends a key Up. `Null` keys are skipped.
    pub fn release(&mut self, key: KeyCode) -> &mut Self {
        self.push(key, KeyTransition::Up)
    }

    pub fn tap(&mut self, key: KeyCode) -> &mut Self {
        self.press(key).release(key)
    }

    /// Presses a target: modifiers in canonical order, then the terminal key.
    pub fn press_target(&mut self, target: &RemapTarget) -> &mut Self {
        match target {
            RemapTarget::Key(key) => self.press(to_physical(*key)),
            RemapTarget::Chord(shortcut) => {
                for key in shortcut.keys() {
                    self.press(to_physical(key));
                }
                self
            }
        }
    }

    /// Releases a target in the reverse order of `press_target`.
    pub fn release_target(&mut self, target: &RemapTarget) -> &mut Self {
        match target {
            RemapTarget::Key(key) => self.release(to_physical(*key)),
            RemapTarget::Chord(shortcut) => {
                let keys: Vec<KeyCode> = shortcut.keys().collect();
                for key in keys.into_iter().rev() {
                    self.release(to_physical(key));
                }
                self
            }
        }
    }

    /// Appends every event of another batch.
    pub fn append(&mut self, other: InputBatch) -> &mut Self {
        self.events.extend(other.events);
        self
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(&mut self, key: KeyCode, transition: KeyTransition) -> &mut Self {
        if !key.is_null() {
            self.events.push(KeyEvent::injected(key, transition));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Shortcut;

    const A: KeyCode = KeyCode(0x41);

    #[test]
    fn test_every_event_is_marked() {
        let mut batch = InputBatch::new();
        batch.tap(A).press(KeyCode::LSHIFT);

        assert_eq!(batch.len(), 3);
        assert!(batch.events().iter().all(KeyEvent::is_injected));
    }

    #[test]
    fn test_physical_event_is_not_marked() {
        assert!(!KeyEvent::down(A).is_injected());
    }

    #[test]
    fn test_chord_press_and_release_order() {
        let target = RemapTarget::Chord(Shortcut::new([A, KeyCode::SHIFT, KeyCode::WIN]));

        let mut batch = InputBatch::new();
        batch.press_target(&target).release_target(&target);

        let rendered: Vec<String> = batch.events().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["LWin+*", "LShift+*", "A+*", "A-*", "LShift-*", "LWin-*"]
        );
    }

    #[test]
    fn test_disabled_target_emits_nothing() {
        let mut batch = InputBatch::new();
        batch
            .press_target(&RemapTarget::disabled())
            .release_target(&RemapTarget::disabled());
        assert!(batch.is_empty());
    }
}
