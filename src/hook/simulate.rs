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

//! In-memory stand-in for the OS input stack
//!
//! `Simulator` drives a `HookDispatcher` the way the platform does:
//! - Suppressed events vanish
//! - Forwarded events reach the "application" and update key state
//! - Injected events are queued and re-enter the dispatcher after the event
//!   that produced them, exactly like `SendInput` output re-enters a
//!   low-level hook
//!
//! Used by the dispatcher tests and by the `simulate` command.

use std::collections::{HashSet, VecDeque};

use crate::core::compiler::CompiledTables;
use crate::core::keys::key_from_name;
use crate::core::types::KeyCode;
use crate::hook::backend::InputBackend;
use crate::hook::dispatcher::{Disposition, HookDispatcher};
use crate::hook::publish::TableHandle;
use crate::hook::synth::{KeyEvent, KeyTransition};

/// `InputBackend` over in-memory key state
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    held: HashSet<KeyCode>,
    queue: VecDeque<KeyEvent>,
    sent: Vec<KeyEvent>,
    foreground: Option<String>,
    delivery_limit: Option<usize>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_foreground(&mut self, process: Option<&str>) {
        self.foreground = process.map(str::to_string);
    }

    /// Caps how many events one `send_input` call accepts.
    pub fn set_delivery_limit(&mut self, limit: Option<usize>) {
        self.delivery_limit = limit;
    }

    /// Every event accepted by `send_input`, in order.
    pub fn sent(&self) -> &[KeyEvent] {
        &self.sent
    }

    /// Records an event the application received.
    fn apply(&mut self, event: &KeyEvent) {
        match event.transition {
            KeyTransition::Down => self.held.insert(event.key),
            KeyTransition::Up => self.held.remove(&event.key),
        };
    }

    fn next_injected(&mut self) -> Option<KeyEvent> {
        self.queue.pop_front()
    }
}

impl InputBackend for SimulatedBackend {
    fn send_input(&mut self, events: &[KeyEvent]) -> usize {
        let accepted = self
            .delivery_limit
            .map_or(events.len(), |limit| limit.min(events.len()));

        for event in events.iter().take(accepted) {
            self.queue.push_back(*event);
            self.sent.push(*event);
        }

        accepted
    }

    fn is_key_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    fn foreground_process(&self) -> Option<String> {
        self.foreground.clone()
    }
}

/// Dispatcher wired to a simulated OS
pub struct Simulator {
    dispatcher: HookDispatcher<SimulatedBackend>,
    delivered: Vec<KeyEvent>,
}

impl Simulator {
    pub fn new(tables: TableHandle) -> Self {
        Self {
            dispatcher: HookDispatcher::new(SimulatedBackend::new(), tables),
            delivered: Vec::new(),
        }
    }

    pub fn from_tables(tables: CompiledTables) -> Self {
        Self::new(TableHandle::new(tables))
    }

    /// Sends one physical event and everything it causes to be injected.
    ///
    /// Returns the disposition of the physical event.
    pub fn feed(&mut self, event: KeyEvent) -> Disposition {
        let disposition = self.deliver(event);
        self.flush();
        disposition
    }

    /// Releases everything the dispatcher holds down, as on shutdown.
    pub fn release_all(&mut self) {
        self.dispatcher.release_all();
        self.flush();
    }

    pub fn press(&mut self, key: KeyCode) -> Disposition {
        self.feed(KeyEvent::down(key))
    }

    pub fn release(&mut self, key: KeyCode) -> Disposition {
        self.feed(KeyEvent::up(key))
    }

    pub fn tap(&mut self, key: KeyCode) {
        self.press(key);
        self.release(key);
    }

    pub fn set_foreground(&mut self, process: Option<&str>) {
        self.dispatcher.backend_mut().set_foreground(process);
    }

    /// Events the application received, in order.
    pub fn delivered(&self) -> &[KeyEvent] {
        &self.delivered
    }

    pub fn take_delivered(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.delivered)
    }

    /// Whether the application currently sees `key` held.
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.dispatcher.backend().is_key_held(key)
    }

    pub fn dispatcher(&self) -> &HookDispatcher<SimulatedBackend> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut HookDispatcher<SimulatedBackend> {
        &mut self.dispatcher
    }

    fn flush(&mut self) {
        while let Some(injected) = self.dispatcher.backend_mut().next_injected() {
            self.deliver(injected);
        }
    }

    fn deliver(&mut self, event: KeyEvent) -> Disposition {
        let disposition = self.dispatcher.handle(event);
        if disposition == Disposition::Forward {
            self.dispatcher.backend_mut().apply(&event);
            self.delivered.push(event);
        }
        disposition
    }
}

/// Parses an event token such as `A+` (Down) or `LCtrl-` (Up).
pub fn parse_event(token: &str) -> Option<KeyEvent> {
    let token = token.trim();
    let transition = match token.chars().last()? {
        '+' => KeyTransition::Down,
        '-' => KeyTransition::Up,
        _ => return None,
    };

    let name = &token[..token.len() - 1];
    key_from_name(name).map(|key| KeyEvent::physical(key, transition))
}

/// Renders events as a space-separated token list.
pub fn render_events(events: &[KeyEvent]) -> String {
    events
        .iter()
        .map(KeyEvent::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
