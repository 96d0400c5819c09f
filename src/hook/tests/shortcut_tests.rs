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

//! Dispatcher tests: shortcut engagement, scopes and table generations

use crate::core::compile;
use crate::core::types::{
    Condition, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget, Shortcut,
};
use crate::hook::publish::TableHandle;
use crate::hook::simulate::{render_events, Simulator};
use crate::hook::Disposition;

const A: KeyCode = KeyCode(0x41);
const B: KeyCode = KeyCode(0x42);
const C: KeyCode = KeyCode(0x43);
const D: KeyCode = KeyCode(0x44);
const E: KeyCode = KeyCode(0x45);

/// Helper: shortcut -> shortcut rule
fn chord_rule(source: &[KeyCode], target: &[KeyCode]) -> RemapRule {
    RemapRule::new(
        RemapSource::Chord(Shortcut::new(source.iter().copied())),
        RemapTarget::Chord(Shortcut::new(target.iter().copied())),
    )
}

fn simulator(rules: Vec<RemapRule>) -> Simulator {
    Simulator::from_tables(compile(&RemapBuffer::from(rules)))
}

#[test]
fn test_engage_and_release_terminal_key_first() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::ALT, B],
    )]);

    sim.press(KeyCode::LCONTROL);
    assert_eq!(sim.press(A), Disposition::Suppress);
    assert_eq!(sim.dispatcher().engaged_count(), 1);
    assert!(sim.is_held(KeyCode::LALT));
    assert!(!sim.is_held(KeyCode::LCONTROL));

    assert_eq!(sim.release(A), Disposition::Suppress);
    assert_eq!(sim.dispatcher().engaged_count(), 0);
    // Source modifier re-asserted while still physically held
    assert!(sim.is_held(KeyCode::LCONTROL));

    assert_eq!(sim.release(KeyCode::LCONTROL), Disposition::Forward);

    assert_eq!(
        render_events(sim.delivered()),
        "LCtrl+ VK_0xFF-* LCtrl-* LAlt+* B+* B-* LAlt-* LCtrl+* LCtrl-"
    );
}

#[test]
fn test_release_modifier_first() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::ALT, B],
    )]);

    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    sim.take_delivered();

    // Already released synthetically, so the physical Up is hidden
    assert_eq!(sim.release(KeyCode::LCONTROL), Disposition::Suppress);
    assert_eq!(sim.dispatcher().engaged_count(), 0);
    assert_eq!(render_events(sim.delivered()), "B-* LAlt-*");

    // Its Down was suppressed, so the terminal key Up is too
    assert_eq!(sim.release(A), Disposition::Suppress);
    assert_eq!(render_events(sim.delivered()), "B-* LAlt-*");
}

#[test]
fn test_shared_modifier_sends_terminal_key_only() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::CONTROL, B],
    )]);

    sim.press(KeyCode::RCONTROL);
    sim.tap(A);
    sim.release(KeyCode::RCONTROL);

    assert_eq!(
        render_events(sim.delivered()),
        "RCtrl+ B+* B-* RCtrl-"
    );
}

#[test]
fn test_auto_repeat_while_engaged() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::ALT, B],
    )]);

    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    sim.take_delivered();

    sim.press(A);
    sim.press(A);
    assert_eq!(render_events(sim.delivered()), "B+* B+*");
}

#[test]
fn test_shortcut_to_key() {
    let rule = RemapRule::new(
        RemapSource::Chord(Shortcut::new([KeyCode::CONTROL, KeyCode::SHIFT, A])),
        RemapTarget::Key(B),
    );
    let mut sim = simulator(vec![rule]);

    sim.press(KeyCode::LCONTROL);
    sim.press(KeyCode::LSHIFT);
    sim.take_delivered();

    sim.press(A);
    assert_eq!(
        render_events(&sim.take_delivered()),
        "VK_0xFF-* LCtrl-* LShift-* B+*"
    );

    sim.release(A);
    assert_eq!(
        render_events(&sim.take_delivered()),
        "B-* LCtrl+* LShift+*"
    );
}

#[test]
fn test_generic_destination_uses_left_side() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::RCONTROL, A],
        &[KeyCode::WIN, E],
    )]);

    sim.press(KeyCode::RCONTROL);
    sim.press(A);
    assert!(sim.is_held(KeyCode::LWIN));
    assert!(sim.is_held(E));
}

#[test]
fn test_side_specific_source_ignores_other_side() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::RCONTROL, A],
        &[KeyCode::ALT, B],
    )]);

    sim.press(KeyCode::LCONTROL);
    assert_eq!(sim.press(A), Disposition::Forward);
    assert_eq!(sim.dispatcher().engaged_count(), 0);
}

#[test]
fn test_extra_modifier_prevents_match() {
    let mut sim = simulator(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::ALT, B],
    )]);

    sim.press(KeyCode::LCONTROL);
    sim.press(KeyCode::LSHIFT);
    assert_eq!(sim.press(A), Disposition::Forward);
}

#[test]
fn test_most_specific_shortcut_wins() {
    let mut sim = simulator(vec![
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, B]),
        chord_rule(&[KeyCode::CONTROL, KeyCode::SHIFT, A], &[KeyCode::CONTROL, C]),
    ]);

    sim.press(KeyCode::LCONTROL);
    sim.press(KeyCode::LSHIFT);
    sim.press(A);
    assert!(sim.is_held(C));
    assert!(!sim.is_held(B));
}

#[test]
fn test_app_table_takes_precedence_over_global() {
    let rules = vec![
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, B]),
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, C]).in_app("code.exe"),
    ];

    let mut sim = simulator(rules.clone());
    sim.set_foreground(Some("Code.exe"));
    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    assert!(sim.is_held(C));

    let mut sim = simulator(rules.clone());
    sim.set_foreground(Some("notepad.exe"));
    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    assert!(sim.is_held(B));

    // Unknown focus falls back to the global table
    let mut sim = simulator(rules);
    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    assert!(sim.is_held(B));
}

#[test]
fn test_app_only_shortcut_ignored_elsewhere() {
    let rules = vec![chord_rule(&[KeyCode::ALT, D], &[KeyCode::CONTROL, E]).in_app("code.exe")];

    let mut sim = simulator(rules);
    sim.set_foreground(Some("firefox.exe"));
    sim.press(KeyCode::LALT);
    assert_eq!(sim.press(D), Disposition::Forward);
}

#[test]
fn test_single_key_remap_wins_over_shortcut() {
    let mut sim = simulator(vec![
        RemapRule::new(RemapSource::Key(A), RemapTarget::Key(D)),
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, B]),
    ]);

    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    assert!(sim.is_held(D));
    assert!(!sim.is_held(B));
    assert_eq!(sim.dispatcher().engaged_count(), 0);
}

#[test]
fn test_single_key_modifier_feeds_shortcut_layer() {
    // CapsLock acts as Ctrl, and Ctrl+A is remapped
    let caps = KeyCode(0x14);
    let mut sim = simulator(vec![
        RemapRule::new(RemapSource::Key(caps), RemapTarget::Key(KeyCode::LCONTROL)),
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::ALT, B]),
    ]);

    sim.press(caps);
    sim.press(A);
    assert!(sim.is_held(B));
    assert!(sim.is_held(KeyCode::LALT));
}

#[test]
fn test_held_back_modifier_engages_shortcut() {
    // LCtrl tapped alone is Escape; held with A it is still Ctrl for Ctrl+A
    let escape = KeyCode(0x1B);
    let mut sim = simulator(vec![
        RemapRule::new(RemapSource::Key(KeyCode::LCONTROL), RemapTarget::Key(escape))
            .when(Condition::Alone),
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::ALT, B]),
    ]);

    assert_eq!(sim.press(KeyCode::LCONTROL), Disposition::Suppress);
    assert_eq!(sim.press(A), Disposition::Suppress);
    assert_eq!(sim.dispatcher().engaged_count(), 1);
    assert!(sim.is_held(KeyCode::LALT));
    assert!(sim.is_held(B));
    assert!(!sim.is_held(KeyCode::LCONTROL));

    sim.release(A);
    sim.release(KeyCode::LCONTROL);

    assert_eq!(
        render_events(sim.delivered()),
        "LCtrl+* VK_0xFF-* LCtrl-* LAlt+* B+* B-* LAlt-* LCtrl+* LCtrl-"
    );
    assert!(!sim.is_held(escape));
}

#[test]
fn test_new_generation_releases_engagement() {
    let handle = TableHandle::new(compile(&RemapBuffer::from(vec![chord_rule(
        &[KeyCode::CONTROL, A],
        &[KeyCode::ALT, B],
    )])));
    let mut sim = Simulator::new(handle.clone());

    sim.press(KeyCode::LCONTROL);
    sim.press(A);
    assert!(sim.is_held(KeyCode::LALT));

    handle.clear();
    assert_eq!(sim.press(C), Disposition::Forward);

    assert_eq!(sim.dispatcher().engaged_count(), 0);
    assert!(!sim.is_held(KeyCode::LALT));
    assert!(!sim.is_held(B));
    assert!(sim.is_held(KeyCode::LCONTROL));

    // The terminal key went down under the old generation
    assert_eq!(sim.release(A), Disposition::Suppress);
}

#[test]
fn test_disabled_shortcut_swallows_terminal_key() {
    let rule = RemapRule::new(
        RemapSource::Chord(Shortcut::new([KeyCode::CONTROL, A])),
        RemapTarget::disabled(),
    );
    let mut sim = simulator(vec![rule]);

    sim.press(KeyCode::LCONTROL);
    sim.take_delivered();

    assert_eq!(sim.press(A), Disposition::Suppress);
    assert_eq!(sim.release(A), Disposition::Suppress);
    assert_eq!(render_events(sim.delivered()), "VK_0xFF-* LCtrl-* LCtrl+*");
}
