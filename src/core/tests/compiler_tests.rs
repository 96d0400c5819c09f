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

//! Compiler module tests
//!
//! Tests for turning rule buffers into runtime tables:
//! - Full reset semantics
//! - Generic modifier expansion
//! - Defensive skipping of malformed entries
//! - Global vs. per-application shortcut tables

use crate::core::compiler::*;
use crate::core::types::{
    Condition, KeyCode, RemapBuffer, RemapRule, RemapSource, RemapTarget, Shortcut,
};

use super::{chord_rule, chord_to_key, key_rule, key_to_chord, A, B, C, D};

#[test]
fn test_single_key_empty_buffer_yields_empty_table() {
    let table = apply_single_key_remappings(&RemapBuffer::new());
    assert!(table.is_empty());
    assert_eq!(table.len(), 0);
}

#[test]
fn test_single_key_skips_incomplete_target() {
    let buffer = RemapBuffer::from(vec![
        key_rule(A, B),
        RemapRule::new(
            RemapSource::Key(C),
            RemapTarget::Chord(Shortcut::new([KeyCode::CONTROL])),
        ),
    ]);

    let table = apply_single_key_remappings(&buffer);
    assert_eq!(table.len(), 1);
    assert_eq!(table.lookup(A, Condition::Always), Some(&RemapTarget::Key(B)));
    assert!(!table.contains(C));
}

#[test]
fn test_single_key_expands_generic_modifier() {
    let buffer = RemapBuffer::from(vec![key_rule(KeyCode::CONTROL, A)]);

    let table = apply_single_key_remappings(&buffer);
    assert_eq!(table.len(), 2);
    assert!(table.contains(KeyCode::LCONTROL));
    assert!(table.contains(KeyCode::RCONTROL));
    assert!(!table.contains(KeyCode::CONTROL));
}

#[test]
fn test_single_key_keeps_one_entry_per_condition() {
    let buffer = RemapBuffer::from(vec![
        key_rule(A, B).when(Condition::Alone),
        key_rule(A, C).when(Condition::Combination),
    ]);

    let table = apply_single_key_remappings(&buffer);
    assert_eq!(table.get(A).len(), 2);
    assert_eq!(table.lookup(A, Condition::Alone), Some(&RemapTarget::Key(B)));
    assert_eq!(
        table.lookup(A, Condition::Combination),
        Some(&RemapTarget::Key(C))
    );
    assert_eq!(table.lookup(A, Condition::Always), None);
}

#[test]
fn test_single_key_ignores_app_scope_and_shortcuts() {
    let buffer = RemapBuffer::from(vec![
        key_rule(A, B).in_app("code.exe"),
        chord_to_key(&[KeyCode::CONTROL, C], D),
    ]);

    assert!(apply_single_key_remappings(&buffer).is_empty());
}

#[test]
fn test_shortcut_tables_split_by_scope() {
    let buffer = RemapBuffer::from(vec![
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, B]),
        chord_rule(&[KeyCode::CONTROL, A], &[KeyCode::CONTROL, C]).in_app("Code.exe"),
        chord_to_key(&[KeyCode::ALT, D], C).in_app("firefox.exe"),
        key_rule(A, B),
    ]);

    let (global, apps) = apply_shortcut_remappings(&buffer);
    assert_eq!(global.len(), 1);
    assert_eq!(apps.len(), 2);
    assert_eq!(apps["code.exe"].len(), 1);
    assert_eq!(apps["firefox.exe"].len(), 1);

    let entry = apps["code.exe"]
        .get(&Shortcut::new([KeyCode::CONTROL, A]))
        .unwrap();
    assert_eq!(
        entry.target,
        RemapTarget::Chord(Shortcut::new([KeyCode::CONTROL, C]))
    );
}

#[test]
fn test_shortcut_tables_omit_incomplete_entries() {
    let buffer = RemapBuffer::from(vec![
        chord_rule(&[KeyCode::CONTROL], &[KeyCode::CONTROL, B]),
        chord_rule(&[KeyCode::CONTROL, A], &[B]),
        chord_rule(&[KeyCode::ALT, A], &[KeyCode::CONTROL, B]),
    ]);

    let (global, apps) = apply_shortcut_remappings(&buffer);
    assert_eq!(global.len(), 1);
    assert!(apps.is_empty());
    assert!(global.get(&Shortcut::new([KeyCode::ALT, A])).is_some());
}

#[test]
fn test_shortcut_candidates_most_specific_first() {
    let buffer = RemapBuffer::from(vec![
        chord_to_key(&[KeyCode::CONTROL, A], B),
        chord_to_key(&[KeyCode::CONTROL, KeyCode::SHIFT, A], C),
        chord_to_key(&[KeyCode::ALT, B], D),
    ]);

    let (global, _) = apply_shortcut_remappings(&buffer);
    let modifier_counts: Vec<usize> = global
        .candidates(A)
        .map(|entry| entry.source.modifiers().len())
        .collect();
    assert_eq!(modifier_counts, vec![2, 1]);
    assert_eq!(global.candidates(C).count(), 0);
}

#[test]
fn test_compile_assigns_unique_slots() {
    let buffer = RemapBuffer::from(vec![
        chord_to_key(&[KeyCode::CONTROL, A], B),
        chord_to_key(&[KeyCode::CONTROL, A], C).in_app("code.exe"),
        chord_to_key(&[KeyCode::ALT, A], D),
        key_to_chord(D, &[KeyCode::WIN, A]),
    ]);

    let tables = compile(&buffer);
    assert_eq!(tables.slot_count(), 3);
    assert_eq!(tables.single_keys.len(), 1);

    let mut slots: Vec<usize> = tables
        .global_shortcuts
        .entries()
        .iter()
        .chain(tables.app_shortcuts.values().flat_map(|t| t.entries()))
        .map(|entry| entry.slot)
        .collect();
    slots.sort_unstable();
    assert_eq!(slots, vec![0, 1, 2]);

    for slot in 0..3 {
        assert_eq!(tables.entry_for_slot(slot).map(|e| e.slot), Some(slot));
    }
    assert!(tables.entry_for_slot(3).is_none());
}

#[test]
fn test_compile_empty_buffer() {
    let tables = compile(&RemapBuffer::new());
    assert!(tables.is_empty());
    assert_eq!(tables.slot_count(), 0);
}
