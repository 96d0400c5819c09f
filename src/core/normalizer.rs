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

//! Generic vs. Left/Right modifier normalisation
//!
//! Works in both directions:
//! - **Expand** (runtime direction): a generic modifier such as `Ctrl` becomes
//!   its physical `LCtrl` and `RCtrl` variants, because the OS only ever
//!   reports physical keys.
//! - **Merge** (storage direction): `LCtrl -> X` together with `RCtrl -> X`
//!   collapses into a single `Ctrl -> X` rule.
//!
//! All functions are total over `KeyCode`; non-modifier keys pass through.

use crate::core::types::{
    KeyCode, ModifierKind, ModifierSide, RemapBuffer, RemapRule, RemapSource, Shortcut,
};

/// Physical variants of a modifier family, left first.
pub fn physical_sides(kind: ModifierKind) -> [KeyCode; 2] {
    [kind.key(ModifierSide::Left), kind.key(ModifierSide::Right)]
}

/// Expands a key into the physical keys it stands for.
///
/// `Ctrl` → `[LCtrl, RCtrl]`; every other key (including side-specific
/// modifiers) maps to itself.
pub fn expand(key: KeyCode) -> Vec<KeyCode> {
    match key.modifier() {
        Some((kind, ModifierSide::Generic)) => physical_sides(kind).to_vec(),
        _ => vec![key],
    }
}

/// The physical key emitted when synthesizing `key`.
///
/// Generic modifiers are sent as their Left variant; `Win` in particular has
/// no generic virtual key the OS would accept.
pub fn to_physical(key: KeyCode) -> KeyCode {
    match key.modifier() {
        Some((kind, ModifierSide::Generic)) => kind.key(ModifierSide::Left),
        _ => key,
    }
}

/// Expands a shortcut into every side-specific shortcut it matches.
///
/// `Ctrl+Shift+A` yields four shortcuts (`LCtrl+LShift+A` ... `RCtrl+RShift+A`).
pub fn expand_shortcut(shortcut: &Shortcut) -> Vec<Shortcut> {
    let mut expanded = vec![Shortcut::new(shortcut.action_key())];

    for modifier in shortcut.modifiers() {
        expanded = expanded
            .into_iter()
            .flat_map(|partial| {
                expand(*modifier).into_iter().map(move |side| {
                    let mut next = partial.clone();
                    next.set_key(side);
                    next
                })
            })
            .collect();
    }

    expanded
}

/// Merges the two sides of one modifier family into the generic key.
///
/// Returns `None` unless `a` and `b` are opposite sides of the same family.
pub fn merge(a: KeyCode, b: KeyCode) -> Option<KeyCode> {
    match (a.modifier(), b.modifier()) {
        (Some((kind_a, side_a)), Some((kind_b, side_b)))
            if kind_a == kind_b
                && matches!(
                    (side_a, side_b),
                    (ModifierSide::Left, ModifierSide::Right)
                        | (ModifierSide::Right, ModifierSide::Left)
                ) =>
        {
            Some(kind_a.key(ModifierSide::Generic))
        }
        _ => None,
    }
}

/// Returns true when two keys share at least one physical key.
///
/// `Ctrl` overlaps `LCtrl`; `LCtrl` does not overlap `RCtrl`.
pub fn overlaps(a: KeyCode, b: KeyCode) -> bool {
    if a == b {
        return true;
    }

    match (a.modifier(), b.modifier()) {
        (Some((kind_a, side_a)), Some((kind_b, side_b))) => {
            kind_a == kind_b
                && (side_a == ModifierSide::Generic || side_b == ModifierSide::Generic)
        }
        _ => false,
    }
}

/// Returns true when some physical key press would match both shortcuts.
///
/// Both need the same terminal key and the same modifier families, with each
/// family's sides overlapping.
pub fn shortcuts_overlap(a: &Shortcut, b: &Shortcut) -> bool {
    if a.action_key() != b.action_key() || a.modifiers().len() != b.modifiers().len() {
        return false;
    }

    a.modifiers()
        .iter()
        .zip(b.modifiers())
        .all(|(ma, mb)| overlaps(*ma, *mb))
}

/// Storage-direction normalisation of a rule buffer.
///
/// For every single-key rule whose source is a side-specific modifier, looks
/// for a rule with the opposite side in the same scope and condition. If both
/// map to the same target they are collapsed into one generic rule at the
/// position of the first; otherwise both stay distinct. Shortcut rules and all
/// other keys are copied unchanged.
pub fn pre_process_remap_table(buffer: &RemapBuffer) -> RemapBuffer {
    let rules = buffer.rules();
    let mut consumed = vec![false; rules.len()];
    let mut merged = Vec::with_capacity(rules.len());

    for (i, rule) in rules.iter().enumerate() {
        if consumed[i] {
            continue;
        }

        let partner = match rule.source {
            RemapSource::Key(key) => side_to_generic(key).and_then(|generic| {
                rules
                    .iter()
                    .enumerate()
                    .skip(i + 1)
                    .find(|(j, other)| {
                        !consumed[*j]
                            && other.scope == rule.scope
                            && other.condition == rule.condition
                            && other.target == rule.target
                            && matches!(other.source, RemapSource::Key(o) if merge(key, o).is_some())
                    })
                    .map(|(j, _)| (j, generic))
            }),
            RemapSource::Chord(_) => None,
        };

        match partner {
            Some((j, generic)) if !has_generic_rule(rules, rule, generic) => {
                consumed[j] = true;
                merged.push(RemapRule {
                    source: RemapSource::Key(generic),
                    ..rule.clone()
                });
            }
            _ => merged.push(rule.clone()),
        }
    }

    RemapBuffer::from(merged)
}

/// Generic key for a side-specific modifier.
fn side_to_generic(key: KeyCode) -> Option<KeyCode> {
    match key.modifier() {
        Some((kind, ModifierSide::Left | ModifierSide::Right)) => {
            Some(kind.key(ModifierSide::Generic))
        }
        _ => None,
    }
}

/// A generic rule already present in the same scope/condition blocks merging;
/// collapsing would manufacture a duplicate.
fn has_generic_rule(rules: &[RemapRule], rule: &RemapRule, generic: KeyCode) -> bool {
    rules.iter().any(|other| {
        other.scope == rule.scope
            && other.condition == rule.condition
            && other.source == RemapSource::Key(generic)
    })
}
