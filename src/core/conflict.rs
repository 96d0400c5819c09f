//! Duplicate-source detection
//!
//! Two rules conflict when they live in the same (scope, condition) pair and
//! some physical key press would match both sources. Sources are expanded to
//! their side-specific forms first, so `Ctrl -> A` and `LCtrl -> B` collide on
//! `LCtrl`, while `LCtrl -> A` and `RCtrl -> B` never do.
//!
//! # Performance
//! - Add rule: O(e) where e = number of side-specific expansions (at most 16)
//! - List all conflicts: O(n) where n = number of indexed physical sources

use std::collections::{BTreeSet, HashMap};

use crate::core::normalizer::{expand, expand_shortcut};
use crate::core::types::{Condition, RemapRule, RemapSource, Scope};

/// One physical source within one (scope, condition) pair
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct SlotKey {
    scope: Scope,
    condition: Condition,
    source: RemapSource,
}

/// Detects rules that claim the same physical source.
///
/// Uses a HashMap keyed by expanded (scope, condition, source); a conflict
/// exists when any bucket holds two or more rules.
#[derive(Default)]
pub struct ConflictDetector {
    rules: Vec<RemapRule>,
    slots: HashMap<SlotKey, Vec<usize>>,
}

/// Represents a detected conflict between rules.
#[derive(Clone, Debug, PartialEq)]
pub struct Conflict {
    pub scope: Scope,
    pub condition: Condition,

    /// Source of the first rule involved, as written
    pub source: RemapSource,

    /// All rules claiming this source (always 2 or more), in buffer order
    pub conflicting_rules: Vec<RemapRule>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule to the detector.
    ///
    /// Rules whose source is the `Null` key are not indexed; they can never
    /// match a key press.
    pub fn add_rule(&mut self, rule: RemapRule) {
        let index = self.rules.len();

        for source in physical_sources(&rule.source) {
            self.slots
                .entry(SlotKey {
                    scope: rule.scope.clone(),
                    condition: rule.condition,
                    source,
                })
                .or_default()
                .push(index);
        }

        self.rules.push(rule);
    }

    /// Finds all conflicts.
    ///
    /// A conflict spanning several expanded sources (e.g. `Ctrl+A` vs
    /// `Ctrl+A` collides on both `LCtrl+A` and `RCtrl+A`) is reported once.
    pub fn find_conflicts(&self) -> Vec<Conflict> {
        // Indices are pushed in insertion order, so each bucket is already sorted
        let groups: BTreeSet<&Vec<usize>> = self
            .slots
            .values()
            .filter(|indices| indices.len() > 1)
            .collect();

        groups
            .into_iter()
            .map(|indices| {
                let first = &self.rules[indices[0]];
                Conflict {
                    scope: first.scope.clone(),
                    condition: first.condition,
                    source: first.source.clone(),
                    conflicting_rules: indices.iter().map(|&i| self.rules[i].clone()).collect(),
                }
            })
            .collect()
    }

    /// Checks if the source of a rule is claimed by 2 or more added rules.
    pub fn has_conflict(&self, rule: &RemapRule) -> bool {
        physical_sources(&rule.source).into_iter().any(|source| {
            let key = SlotKey {
                scope: rule.scope.clone(),
                condition: rule.condition,
                source,
            };
            self.slots
                .get(&key)
                .is_some_and(|indices| indices.len() > 1)
        })
    }

    /// Returns the total number of rules tracked.
    pub fn total_rules(&self) -> usize {
        self.rules.len()
    }
}

/// Side-specific forms of a source.
fn physical_sources(source: &RemapSource) -> Vec<RemapSource> {
    match source {
        RemapSource::Key(key) if key.is_null() => Vec::new(),
        RemapSource::Key(key) => expand(*key).into_iter().map(RemapSource::Key).collect(),
        RemapSource::Chord(shortcut) => expand_shortcut(shortcut)
            .into_iter()
            .map(RemapSource::Chord)
            .collect(),
    }
}
