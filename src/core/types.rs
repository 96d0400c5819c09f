//! src/core/types.rs
//!
//! Core type definitions for key remapping
//!
//! This module defines the value types every other layer works with:
//! - `KeyCode`: One physical key (virtual-key numbering), `KeyCode::NULL` means "disabled"
//! - `ModifierKind` / `ModifierSide`: Explicit modifier equivalence classes
//! - `Shortcut`: An ordered, deduplicated modifier set plus one terminal key
//! - `RemapSource` / `RemapTarget`: Tagged key-or-chord variants
//! - `Condition`, `Scope`, `RemapRule`, `RemapBuffer`: The user-authored rule set
//!
//! `Display` on a rule produces exactly the line the rules-file parser reads back.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::keys;

/// Identifier of one physical key.
///
/// Values follow the Windows virtual-key numbering so the platform layer can
/// pass them straight to the OS. `KeyCode::NULL` means "disabled".
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

impl KeyCode {
    /// Disabled / unset key
    pub const NULL: KeyCode = KeyCode(0);

    pub const SHIFT: KeyCode = KeyCode(0x10);
    pub const CONTROL: KeyCode = KeyCode(0x11);
    pub const ALT: KeyCode = KeyCode(0x12);
    pub const LWIN: KeyCode = KeyCode(0x5B);
    pub const RWIN: KeyCode = KeyCode(0x5C);
    pub const LSHIFT: KeyCode = KeyCode(0xA0);
    pub const RSHIFT: KeyCode = KeyCode(0xA1);
    pub const LCONTROL: KeyCode = KeyCode(0xA2);
    pub const RCONTROL: KeyCode = KeyCode(0xA3);
    pub const LALT: KeyCode = KeyCode(0xA4);
    pub const RALT: KeyCode = KeyCode(0xA5);
    /// Key code reserved for "either Win key" (the OS has no generic Win code)
    pub const WIN: KeyCode = KeyCode(0x104);

    /// Unassigned virtual key used to break up modifier-only sequences
    pub const DUMMY: KeyCode = KeyCode(0xFF);

    /// Returns true for the disabled key.
    pub fn is_null(self) -> bool {
        self == KeyCode::NULL
    }

    /// Classifies this key as a modifier, if it is one.
    pub fn modifier(self) -> Option<(ModifierKind, ModifierSide)> {
        use ModifierKind::*;
        use ModifierSide::*;

        match self {
            KeyCode::WIN => Some((Win, Generic)),
            KeyCode::LWIN => Some((Win, Left)),
            KeyCode::RWIN => Some((Win, Right)),
            KeyCode::CONTROL => Some((Ctrl, Generic)),
            KeyCode::LCONTROL => Some((Ctrl, Left)),
            KeyCode::RCONTROL => Some((Ctrl, Right)),
            KeyCode::ALT => Some((Alt, Generic)),
            KeyCode::LALT => Some((Alt, Left)),
            KeyCode::RALT => Some((Alt, Right)),
            KeyCode::SHIFT => Some((Shift, Generic)),
            KeyCode::LSHIFT => Some((Shift, Left)),
            KeyCode::RSHIFT => Some((Shift, Right)),
            _ => None,
        }
    }

    pub fn is_modifier(self) -> bool {
        self.modifier().is_some()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match keys::key_name(*self) {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "VK_{:#04X}", self.0),
        }
    }
}

/// Modifier families
///
/// Declaration order is the canonical order modifiers appear in a `Shortcut`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ModifierKind {
    /// Windows / Super key
    Win,
    /// Control key
    Ctrl,
    /// Alt key (VK_MENU)
    Alt,
    /// Shift key
    Shift,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 4] = [
        ModifierKind::Win,
        ModifierKind::Ctrl,
        ModifierKind::Alt,
        ModifierKind::Shift,
    ];

    /// Returns the key code for one side of this modifier.
    pub fn key(self, side: ModifierSide) -> KeyCode {
        use ModifierSide::*;

        match (self, side) {
            (ModifierKind::Win, Generic) => KeyCode::WIN,
            (ModifierKind::Win, Left) => KeyCode::LWIN,
            (ModifierKind::Win, Right) => KeyCode::RWIN,
            (ModifierKind::Ctrl, Generic) => KeyCode::CONTROL,
            (ModifierKind::Ctrl, Left) => KeyCode::LCONTROL,
            (ModifierKind::Ctrl, Right) => KeyCode::RCONTROL,
            (ModifierKind::Alt, Generic) => KeyCode::ALT,
            (ModifierKind::Alt, Left) => KeyCode::LALT,
            (ModifierKind::Alt, Right) => KeyCode::RALT,
            (ModifierKind::Shift, Generic) => KeyCode::SHIFT,
            (ModifierKind::Shift, Left) => KeyCode::LSHIFT,
            (ModifierKind::Shift, Right) => KeyCode::RSHIFT,
        }
    }
}

/// Which physical key(s) of a modifier family a key code stands for
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ModifierSide {
    /// Either side
    Generic,
    Left,
    Right,
}

/// A combination of modifier keys and one terminal key
///
/// Modifiers are kept sorted in `ModifierKind` order with at most one entry per
/// family, so `Shift+Ctrl+K` and `Ctrl+Shift+K` compare and hash identically.
/// A shortcut may be built incomplete (no modifiers, or no terminal key); the
/// validator and compiler reject such shortcuts via `is_complete()`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Shortcut {
    modifiers: Vec<KeyCode>,
    action_key: Option<KeyCode>,
}

impl Shortcut {
    /// Builds a shortcut from keys in any order.
    ///
    /// Modifier keys go to the modifier set (a later key of the same family
    /// replaces an earlier one); any other key becomes the terminal key, the
    /// last one winning.
    pub fn new<I>(keys: I) -> Self
    where
        I: IntoIterator<Item = KeyCode>,
    {
        let mut shortcut = Shortcut::default();
        for key in keys {
            shortcut.set_key(key);
        }
        shortcut
    }

    /// Adds one key, keeping the modifier set sorted and deduplicated.
    pub fn set_key(&mut self, key: KeyCode) {
        match key.modifier() {
            Some((kind, _)) => {
                self.modifiers
                    .retain(|m| m.modifier().map(|(k, _)| k) != Some(kind));
                self.modifiers.push(key);
                self.modifiers.sort_by_key(|m| m.modifier().map(|(k, _)| k));
            }
            None => self.action_key = Some(key),
        }
    }

    pub fn modifiers(&self) -> &[KeyCode] {
        &self.modifiers
    }

    pub fn action_key(&self) -> Option<KeyCode> {
        self.action_key
    }

    /// Returns the modifier of the given family, if present.
    pub fn modifier_of(&self, kind: ModifierKind) -> Option<KeyCode> {
        self.modifiers
            .iter()
            .copied()
            .find(|m| m.modifier().map(|(k, _)| k) == Some(kind))
    }

    /// A shortcut is complete with at least one modifier and a real terminal key.
    pub fn is_complete(&self) -> bool {
        !self.modifiers.is_empty() && self.action_key.is_some_and(|k| !k.is_null())
    }

    /// All keys, modifiers first, terminal key last.
    pub fn keys(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.modifiers.iter().copied().chain(self.action_key)
    }

    pub fn len(&self) -> usize {
        self.modifiers.len() + usize::from(self.action_key.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("+");
        write!(f, "{}", keys)
    }
}

/// Left-hand side of a rule
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RemapSource {
    Key(KeyCode),
    Chord(Shortcut),
}

impl fmt::Display for RemapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemapSource::Key(key) => write!(f, "{}", key),
            RemapSource::Chord(shortcut) => write!(f, "{}", shortcut),
        }
    }
}

/// Right-hand side of a rule
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RemapTarget {
    Key(KeyCode),
    Chord(Shortcut),
}

impl RemapTarget {
    /// Target that disables its source.
    pub fn disabled() -> Self {
        RemapTarget::Key(KeyCode::NULL)
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, RemapTarget::Key(key) if key.is_null())
    }

    /// The key an application ultimately receives as non-modifier input.
    pub fn terminal_key(&self) -> Option<KeyCode> {
        match self {
            RemapTarget::Key(key) => Some(*key),
            RemapTarget::Chord(shortcut) => shortcut.action_key(),
        }
    }
}

impl fmt::Display for RemapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemapTarget::Key(key) if key.is_null() => write!(f, "Null"),
            RemapTarget::Key(key) => write!(f, "{}", key),
            RemapTarget::Chord(shortcut) => write!(f, "{}", shortcut),
        }
    }
}

/// When a single-key rule fires
///
/// - `Always`: on every press
/// - `Alone`: only if released without another key going down meanwhile
/// - `Combination`: only while another key is concurrently held
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Always,
    Alone,
    Combination,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Always => write!(f, "always"),
            Condition::Alone => write!(f, "alone"),
            Condition::Combination => write!(f, "combination"),
        }
    }
}

/// Where a rule applies
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Global,
    /// Lower-cased process name, e.g. `code.exe`
    App(String),
}

impl Scope {
    /// Builds an app scope; process names are case-insensitive and an empty
    /// name means global.
    pub fn app(process_name: &str) -> Self {
        let name = process_name.trim();
        if name.is_empty() {
            Scope::Global
        } else {
            Scope::App(name.to_lowercase())
        }
    }

    pub fn process_name(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::App(name) => Some(name),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::App(name) => write!(f, "{}", name),
        }
    }
}

/// One user-authored remap
///
/// # Example
/// ```ignore
/// let rule = RemapRule::new(
///     RemapSource::Key(KeyCode(0x14)),
///     RemapTarget::Key(KeyCode(0x1B)),
/// );
/// // Represents: remap = CapsLock, Escape
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RemapRule {
    pub source: RemapSource,
    pub target: RemapTarget,
    pub scope: Scope,
    pub condition: Condition,
}

impl RemapRule {
    /// Global rule firing under `Condition::Always`
    pub fn new(source: RemapSource, target: RemapTarget) -> Self {
        Self {
            source,
            target,
            scope: Scope::Global,
            condition: Condition::Always,
        }
    }

    pub fn in_app(mut self, process_name: &str) -> Self {
        self.scope = Scope::app(process_name);
        self
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Single-key rules have a plain key as source.
    pub fn is_single_key(&self) -> bool {
        matches!(self.source, RemapSource::Key(_))
    }
}

impl fmt::Display for RemapRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remap")?;

        if self.condition != Condition::Always {
            write!(f, "[{}]", self.condition)?;
        }

        if let Scope::App(name) = &self.scope {
            write!(f, "@{}", name)?;
        }

        write!(f, " = {}, {}", self.source, self.target)
    }
}

/// Ordered rule set as authored by the user
///
/// Order is preserved for display and saving; validation does not depend on it.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RemapBuffer {
    rules: Vec<RemapRule>,
}

impl RemapBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: RemapRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RemapRule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RemapRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl From<Vec<RemapRule>> for RemapBuffer {
    fn from(rules: Vec<RemapRule>) -> Self {
        Self { rules }
    }
}

impl FromIterator<RemapRule> for RemapBuffer {
    fn from_iter<I: IntoIterator<Item = RemapRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RemapBuffer {
    type Item = RemapRule;
    type IntoIter = std::vec::IntoIter<RemapRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl<'a> IntoIterator for &'a RemapBuffer {
    type Item = &'a RemapRule;
    type IntoIter = std::slice::Iter<'a, RemapRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
