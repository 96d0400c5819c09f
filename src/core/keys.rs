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

//! Key name table
//!
//! Maps human-readable key names (as written in the rules file) to virtual-key
//! codes and back. Lookup by name is case-insensitive and accepts aliases;
//! the first name listed for a code is the canonical one used for display.
//! Letters, digits and function keys are computed rather than listed.

use crate::core::types::KeyCode;

/// Named keys, canonical name first for each code
const NAMED_KEYS: &[(&str, u32)] = &[
    ("Null", 0x00),
    ("Disabled", 0x00),
    ("Backspace", 0x08),
    ("Back", 0x08),
    ("Tab", 0x09),
    ("Enter", 0x0D),
    ("Return", 0x0D),
    ("Shift", 0x10),
    ("Ctrl", 0x11),
    ("Control", 0x11),
    ("Alt", 0x12),
    ("Menu", 0x12),
    ("Pause", 0x13),
    ("CapsLock", 0x14),
    ("Caps", 0x14),
    ("Escape", 0x1B),
    ("Esc", 0x1B),
    ("Space", 0x20),
    ("PageUp", 0x21),
    ("Prior", 0x21),
    ("PageDown", 0x22),
    ("Next", 0x22),
    ("End", 0x23),
    ("Home", 0x24),
    ("Left", 0x25),
    ("Up", 0x26),
    ("Right", 0x27),
    ("Down", 0x28),
    ("PrintScreen", 0x2C),
    ("Insert", 0x2D),
    ("Delete", 0x2E),
    ("Del", 0x2E),
    ("LWin", 0x5B),
    ("RWin", 0x5C),
    ("Apps", 0x5D),
    ("NumLock", 0x90),
    ("ScrollLock", 0x91),
    ("LShift", 0xA0),
    ("RShift", 0xA1),
    ("LCtrl", 0xA2),
    ("LControl", 0xA2),
    ("RCtrl", 0xA3),
    ("RControl", 0xA3),
    ("LAlt", 0xA4),
    ("RAlt", 0xA5),
    ("AltGr", 0xA5),
    ("VolumeMute", 0xAD),
    ("VolumeDown", 0xAE),
    ("VolumeUp", 0xAF),
    ("MediaNext", 0xB0),
    ("MediaPrev", 0xB1),
    ("MediaStop", 0xB2),
    ("MediaPlayPause", 0xB3),
    ("Semicolon", 0xBA),
    ("Plus", 0xBB),
    ("Equals", 0xBB),
    ("Comma", 0xBC),
    ("Minus", 0xBD),
    ("Period", 0xBE),
    ("Slash", 0xBF),
    ("Backtick", 0xC0),
    ("Grave", 0xC0),
    ("LeftBracket", 0xDB),
    ("Backslash", 0xDC),
    ("RightBracket", 0xDD),
    ("Quote", 0xDE),
    ("Win", 0x104),
    ("Super", 0x104),
];

/// Looks up a key by name.
///
/// Accepts the names in the table above, single letters and digits, `F1`..`F24`,
/// `Num0`..`Num9`, and raw codes written as `VK_0x41` or `0x41`. Raw codes must
/// be a virtual key (`0x01`..`0xFE`) or the generic Win code.
pub fn key_from_name(name: &str) -> Option<KeyCode> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if let Some((_, code)) = NAMED_KEYS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
    {
        return Some(KeyCode(*code));
    }

    let upper = name.to_uppercase();
    let mut chars = upper.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            return Some(KeyCode(c as u32));
        }
    }

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=24).contains(&n) {
            return Some(KeyCode(0x70 + n - 1));
        }
    }

    if let Some(n) = upper.strip_prefix("NUM").and_then(|n| n.parse::<u32>().ok()) {
        if n <= 9 {
            return Some(KeyCode(0x60 + n));
        }
    }

    let hex = upper.strip_prefix("VK_").unwrap_or(&upper);
    hex.strip_prefix("0X")
        .and_then(|digits| u32::from_str_radix(digits, 16).ok())
        .filter(|&code| (0x01..=0xFE).contains(&code) || code == KeyCode::WIN.0)
        .map(KeyCode)
}

/// Canonical display name of a key, if it has one.
pub fn key_name(key: KeyCode) -> Option<&'static str> {
    const LETTERS: &[&str] = &[
        "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
        "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
    ];
    const DIGITS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];
    const NUMPAD: &[&str] = &[
        "Num0", "Num1", "Num2", "Num3", "Num4", "Num5", "Num6", "Num7", "Num8", "Num9",
    ];
    const FUNCTION: &[&str] = &[
        "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13",
        "F14", "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
    ];

    let code = key.0;
    match code {
        0x30..=0x39 => DIGITS.get((code - 0x30) as usize).copied(),
        0x41..=0x5A => LETTERS.get((code - 0x41) as usize).copied(),
        0x60..=0x69 => NUMPAD.get((code - 0x60) as usize).copied(),
        0x70..=0x87 => FUNCTION.get((code - 0x70) as usize).copied(),
        _ => NAMED_KEYS
            .iter()
            .find(|(_, known)| *known == code)
            .map(|(name, _)| *name),
    }
}
