//! Key identities and transitions
//!
//! Keys are identified the way the keyboard reports them: a one-byte
//! set-1 scancode plus the "extended" flag carried by the E0 prefix.
//! The flag is what separates right Ctrl/Alt, the arrow cluster and the
//! numpad Enter/slash from the keys that share their scancode.

use crate::error::InputError;
use std::fmt;

/// A physical key: scancode plus extended flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyIdentity {
    pub scancode: u8,
    pub extended: bool,
}

impl KeyIdentity {
    pub const fn new(scancode: u8, extended: bool) -> Self {
        Self { scancode, extended }
    }

    /// Non-extended key
    pub const fn plain(scancode: u8) -> Self {
        Self::new(scancode, false)
    }

    /// E0-prefixed key
    pub const fn extended(scancode: u8) -> Self {
        Self::new(scancode, true)
    }

    /// Human-readable key name ("F1", "Right Ctrl", "Num 7", ...)
    pub fn name(&self) -> String {
        match lookup_name(*self) {
            Some(name) => name.to_string(),
            None if self.extended => format!("Key 0xE0{:02X}", self.scancode),
            None => format!("Key 0x{:02X}", self.scancode),
        }
    }

    /// Convert a Linux input event code (KEY_*) to a key identity
    pub fn from_evdev_code(code: u16) -> Option<Self> {
        if let Some(&(scancode, _)) = EXTENDED_EVDEV.iter().find(|(_, c)| *c == code) {
            return Some(Self::extended(scancode));
        }
        if let Some(&(scancode, _)) = HIGH_EVDEV.iter().find(|(_, c)| *c == code) {
            return Some(Self::plain(scancode));
        }
        // Codes 1..=88 are the set-1 scancodes of the base AT keyboard
        if (1..=0x58).contains(&code) {
            return Some(Self::plain(code as u8));
        }
        None
    }

    /// Convert back to a Linux input event code, if the key has one
    pub fn to_evdev_code(&self) -> Option<u16> {
        if self.extended {
            return EXTENDED_EVDEV
                .iter()
                .find(|(s, _)| *s == self.scancode)
                .map(|&(_, code)| code);
        }
        if let Some(&(_, code)) = HIGH_EVDEV.iter().find(|(s, _)| *s == self.scancode) {
            return Some(code);
        }
        if (1..=0x58).contains(&self.scancode) {
            return Some(self.scancode as u16);
        }
        None
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Direction of a key transition
///
/// The discriminants are the ordinals used by the recording file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Press = 0,
    Release = 1,
}

impl TransitionKind {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u8) -> Option<Self> {
        match value {
            0 => Some(TransitionKind::Press),
            1 => Some(TransitionKind::Release),
            _ => None,
        }
    }
}

/// One observed or synthesized key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyTransition {
    pub key: KeyIdentity,
    pub kind: TransitionKind,
}

impl KeyTransition {
    pub fn press(key: KeyIdentity) -> Self {
        Self {
            key,
            kind: TransitionKind::Press,
        }
    }

    pub fn release(key: KeyIdentity) -> Self {
        Self {
            key,
            kind: TransitionKind::Release,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind == TransitionKind::Press
    }
}

/// (set-1 scancode, evdev code) for E0-prefixed keys
const EXTENDED_EVDEV: &[(u8, u16)] = &[
    (0x1C, 96),  // KEY_KPENTER
    (0x1D, 97),  // KEY_RIGHTCTRL
    (0x35, 98),  // KEY_KPSLASH
    (0x37, 99),  // KEY_SYSRQ
    (0x38, 100), // KEY_RIGHTALT
    (0x45, 119), // KEY_PAUSE
    (0x47, 102), // KEY_HOME
    (0x48, 103), // KEY_UP
    (0x49, 104), // KEY_PAGEUP
    (0x4B, 105), // KEY_LEFT
    (0x4D, 106), // KEY_RIGHT
    (0x4F, 107), // KEY_END
    (0x50, 108), // KEY_DOWN
    (0x51, 109), // KEY_PAGEDOWN
    (0x52, 110), // KEY_INSERT
    (0x53, 111), // KEY_DELETE
    (0x5B, 125), // KEY_LEFTMETA
    (0x5C, 126), // KEY_RIGHTMETA
    (0x5D, 127), // KEY_COMPOSE
];

/// (set-1 scancode, evdev code) for non-extended keys above F12
const HIGH_EVDEV: &[(u8, u16)] = &[
    (0x64, 183), // KEY_F13
    (0x65, 184),
    (0x66, 185),
    (0x67, 186),
    (0x68, 187),
    (0x69, 188),
    (0x6A, 189),
    (0x6B, 190),
    (0x6C, 191),
    (0x6D, 192),
    (0x6E, 193),
    (0x76, 194), // KEY_F24
];

const PLAIN_NAMES: &[(u8, &str)] = &[
    (0x01, "Esc"),
    (0x02, "1"),
    (0x03, "2"),
    (0x04, "3"),
    (0x05, "4"),
    (0x06, "5"),
    (0x07, "6"),
    (0x08, "7"),
    (0x09, "8"),
    (0x0A, "9"),
    (0x0B, "0"),
    (0x0C, "-"),
    (0x0D, "="),
    (0x0E, "Backspace"),
    (0x0F, "Tab"),
    (0x10, "Q"),
    (0x11, "W"),
    (0x12, "E"),
    (0x13, "R"),
    (0x14, "T"),
    (0x15, "Y"),
    (0x16, "U"),
    (0x17, "I"),
    (0x18, "O"),
    (0x19, "P"),
    (0x1A, "["),
    (0x1B, "]"),
    (0x1C, "Enter"),
    (0x1D, "Ctrl"),
    (0x1E, "A"),
    (0x1F, "S"),
    (0x20, "D"),
    (0x21, "F"),
    (0x22, "G"),
    (0x23, "H"),
    (0x24, "J"),
    (0x25, "K"),
    (0x26, "L"),
    (0x27, ";"),
    (0x28, "'"),
    (0x29, "`"),
    (0x2A, "Shift"),
    (0x2B, "\\"),
    (0x2C, "Z"),
    (0x2D, "X"),
    (0x2E, "C"),
    (0x2F, "V"),
    (0x30, "B"),
    (0x31, "N"),
    (0x32, "M"),
    (0x33, ","),
    (0x34, "."),
    (0x35, "/"),
    (0x36, "Right Shift"),
    (0x37, "Num *"),
    (0x38, "Alt"),
    (0x39, "Space"),
    (0x3A, "Caps Lock"),
    (0x3B, "F1"),
    (0x3C, "F2"),
    (0x3D, "F3"),
    (0x3E, "F4"),
    (0x3F, "F5"),
    (0x40, "F6"),
    (0x41, "F7"),
    (0x42, "F8"),
    (0x43, "F9"),
    (0x44, "F10"),
    (0x45, "Num Lock"),
    (0x46, "Scroll Lock"),
    (0x47, "Num 7"),
    (0x48, "Num 8"),
    (0x49, "Num 9"),
    (0x4A, "Num -"),
    (0x4B, "Num 4"),
    (0x4C, "Num 5"),
    (0x4D, "Num 6"),
    (0x4E, "Num +"),
    (0x4F, "Num 1"),
    (0x50, "Num 2"),
    (0x51, "Num 3"),
    (0x52, "Num 0"),
    (0x53, "Num Del"),
    (0x56, "\\ (102nd)"),
    (0x57, "F11"),
    (0x58, "F12"),
    (0x64, "F13"),
    (0x65, "F14"),
    (0x66, "F15"),
    (0x67, "F16"),
    (0x68, "F17"),
    (0x69, "F18"),
    (0x6A, "F19"),
    (0x6B, "F20"),
    (0x6C, "F21"),
    (0x6D, "F22"),
    (0x6E, "F23"),
    (0x76, "F24"),
];

const EXTENDED_NAMES: &[(u8, &str)] = &[
    (0x1C, "Num Enter"),
    (0x1D, "Right Ctrl"),
    (0x35, "Num /"),
    (0x37, "Prnt Scrn"),
    (0x38, "Right Alt"),
    (0x45, "Pause"),
    (0x47, "Home"),
    (0x48, "Up"),
    (0x49, "Page Up"),
    (0x4B, "Left"),
    (0x4D, "Right"),
    (0x4F, "End"),
    (0x50, "Down"),
    (0x51, "Page Down"),
    (0x52, "Insert"),
    (0x53, "Delete"),
    (0x5B, "Left Windows"),
    (0x5C, "Right Windows"),
    (0x5D, "Application"),
];

fn lookup_name(key: KeyIdentity) -> Option<&'static str> {
    let table = if key.extended {
        EXTENDED_NAMES
    } else {
        PLAIN_NAMES
    };
    table
        .iter()
        .find(|(scancode, _)| *scancode == key.scancode)
        .map(|&(_, name)| name)
}

/// Parse a hotkey name from configuration into a key identity
///
/// Accepts evdev-style names (`F1`, `SCROLLLOCK`, `KEY_RIGHTCTRL`, `ralt`)
/// and raw scancodes written as hex (`0x3B`, or `0xE01D` for an extended key).
pub fn parse_key_name(name: &str) -> Result<KeyIdentity, InputError> {
    let trimmed = name.trim();

    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return parse_raw_scancode(hex).ok_or_else(|| {
            InputError::UnknownKey(format!("{}. Raw scancodes look like 0x3B or 0xE01D", name))
        });
    }

    // Normalize: uppercase and replace - or space with _
    let normalized: String = trimmed
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();
    let key_name = normalized.strip_prefix("KEY_").unwrap_or(&normalized);

    if let Some(n) = key_name.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        let scancode = match n {
            1..=10 => Some(0x3A + n),
            11 => Some(0x57),
            12 => Some(0x58),
            13..=23 => Some(0x64 + (n - 13)),
            24 => Some(0x76),
            _ => None,
        };
        if let Some(scancode) = scancode {
            return Ok(KeyIdentity::plain(scancode));
        }
    }

    if key_name.len() == 1 {
        let c = key_name.as_bytes()[0];
        if c.is_ascii_alphanumeric() {
            let wanted = (c as char).to_string();
            if let Some(&(scancode, _)) = PLAIN_NAMES.iter().find(|(_, n)| *n == wanted) {
                return Ok(KeyIdentity::plain(scancode));
            }
        }
    }

    let key = match key_name {
        // Lock keys (good hotkey candidates)
        "SCROLLLOCK" => KeyIdentity::plain(0x46),
        "PAUSE" | "BREAK" => KeyIdentity::extended(0x45),
        "CAPSLOCK" => KeyIdentity::plain(0x3A),
        "NUMLOCK" => KeyIdentity::plain(0x45),

        // Modifier keys
        "LEFTALT" | "LALT" | "ALT" => KeyIdentity::plain(0x38),
        "RIGHTALT" | "RALT" | "ALTGR" => KeyIdentity::extended(0x38),
        "LEFTCTRL" | "LCTRL" | "CTRL" => KeyIdentity::plain(0x1D),
        "RIGHTCTRL" | "RCTRL" => KeyIdentity::extended(0x1D),
        "LEFTSHIFT" | "LSHIFT" | "SHIFT" => KeyIdentity::plain(0x2A),
        "RIGHTSHIFT" | "RSHIFT" => KeyIdentity::plain(0x36),
        "LEFTMETA" | "LMETA" | "SUPER" => KeyIdentity::extended(0x5B),
        "RIGHTMETA" | "RMETA" => KeyIdentity::extended(0x5C),
        "COMPOSE" | "MENU" | "APPLICATION" => KeyIdentity::extended(0x5D),

        // Navigation keys
        "INSERT" => KeyIdentity::extended(0x52),
        "DELETE" => KeyIdentity::extended(0x53),
        "HOME" => KeyIdentity::extended(0x47),
        "END" => KeyIdentity::extended(0x4F),
        "PAGEUP" => KeyIdentity::extended(0x49),
        "PAGEDOWN" => KeyIdentity::extended(0x51),
        "UP" => KeyIdentity::extended(0x48),
        "DOWN" => KeyIdentity::extended(0x50),
        "LEFT" => KeyIdentity::extended(0x4B),
        "RIGHT" => KeyIdentity::extended(0x4D),
        "SYSRQ" | "PRINT" | "PRINTSCREEN" => KeyIdentity::extended(0x37),

        // Common keys
        "SPACE" => KeyIdentity::plain(0x39),
        "ENTER" | "RETURN" => KeyIdentity::plain(0x1C),
        "KPENTER" => KeyIdentity::extended(0x1C),
        "TAB" => KeyIdentity::plain(0x0F),
        "BACKSPACE" => KeyIdentity::plain(0x0E),
        "ESC" | "ESCAPE" => KeyIdentity::plain(0x01),
        "GRAVE" | "BACKTICK" => KeyIdentity::plain(0x29),

        _ => {
            return Err(InputError::UnknownKey(format!(
                "{}. Try: F1-F24, SCROLLLOCK, PAUSE, RIGHTCTRL, or a raw scancode like 0x3B",
                name
            )));
        }
    };

    Ok(key)
}

fn parse_raw_scancode(hex: &str) -> Option<KeyIdentity> {
    let value = u16::from_str_radix(hex, 16).ok()?;
    match value {
        0..=0xFF => Some(KeyIdentity::plain(value as u8)),
        0xE000..=0xE0FF => Some(KeyIdentity::extended((value & 0xFF) as u8)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_includes_extended_flag() {
        assert_eq!(KeyIdentity::plain(0x1D), KeyIdentity::new(0x1D, false));
        assert_ne!(KeyIdentity::plain(0x1D), KeyIdentity::extended(0x1D));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyIdentity::plain(0x3B).name(), "F1");
        assert_eq!(KeyIdentity::plain(0x1D).name(), "Ctrl");
        assert_eq!(KeyIdentity::extended(0x1D).name(), "Right Ctrl");
        assert_eq!(KeyIdentity::plain(0x48).name(), "Num 8");
        assert_eq!(KeyIdentity::extended(0x48).name(), "Up");
        assert_eq!(KeyIdentity::plain(0xF0).name(), "Key 0xF0");
        assert_eq!(KeyIdentity::extended(0x10).name(), "Key 0xE010");
    }

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("F1").unwrap(), KeyIdentity::plain(0x3B));
        assert_eq!(parse_key_name("f10").unwrap(), KeyIdentity::plain(0x44));
        assert_eq!(parse_key_name("F12").unwrap(), KeyIdentity::plain(0x58));
        assert_eq!(parse_key_name("F13").unwrap(), KeyIdentity::plain(0x64));
        assert_eq!(parse_key_name("F24").unwrap(), KeyIdentity::plain(0x76));
        assert_eq!(parse_key_name("ScrollLock").unwrap(), KeyIdentity::plain(0x46));
        assert_eq!(
            parse_key_name("KEY_RIGHTCTRL").unwrap(),
            KeyIdentity::extended(0x1D)
        );
        assert_eq!(parse_key_name("ralt").unwrap(), KeyIdentity::extended(0x38));
        assert_eq!(parse_key_name("a").unwrap(), KeyIdentity::plain(0x1E));
        assert_eq!(parse_key_name("7").unwrap(), KeyIdentity::plain(0x08));
    }

    #[test]
    fn test_parse_raw_scancode() {
        assert_eq!(parse_key_name("0x3B").unwrap(), KeyIdentity::plain(0x3B));
        assert_eq!(parse_key_name("0xE01D").unwrap(), KeyIdentity::extended(0x1D));
        assert!(parse_key_name("0x1FF").is_err());
        assert!(parse_key_name("0xZZ").is_err());
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(parse_key_name("INVALID_KEY_NAME").is_err());
        assert!(parse_key_name("F25").is_err());
    }

    #[test]
    fn test_evdev_mapping() {
        // KEY_A
        assert_eq!(KeyIdentity::from_evdev_code(30), Some(KeyIdentity::plain(0x1E)));
        // KEY_RIGHTCTRL
        assert_eq!(KeyIdentity::from_evdev_code(97), Some(KeyIdentity::extended(0x1D)));
        // KEY_F13
        assert_eq!(KeyIdentity::from_evdev_code(183), Some(KeyIdentity::plain(0x64)));
        // BTN_LEFT is not a keyboard key
        assert_eq!(KeyIdentity::from_evdev_code(0x110), None);

        for code in [1u16, 30, 57, 88, 96, 97, 103, 111, 125, 183, 194] {
            let key = KeyIdentity::from_evdev_code(code).unwrap();
            assert_eq!(key.to_evdev_code(), Some(code));
        }
        assert_eq!(KeyIdentity::extended(0x10).to_evdev_code(), None);
    }

    #[test]
    fn test_transition_kind_ordinals() {
        assert_eq!(TransitionKind::Press.ordinal(), 0);
        assert_eq!(TransitionKind::Release.ordinal(), 1);
        assert_eq!(TransitionKind::from_ordinal(1), Some(TransitionKind::Release));
        assert_eq!(TransitionKind::from_ordinal(2), None);
    }
}
