//! Key mapping for operator input
//!
//! Converts crossterm key events into the byte values a curses `getch`
//! would return in cbreak mode: printable characters as themselves, Ctrl
//! combinations as control codes, Enter as LF, Alt combinations as ESC
//! followed by the key. Navigation and function keys have no byte value and
//! are dropped.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Key mapper for converting key events to keystroke bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent to keystroke bytes, oldest first
    pub fn map(event: &KeyEvent) -> Option<Vec<u8>> {
        let mods = Modifiers::from(event.modifiers);

        match event.code {
            KeyCode::Char(ch) => Some(Self::map_char(ch, mods)),

            // cbreak mode with nl translation delivers LF for Enter
            KeyCode::Enter => Some(Self::with_alt(vec![0x0A], mods)),

            KeyCode::Backspace => Some(Self::with_alt(vec![0x7F], mods)),

            KeyCode::Tab => Some(Self::with_alt(vec![0x09], mods)),

            KeyCode::Esc => Some(vec![0x1B]),

            _ => None,
        }
    }

    /// Prefix ESC when Alt is held
    fn with_alt(bytes: Vec<u8>, mods: Modifiers) -> Vec<u8> {
        if mods.contains(Modifiers::ALT) {
            let mut prefixed = vec![0x1B];
            prefixed.extend(bytes);
            prefixed
        } else {
            bytes
        }
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        if mods.contains(Modifiers::CTRL) {
            if let Some(code) = Self::control_code(ch) {
                return Self::with_alt(vec![code], mods);
            }
        }

        let mut buf = [0u8; 4];
        Self::with_alt(ch.encode_utf8(&mut buf).as_bytes().to_vec(), mods)
    }

    /// Control code for Ctrl + `ch`, if there is one
    fn control_code(ch: char) -> Option<u8> {
        if ch.is_ascii_alphabetic() {
            return Some((ch.to_ascii_lowercase() as u8) - b'a' + 1);
        }
        match ch {
            '@' | '`' | ' ' => Some(0x00),
            '[' => Some(0x1B),
            '\\' => Some(0x1C),
            ']' => Some(0x1D),
            '^' | '~' => Some(0x1E),
            '_' | '?' => Some(0x1F),
            _ => None,
        }
    }
}
