//! Line-ending canonicalization for the inbound byte stream
//!
//! Serial devices terminate lines with CR, LF, CRLF or LFCR. Every one of
//! those becomes a single `'\n'` here, regardless of where the reads split
//! the stream. All other control bytes are replaced with `'.'`.

/// Byte value of carriage return
pub const CR: u8 = 0x0D;
/// Byte value of line feed
pub const LF: u8 = 0x0A;
/// Placeholder emitted for bytes that cannot be displayed
pub const PLACEHOLDER: char = '.';

/// Suppression flags carried from one byte (and one chunk) to the next
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonState {
    /// The previous byte was a CR that produced a line break
    pub suppress_next_lf: bool,
    /// The previous byte was an LF that produced a line break
    pub suppress_next_cr: bool,
}

/// Canonicalize one received chunk.
///
/// Pure: the same `raw` and `state` always give the same result. The
/// returned state must be passed to the call for the following chunk.
pub fn canonicalize(raw: &[u8], state: CanonState) -> (String, CanonState) {
    let mut out = String::with_capacity(raw.len());
    let mut state = state;

    for &byte in raw {
        let mut next = CanonState::default();
        match byte {
            CR => {
                if !state.suppress_next_cr {
                    out.push('\n');
                    next.suppress_next_lf = true;
                }
            }
            LF => {
                if !state.suppress_next_lf {
                    out.push('\n');
                    next.suppress_next_cr = true;
                }
            }
            _ => out.push(display_char(byte)),
        }
        state = next;
    }

    (out, state)
}

/// Map a non line-ending byte to the character shown for it.
///
/// Bytes 128..=255 map to the Latin-1 code point of the same value.
pub fn display_char(byte: u8) -> char {
    if byte < 0x20 {
        PLACEHOLDER
    } else {
        char::from(byte)
    }
}

/// Stateful wrapper threading [`CanonState`] across chunks
#[derive(Debug, Default)]
pub struct LineCanonicalizer {
    state: CanonState,
}

impl LineCanonicalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize the next chunk in arrival order
    pub fn feed(&mut self, raw: &[u8]) -> String {
        let (out, state) = canonicalize(raw, self.state);
        self.state = state;
        out
    }

    #[cfg(test)]
    pub fn state(&self) -> CanonState {
        self.state
    }
}
