//! Hex text ("debug") MIDI parser
//!
//! Reads human-typed MIDI such as `90 40 7F`, one hex pair per byte. Only hex
//! digits and whitespace matter; everything else (labels, punctuation) is
//! skipped. A pair is only committed once whitespace follows it, and a third
//! digit slides the window so that stray digits correct themselves.

use super::{MidiParser, ParserConfig, SerialMidiParser};
use crate::midi::MidiMessage;

/// Fill level of the two-slot nibble buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexState {
    AwaitingFirstNibble,
    AwaitingSecondNibble(u8),
    /// Two digits buffered, waiting for whitespace to commit them
    PairComplete(u8, u8),
}

/// Parser for whitespace separated hex pairs
#[derive(Debug, Clone)]
pub struct HexMidiParser {
    nibbles: HexState,
    inner: SerialMidiParser,
}

impl HexMidiParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            nibbles: HexState::AwaitingFirstNibble,
            inner: SerialMidiParser::with_config(config),
        }
    }

    pub fn state(&self) -> HexState {
        self.nibbles
    }

    /// The binary parser fed with the reconstructed bytes
    pub fn inner(&self) -> &SerialMidiParser {
        &self.inner
    }

    fn push_nibble(&mut self, nibble: u8) {
        self.nibbles = match self.nibbles {
            HexState::AwaitingFirstNibble => HexState::AwaitingSecondNibble(nibble),
            HexState::AwaitingSecondNibble(high) => HexState::PairComplete(high, nibble),
            HexState::PairComplete(_, low) => HexState::PairComplete(low, nibble),
        };
    }
}

impl MidiParser for HexMidiParser {
    fn parse(&mut self, byte: u8) -> Option<MidiMessage> {
        if let Some(nibble) = hex_nibble(byte) {
            self.push_nibble(nibble);
            return None;
        }
        if !is_whitespace(byte) {
            return None;
        }
        match self.nibbles {
            HexState::PairComplete(high, low) => {
                self.nibbles = HexState::AwaitingFirstNibble;
                self.inner.parse(high << 4 | low)
            }
            _ => None,
        }
    }

    fn take_pending(&mut self) -> Option<MidiMessage> {
        self.inner.take_pending()
    }

    fn reset(&mut self) {
        self.nibbles = HexState::AwaitingFirstNibble;
        self.inner.reset();
    }
}

impl Default for HexMidiParser {
    fn default() -> Self {
        Self::new()
    }
}

fn hex_nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\r' | b'\n')
}

/// Render bytes in the debug wire format: uppercase pairs, each followed by a space
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for &b in bytes {
        out.push_str(&::hex::encode_upper([b]));
        out.push(' ');
    }
    out
}
