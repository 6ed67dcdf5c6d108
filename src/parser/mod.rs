//! MIDI byte-stream parsers
//!
//! Both parsers consume one byte per call and return a message once one is
//! complete. Corrupt input is never an error: the parser drops what it cannot
//! use and resynchronises on the next status byte.
//!
//! - [`SerialMidiParser`]: raw binary MIDI (running status, SysEx, realtime)
//! - [`HexMidiParser`]: whitespace separated hex pairs, e.g. `"90 40 7f "`

mod binary;
mod hex;


pub use self::binary::{
    ParserConfig, ParserState, SerialMidiParser, SystemCommonPolicy, DEFAULT_SYSEX_CHUNK_LEN,
};
pub use self::hex::{encode_hex, HexMidiParser, HexState};

use crate::midi::MidiMessage;

/// Common interface of the byte-at-a-time parsers
pub trait MidiParser {
    /// Feed one byte, returning a message if this byte completed one
    fn parse(&mut self, byte: u8) -> Option<MidiMessage>;

    /// Message that completed together with the last one returned
    ///
    /// A system common status that interrupts a SysEx dump yields the
    /// dump's last chunk and the status itself. The status is held here and
    /// otherwise returned by the next `parse` call.
    fn take_pending(&mut self) -> Option<MidiMessage> {
        None
    }

    /// Drop any partial message and running status
    fn reset(&mut self);

    /// Feed a chunk of bytes and collect every completed message
    fn feed(&mut self, bytes: &[u8]) -> Vec<MidiMessage> {
        let mut messages = Vec::new();
        for &byte in bytes {
            messages.extend(self.parse(byte));
            messages.extend(self.take_pending());
        }
        messages
    }
}
