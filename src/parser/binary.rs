//! Binary MIDI stream parser

use serde::Deserialize;
use tracing::trace;

use super::MidiParser;
use crate::midi::{ChannelMessage, MessageKind, MidiMessage, SystemRealtime};

/// Default maximum SysEx chunk size
pub const DEFAULT_SYSEX_CHUNK_LEN: usize = 128;

/// What to do with system common status bytes (0xF1-0xF6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemCommonPolicy {
    /// Emit them as zero-data [`MidiMessage::SystemCommon`] messages
    #[default]
    Pass,
    /// Drop them silently
    Discard,
}

/// Parser behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Reuse the previous status byte for data-only sequences
    pub running_status: bool,
    pub system_common: SystemCommonPolicy,
    /// SysEx payloads longer than this are delivered in several chunks
    pub sysex_chunk_len: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            running_status: true,
            system_common: SystemCommonPolicy::Pass,
            sysex_chunk_len: DEFAULT_SYSEX_CHUNK_LEN,
        }
    }
}

/// Position in the status-byte grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Idle,
    AwaitingData1,
    AwaitingData2,
    SysEx,
}

/// Byte-at-a-time parser for a raw MIDI stream (serial DIN, USB CDC, ...)
#[derive(Debug, Clone)]
pub struct SerialMidiParser {
    config: ParserConfig,
    state: ParserState,
    /// Status of the message in progress, kept after completion for running status
    status: Option<u8>,
    data1: u8,
    sysex: Vec<u8>,
    /// Message completed by the same byte as the one returned
    pending: Option<MidiMessage>,
}

impl SerialMidiParser {
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            state: ParserState::Idle,
            status: None,
            data1: 0,
            sysex: Vec::new(),
            pending: None,
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Status byte that a data-only sequence would currently reuse
    pub fn running_status(&self) -> Option<u8> {
        if self.config.running_status && self.state == ParserState::Idle {
            self.status
        } else {
            None
        }
    }

    fn handle_status(&mut self, byte: u8) -> Option<MidiMessage> {
        // Any status other than realtime ends a SysEx dump
        let interrupted = if self.state == ParserState::SysEx {
            Some(self.take_sysex(byte == 0xF7))
        } else {
            if matches!(
                self.state,
                ParserState::AwaitingData1 | ParserState::AwaitingData2
            ) {
                trace!("Dropping incomplete message before status 0x{:02X}", byte);
            }
            None
        };

        match byte {
            0x80..=0xEF => {
                self.status = Some(byte);
                self.state = ParserState::AwaitingData1;
                interrupted
            }
            0xF0 => {
                self.status = None;
                self.state = ParserState::SysEx;
                interrupted
            }
            0xF7 => {
                self.status = None;
                self.state = ParserState::Idle;
                if interrupted.is_none() {
                    trace!("Dropping stray SysEx end marker");
                }
                interrupted
            }
            _ => {
                // System common: cancels running status, carries no data here
                self.status = None;
                self.state = ParserState::Idle;
                let common = match self.config.system_common {
                    SystemCommonPolicy::Pass => Some(MidiMessage::SystemCommon { status: byte }),
                    SystemCommonPolicy::Discard => {
                        trace!("Discarding system common 0x{:02X}", byte);
                        None
                    }
                };
                match interrupted {
                    Some(chunk) => {
                        // The SysEx chunk goes first, the status follows
                        self.pending = common;
                        Some(chunk)
                    }
                    None => common,
                }
            }
        }
    }

    fn handle_data(&mut self, byte: u8) -> Option<MidiMessage> {
        match self.state {
            ParserState::SysEx => {
                self.sysex.push(byte);
                if self.sysex.len() >= self.config.sysex_chunk_len.max(1) {
                    return Some(self.take_sysex(false));
                }
                None
            }
            ParserState::AwaitingData1 => self.first_data_byte(byte),
            ParserState::AwaitingData2 => {
                self.state = ParserState::Idle;
                self.complete(self.data1, byte)
            }
            ParserState::Idle => {
                if self.running_status().is_some() {
                    self.first_data_byte(byte)
                } else {
                    trace!("Discarding data byte 0x{:02X} without status", byte);
                    None
                }
            }
        }
    }

    fn first_data_byte(&mut self, byte: u8) -> Option<MidiMessage> {
        let kind = self.status.and_then(MessageKind::from_status)?;
        if kind.data_len() == 1 {
            self.state = ParserState::Idle;
            self.complete(byte, 0)
        } else {
            self.data1 = byte;
            self.state = ParserState::AwaitingData2;
            None
        }
    }

    fn complete(&mut self, data1: u8, data2: u8) -> Option<MidiMessage> {
        let status = self.status?;
        let kind = MessageKind::from_status(status)?;
        if !self.config.running_status {
            self.status = None;
        }
        Some(MidiMessage::Channel(ChannelMessage::new(
            kind,
            status & 0x0F,
            data1,
            data2,
        )))
    }

    fn take_sysex(&mut self, complete: bool) -> MidiMessage {
        MidiMessage::SysExChunk {
            data: std::mem::take(&mut self.sysex),
            complete,
        }
    }
}

impl MidiParser for SerialMidiParser {
    fn parse(&mut self, byte: u8) -> Option<MidiMessage> {
        let queued = self.pending.take();
        let message = match byte {
            0xF8..=0xFF => Some(MidiMessage::Realtime(SystemRealtime::new(byte))),
            0x80..=0xF7 => self.handle_status(byte),
            _ => self.handle_data(byte),
        };
        // A queued message is older than whatever this byte completed
        match queued {
            Some(queued) => {
                self.pending = message;
                Some(queued)
            }
            None => message,
        }
    }

    fn take_pending(&mut self) -> Option<MidiMessage> {
        self.pending.take()
    }

    fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.status = None;
        self.data1 = 0;
        self.sysex.clear();
        self.pending = None;
    }
}

impl Default for SerialMidiParser {
    fn default() -> Self {
        Self::new()
    }
}
