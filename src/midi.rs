//! MIDI utilities and message types
//!
//! Provides the message model shared by the parsers, the interfaces and the
//! controls, plus the binary encoding used on the way out.

use serde::Serialize;
use std::fmt;

/// Channel-voice message kinds, keyed by the high nibble of the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    NoteOff,
    NoteOn,
    KeyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
}

impl MessageKind {
    /// Look up the kind for a status byte (0x80-0xEF), `None` for anything else
    pub fn from_status(status: u8) -> Option<Self> {
        match status >> 4 {
            0x8 => Some(MessageKind::NoteOff),
            0x9 => Some(MessageKind::NoteOn),
            0xA => Some(MessageKind::KeyPressure),
            0xB => Some(MessageKind::ControlChange),
            0xC => Some(MessageKind::ProgramChange),
            0xD => Some(MessageKind::ChannelPressure),
            0xE => Some(MessageKind::PitchBend),
            _ => None,
        }
    }

    /// High nibble of the status byte (0x8-0xE)
    pub fn status_nibble(self) -> u8 {
        match self {
            MessageKind::NoteOff => 0x8,
            MessageKind::NoteOn => 0x9,
            MessageKind::KeyPressure => 0xA,
            MessageKind::ControlChange => 0xB,
            MessageKind::ProgramChange => 0xC,
            MessageKind::ChannelPressure => 0xD,
            MessageKind::PitchBend => 0xE,
        }
    }

    /// Number of data bytes following the status byte
    pub fn data_len(self) -> usize {
        match self {
            MessageKind::ProgramChange | MessageKind::ChannelPressure => 1,
            _ => 2,
        }
    }

    /// Human-readable label, padded with tabs for column output
    pub fn label(self) -> &'static str {
        match self {
            MessageKind::NoteOff => "Note Off\t",
            MessageKind::NoteOn => "Note On\t\t",
            MessageKind::KeyPressure => "Key Pressure\t",
            MessageKind::ControlChange => "Control Change\t",
            MessageKind::ProgramChange => "Program Change\t",
            MessageKind::ChannelPressure => "Channel Pressure",
            MessageKind::PitchBend => "Pitch Bend\t",
        }
    }
}

/// A channel-voice message: channel (0-15), data1 (0-127), data2 (0-127)
///
/// `data2` is always 0 for kinds with a single data byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelMessage {
    pub kind: MessageKind,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ChannelMessage {
    /// Build a message, masking every field into its wire range
    pub fn new(kind: MessageKind, channel: u8, data1: u8, data2: u8) -> Self {
        let data2 = if kind.data_len() == 2 { data2 & 0x7F } else { 0 };
        Self {
            kind,
            channel: channel & 0x0F,
            data1: data1 & 0x7F,
            data2,
        }
    }

    /// Status byte (kind nibble | channel)
    pub fn status(&self) -> u8 {
        (self.kind.status_nibble() << 4) | (self.channel & 0x0F)
    }

    /// 14-bit pitch bend value (only meaningful for `PitchBend`)
    pub fn pitch_bend_value(&self) -> u16 {
        ((self.data2 as u16) << 7) | self.data1 as u16
    }
}

/// System realtime messages (0xF8-0xFF), which may interleave with anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemRealtime {
    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
    Undefined(u8),
}

impl SystemRealtime {
    pub fn new(status: u8) -> Self {
        match status {
            0xF8 => SystemRealtime::TimingClock,
            0xFA => SystemRealtime::Start,
            0xFB => SystemRealtime::Continue,
            0xFC => SystemRealtime::Stop,
            0xFE => SystemRealtime::ActiveSensing,
            0xFF => SystemRealtime::Reset,
            _ => SystemRealtime::Undefined(status),
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            SystemRealtime::TimingClock => 0xF8,
            SystemRealtime::Start => 0xFA,
            SystemRealtime::Continue => 0xFB,
            SystemRealtime::Stop => 0xFC,
            SystemRealtime::ActiveSensing => 0xFE,
            SystemRealtime::Reset => 0xFF,
            SystemRealtime::Undefined(byte) => byte,
        }
    }
}

/// A complete MIDI message as produced by the parsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiMessage {
    /// Note On/Off, Control Change, Pitch Bend, ...
    Channel(ChannelMessage),

    /// System Exclusive payload (without F0/F7)
    ///
    /// Long dumps are delivered in several chunks; `complete` is set on the
    /// chunk that was closed by an F7 end marker.
    SysExChunk { data: Vec<u8>, complete: bool },

    /// System common status (0xF1-0xF6), passed through without data
    SystemCommon { status: u8 },

    /// Timing clock, start, stop, ...
    Realtime(SystemRealtime),
}

impl MidiMessage {
    /// Shorthand for a channel-voice message
    pub fn channel_message(kind: MessageKind, channel: u8, data1: u8, data2: u8) -> Self {
        MidiMessage::Channel(ChannelMessage::new(kind, channel, data1, data2))
    }

    /// Encode the message to MIDI bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            MidiMessage::Channel(msg) => {
                let mut out = Vec::with_capacity(3);
                out.push(msg.status());
                self.encode_data(&mut out);
                out
            }
            MidiMessage::SysExChunk { data, complete } => {
                let mut out = Vec::with_capacity(data.len() + 2);
                out.push(0xF0);
                out.extend(data.iter().map(|b| b & 0x7F));
                if *complete {
                    out.push(0xF7);
                }
                out
            }
            MidiMessage::SystemCommon { status } => vec![*status],
            MidiMessage::Realtime(rt) => vec![rt.encode()],
        }
    }

    /// Append only the data bytes of a channel message (for running status)
    pub(crate) fn encode_data(&self, out: &mut Vec<u8>) {
        if let MidiMessage::Channel(msg) = self {
            out.push(msg.data1 & 0x7F);
            if msg.kind.data_len() == 2 {
                out.push(msg.data2 & 0x7F);
            }
        }
    }

    /// Get the channel for channel messages (0-15), None for system messages
    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::Channel(msg) => Some(msg.channel),
            _ => None,
        }
    }

    /// Check if this is a channel message
    pub fn is_channel_message(&self) -> bool {
        self.channel().is_some()
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::Channel(msg) => {
                let ch = msg.channel + 1;
                match msg.kind {
                    MessageKind::NoteOff => {
                        write!(f, "NoteOff ch:{} n:{} v:{}", ch, msg.data1, msg.data2)
                    }
                    MessageKind::NoteOn => {
                        write!(f, "NoteOn ch:{} n:{} v:{}", ch, msg.data1, msg.data2)
                    }
                    MessageKind::KeyPressure => {
                        write!(f, "KeyPressure ch:{} n:{} p:{}", ch, msg.data1, msg.data2)
                    }
                    MessageKind::ControlChange => {
                        write!(f, "CC ch:{} cc:{} v:{}", ch, msg.data1, msg.data2)
                    }
                    MessageKind::ProgramChange => {
                        write!(f, "ProgramChange ch:{} p:{}", ch, msg.data1)
                    }
                    MessageKind::ChannelPressure => {
                        write!(f, "ChannelPressure ch:{} p:{}", ch, msg.data1)
                    }
                    MessageKind::PitchBend => {
                        write!(f, "PitchBend ch:{} v:{}", ch, msg.pitch_bend_value())
                    }
                }
            }
            MidiMessage::SysExChunk { data, complete } => {
                let suffix = if *complete { "" } else { " (partial)" };
                write!(f, "SysEx {} bytes{}", data.len(), suffix)
            }
            MidiMessage::SystemCommon { status } => write!(f, "SystemCommon 0x{:02X}", status),
            MidiMessage::Realtime(rt) => write!(f, "{:?}", rt),
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}
