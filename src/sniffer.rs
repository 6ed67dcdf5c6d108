//! MIDI monitor for debugging and development
//!
//! Decodes a byte stream (binary or hex text) and prints one line per message.

use colored::*;
use serde::Serialize;
use std::time::Instant;

use midi_surface::config::WireFormat;
use midi_surface::interface::{DebugMidiInterface, SerialMidiInterface};
use midi_surface::midi::{format_hex, MessageKind, MidiMessage};
use midi_surface::parser::ParserConfig;
use midi_surface::transport::{MemoryTransport, TransportError};

/// Input side of the monitor: an interface fed from whatever chunks arrive
pub enum Decoder {
    Binary(SerialMidiInterface<MemoryTransport>),
    Hex(DebugMidiInterface<MemoryTransport>),
}

impl Decoder {
    pub fn new(format: WireFormat, config: ParserConfig) -> Self {
        match format {
            WireFormat::Binary => {
                Decoder::Binary(SerialMidiInterface::with_config(MemoryTransport::new(), config))
            }
            WireFormat::Hex => {
                Decoder::Hex(DebugMidiInterface::with_config(MemoryTransport::new(), config))
            }
        }
    }

    /// Queue a chunk of input and decode every message it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<MidiMessage>, TransportError> {
        let mut messages = Vec::new();
        match self {
            Decoder::Binary(midi) => {
                midi.transport_mut().push_input(bytes);
                while let Some(message) = midi.read()? {
                    messages.push(message);
                }
            }
            Decoder::Hex(midi) => {
                midi.transport_mut().push_input(bytes);
                while let Some(message) = midi.read()? {
                    messages.push(message);
                }
            }
        }
        Ok(messages)
    }
}

/// JSON line emitted with `--json`
#[derive(Debug, Serialize)]
struct MonitorEvent<'a> {
    timestamp_ms: u64,
    hex: String,
    text: String,
    message: &'a MidiMessage,
}

pub struct Monitor {
    start_time: Instant,
    json: bool,
}

impl Monitor {
    pub fn new(json: bool) -> Self {
        Self {
            start_time: Instant::now(),
            json,
        }
    }

    pub fn print_header(&self) {
        if self.json {
            return;
        }
        println!("{}", "=== MIDI Monitor ===".bold().cyan());
        println!("{}", "Format: [timestamp] DIR | HEX => PARSED".dimmed());
        println!("{}", "─".repeat(80).dimmed());
    }

    pub fn print(&self, message: &MidiMessage) {
        let timestamp_ms = self.start_time.elapsed().as_millis() as u64;
        if self.json {
            match json_line(timestamp_ms, message) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!("Failed to serialize message: {}", e),
            }
        } else {
            println!("{}", format_line(timestamp_ms, message));
        }
    }
}

fn json_line(timestamp_ms: u64, message: &MidiMessage) -> serde_json::Result<String> {
    serde_json::to_string(&MonitorEvent {
        timestamp_ms,
        hex: format_hex(&message.encode()),
        text: message.to_string(),
        message,
    })
}

/// `[nnnnnnnnms] IN  | HEX => message`
pub fn format_line(timestamp_ms: u64, message: &MidiMessage) -> String {
    let timestamp = format!("{:08}", timestamp_ms);
    let hex = format_hex(&message.encode());

    // Color code by message type
    let hex_colored = match message {
        MidiMessage::Channel(msg) => match msg.kind {
            MessageKind::NoteOn => hex.bright_green(),
            MessageKind::NoteOff => hex.bright_red(),
            MessageKind::ControlChange => hex.bright_yellow(),
            MessageKind::PitchBend => hex.bright_cyan(),
            _ => hex.normal(),
        },
        MidiMessage::SysExChunk { .. } => hex.bright_magenta(),
        MidiMessage::Realtime(_) => hex.bright_black(),
        MidiMessage::SystemCommon { .. } => hex.normal(),
    };

    format!(
        "[{}ms] {} | {} => {}",
        timestamp.dimmed(),
        "IN ".green(),
        hex_colored,
        message.to_string().bright_blue()
    )
}
