//! MIDI interfaces
//!
//! An interface owns a transport and a parser. Reading drains whatever the
//! transport has available and stops at the first complete message; sending
//! renders a message in the interface's wire format.

use std::fmt::Write as _;
use tracing::trace;

use crate::midi::{MessageKind, MidiMessage};
use crate::parser::{HexMidiParser, MidiParser, ParserConfig, SerialMidiParser};
use crate::transport::{Transport, TransportError};

/// Anything MIDI messages can be sent to
pub trait MidiOutput {
    fn send(&mut self, message: &MidiMessage) -> Result<(), TransportError>;
}

/// Collecting output, handy for simulations and tests
impl MidiOutput for Vec<MidiMessage> {
    fn send(&mut self, message: &MidiMessage) -> Result<(), TransportError> {
        self.push(message.clone());
        Ok(())
    }
}

/// Drops the status byte of channel messages that repeat the previous one
#[derive(Debug, Clone, Default)]
pub struct RunningStatusEncoder {
    last_status: Option<u8>,
}

impl RunningStatusEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, message: &MidiMessage) -> Vec<u8> {
        match message {
            MidiMessage::Channel(msg) => {
                if self.last_status == Some(msg.status()) {
                    let mut out = Vec::with_capacity(2);
                    message.encode_data(&mut out);
                    out
                } else {
                    self.last_status = Some(msg.status());
                    message.encode()
                }
            }
            // Realtime bytes do not disturb running status
            MidiMessage::Realtime(_) => message.encode(),
            _ => {
                self.last_status = None;
                message.encode()
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_status = None;
    }
}

fn read_message<T, P>(transport: &mut T, parser: &mut P) -> Result<Option<MidiMessage>, TransportError>
where
    T: Transport,
    P: MidiParser,
{
    if let Some(message) = parser.take_pending() {
        return Ok(Some(message));
    }
    while transport.available()? > 0 {
        let Some(byte) = transport.read() else {
            break;
        };
        if let Some(message) = parser.parse(byte) {
            return Ok(Some(message));
        }
    }
    Ok(None)
}

/// Binary MIDI over a byte transport
pub struct SerialMidiInterface<T> {
    transport: T,
    parser: SerialMidiParser,
    encoder: Option<RunningStatusEncoder>,
}

impl<T: Transport> SerialMidiInterface<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ParserConfig::default())
    }

    pub fn with_config(transport: T, config: ParserConfig) -> Self {
        Self {
            transport,
            parser: SerialMidiParser::with_config(config),
            encoder: None,
        }
    }

    /// Omit repeated status bytes on output
    pub fn with_running_status_output(mut self, enabled: bool) -> Self {
        self.encoder = enabled.then(RunningStatusEncoder::new);
        self
    }

    pub fn begin(&mut self) -> Result<(), TransportError> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.reset();
        }
        self.transport.begin()
    }

    /// Next complete message from the available input, if any
    pub fn read(&mut self) -> Result<Option<MidiMessage>, TransportError> {
        read_message(&mut self.transport, &mut self.parser)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> MidiOutput for SerialMidiInterface<T> {
    fn send(&mut self, message: &MidiMessage) -> Result<(), TransportError> {
        let bytes = match self.encoder.as_mut() {
            Some(encoder) => encoder.encode(message),
            None => message.encode(),
        };
        self.transport.write_all(&bytes)?;
        self.transport.flush()
    }
}

/// Human-readable MIDI over a byte transport
///
/// Input is hex text (`"90 40 7F "`), output is one labelled line per
/// channel-voice message.
pub struct DebugMidiInterface<T> {
    transport: T,
    parser: HexMidiParser,
}

impl<T: Transport> DebugMidiInterface<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ParserConfig::default())
    }

    pub fn with_config(transport: T, config: ParserConfig) -> Self {
        Self {
            transport,
            parser: HexMidiParser::with_config(config),
        }
    }

    pub fn begin(&mut self) -> Result<(), TransportError> {
        self.transport.begin()
    }

    /// Next complete message from the available input, if any
    pub fn read(&mut self) -> Result<Option<MidiMessage>, TransportError> {
        read_message(&mut self.transport, &mut self.parser)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> MidiOutput for DebugMidiInterface<T> {
    fn send(&mut self, message: &MidiMessage) -> Result<(), TransportError> {
        let Some(line) = debug_line(message) else {
            trace!("Debug output skips {}", message);
            return Ok(());
        };
        self.transport.write_all(line.as_bytes())?;
        self.transport.flush()
    }
}

/// Labelled line for a channel-voice message, `None` for anything else
pub fn debug_line(message: &MidiMessage) -> Option<String> {
    let MidiMessage::Channel(msg) = message else {
        return None;
    };
    let mut line = String::new();
    let _ = write!(
        line,
        "{}\tChannel: {}\tData 1: 0x{:X}",
        msg.kind.label(),
        msg.channel + 1,
        msg.data1
    );
    if msg.kind.data_len() == 2 {
        let _ = write!(line, "\tData 2: 0x{:X}", msg.data2);
    }
    line.push_str("\r\n");
    Some(line)
}

/// Kind label without the column padding
pub fn kind_name(kind: MessageKind) -> &'static str {
    kind.label().trim_end_matches('\t')
}
