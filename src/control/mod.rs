//! Controls and senders
//!
//! A control decides *when* to send (press/release), a [`Sender`] decides
//! *what* to send (note, control change, ...). Senders are picked when the
//! control is built.

mod button;

pub use self::button::{Button, ButtonState, ControlState, MidiButton};

use crate::bank::Address;
use crate::interface::MidiOutput;
use crate::midi::{MessageKind, MidiMessage};
use crate::transport::TransportError;

/// Emits the "on" and "off" message of a gesture at a resolved address
pub trait Sender {
    fn send_on(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError>;
    fn send_off(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError>;
}

impl<S: Sender + ?Sized> Sender for Box<S> {
    fn send_on(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        (**self).send_on(out, address)
    }

    fn send_off(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        (**self).send_off(out, address)
    }
}

/// Note On when pressed, Note Off when released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSender {
    pub velocity: u8,
    pub off_velocity: u8,
}

impl NoteSender {
    pub fn new(velocity: u8) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }
}

impl Default for NoteSender {
    fn default() -> Self {
        Self {
            velocity: 0x7F,
            off_velocity: 0x7F,
        }
    }
}

impl Sender for NoteSender {
    fn send_on(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        out.send(&MidiMessage::channel_message(
            MessageKind::NoteOn,
            address.channel(),
            address.address(),
            self.velocity,
        ))
    }

    fn send_off(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        out.send(&MidiMessage::channel_message(
            MessageKind::NoteOff,
            address.channel(),
            address.address(),
            self.off_velocity,
        ))
    }
}

/// Control Change with an "on" value when pressed and an "off" value when released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChangeSender {
    pub on_value: u8,
    pub off_value: u8,
}

impl Default for ControlChangeSender {
    fn default() -> Self {
        Self {
            on_value: 0x7F,
            off_value: 0x00,
        }
    }
}

impl Sender for ControlChangeSender {
    fn send_on(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        out.send(&MidiMessage::channel_message(
            MessageKind::ControlChange,
            address.channel(),
            address.address(),
            self.on_value,
        ))
    }

    fn send_off(&self, out: &mut dyn MidiOutput, address: Address) -> Result<(), TransportError> {
        out.send(&MidiMessage::channel_message(
            MessageKind::ControlChange,
            address.channel(),
            address.address(),
            self.off_value,
        ))
    }
}
