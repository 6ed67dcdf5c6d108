//! Bankable momentary push button

use tracing::debug;

use super::Sender;
use crate::bank::{Address, BankConfig, BankOffset, BankableAddress, LockState};
use crate::interface::MidiOutput;
use crate::transport::TransportError;

/// Debounced button reading, edges included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
    /// Just pressed (falling edge of an active-low input)
    Falling,
    /// Just released
    Rising,
}

/// Turns a debounced level into steady states and edges
#[derive(Debug, Clone, Default)]
pub struct Button {
    pressed: bool,
}

impl Button {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, pressed: bool) -> ButtonState {
        let state = match (self.pressed, pressed) {
            (false, true) => ButtonState::Falling,
            (true, false) => ButtonState::Rising,
            (true, true) => ButtonState::Pressed,
            (false, false) => ButtonState::Released,
        };
        self.pressed = pressed;
        state
    }
}

/// Gesture state of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlState {
    #[default]
    Idle,
    Pressed,
}

/// Momentary button that sends "on" when pressed and "off" when released
///
/// The address is resolved against the bank offset when the button goes
/// down and stays latched until it comes back up.
pub struct MidiButton<S> {
    name: String,
    address: BankableAddress,
    sender: S,
    button: Button,
    state: ControlState,
}

impl<S: Sender> MidiButton<S> {
    pub fn new(name: impl Into<String>, base: Address, config: BankConfig, sender: S) -> Self {
        Self {
            name: name.into(),
            address: BankableAddress::new(base, config),
            sender,
            button: Button::new(),
            state: ControlState::Idle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn lock_state(&self) -> LockState {
        self.address.lock_state()
    }

    /// Address a message would use right now
    pub fn current_address(&self, offset: BankOffset) -> Address {
        self.address.current(offset)
    }

    /// Poll with a debounced level (true = pressed)
    pub fn update_level(
        &mut self,
        pressed: bool,
        offset: BankOffset,
        out: &mut dyn MidiOutput,
    ) -> Result<(), TransportError> {
        let state = self.button.update(pressed);
        self.update(state, offset, out)
    }

    /// Drive the gesture state machine with a button reading
    ///
    /// Only a falling edge while idle and a rising edge while pressed do
    /// anything; every other reading is a no-op.
    pub fn update(
        &mut self,
        state: ButtonState,
        offset: BankOffset,
        out: &mut dyn MidiOutput,
    ) -> Result<(), TransportError> {
        match (self.state, state) {
            (ControlState::Idle, ButtonState::Falling) => {
                let Some(address) = self.address.lock(offset) else {
                    return Ok(());
                };
                self.state = ControlState::Pressed;
                debug!("{}: pressed, locked at {}", self.name, address);
                self.sender.send_on(out, address)
            }
            (ControlState::Pressed, ButtonState::Rising) => {
                let Some(address) = self.address.unlock() else {
                    return Ok(());
                };
                self.state = ControlState::Idle;
                debug!("{}: released at {}", self.name, address);
                self.sender.send_off(out, address)
            }
            (ControlState::Pressed, ButtonState::Falling)
            | (ControlState::Idle, ButtonState::Rising) => {
                debug!("{}: ignoring redundant {:?} edge", self.name, state);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub fn press(&mut self, offset: BankOffset, out: &mut dyn MidiOutput) -> Result<(), TransportError> {
        self.update(ButtonState::Falling, offset, out)
    }

    pub fn release(&mut self, out: &mut dyn MidiOutput) -> Result<(), TransportError> {
        // The offset is irrelevant on release: the latched address is used
        self.update(ButtonState::Rising, BankOffset::default(), out)
    }
}
