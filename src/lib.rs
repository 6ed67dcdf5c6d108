//! MIDI Surface
//!
//! MIDI byte-stream parsing (binary and hex debug text) and bankable
//! push buttons whose address stays latched while they are held.

pub mod bank;
pub mod config;
pub mod control;
pub mod interface;
pub mod midi;
pub mod parser;
pub mod surface;
pub mod transport;
