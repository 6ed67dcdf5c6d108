//! Property tests for the parsers and the address lock

use proptest::prelude::*;

use midi_surface::bank::{resolve, Address, BankConfig, BankOffset, BankTarget, OverflowPolicy};
use midi_surface::control::{ControlState, MidiButton, NoteSender};
use midi_surface::interface::SerialMidiInterface;
use midi_surface::midi::{MessageKind, MidiMessage, SystemRealtime};
use midi_surface::parser::{encode_hex, HexMidiParser, MidiParser, SerialMidiParser};
use midi_surface::transport::MemoryTransport;

fn kind() -> impl Strategy<Value = MessageKind> {
    prop_oneof![
        Just(MessageKind::NoteOff),
        Just(MessageKind::NoteOn),
        Just(MessageKind::KeyPressure),
        Just(MessageKind::ControlChange),
        Just(MessageKind::ProgramChange),
        Just(MessageKind::ChannelPressure),
        Just(MessageKind::PitchBend),
    ]
}

fn channel_message() -> impl Strategy<Value = MidiMessage> {
    (kind(), 0u8..16, 0u8..128, 0u8..128)
        .prop_map(|(kind, channel, d1, d2)| MidiMessage::channel_message(kind, channel, d1, d2))
}

fn encode_all(messages: &[MidiMessage]) -> Vec<u8> {
    messages.iter().flat_map(|m| m.encode()).collect()
}

#[derive(Debug, Clone)]
enum Gesture {
    Press,
    Release,
    Bank(i32),
}

fn gesture() -> impl Strategy<Value = Gesture> {
    prop_oneof![
        Just(Gesture::Press),
        Just(Gesture::Release),
        (-300i32..300).prop_map(Gesture::Bank),
    ]
}

fn bank_config() -> impl Strategy<Value = BankConfig> {
    let target = prop_oneof![
        Just(BankTarget::Channel),
        Just(BankTarget::Address),
        Just(BankTarget::Both),
    ];
    let policy = || prop_oneof![Just(OverflowPolicy::Wrap), Just(OverflowPolicy::Clamp)];
    (target, policy(), policy())
        .prop_map(|(target, ch, addr)| BankConfig::new(target).with_overflow(ch, addr))
}

proptest! {
    #[test]
    fn prop_every_message_is_parsed_once(messages in prop::collection::vec(channel_message(), 0..64)) {
        let mut parser = SerialMidiParser::new();
        let parsed = parser.feed(&encode_all(&messages));
        prop_assert_eq!(parsed, messages);
    }

    #[test]
    fn prop_hex_matches_binary(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let binary = SerialMidiParser::new().feed(&bytes);
        let hex = HexMidiParser::new().feed(encode_hex(&bytes).as_bytes());
        prop_assert_eq!(hex, binary);
    }

    #[test]
    fn prop_chunk_boundaries_do_not_matter(
        bytes in prop::collection::vec(any::<u8>(), 0..256),
        split in any::<prop::sample::Index>(),
    ) {
        let whole = SerialMidiParser::new().feed(&bytes);

        let (head, tail) = bytes.split_at(split.index(bytes.len() + 1));
        let mut midi = SerialMidiInterface::new(MemoryTransport::new());
        let mut chunked = Vec::new();
        for chunk in [head, tail] {
            midi.transport_mut().push_input(chunk);
            while let Some(message) = midi.read().unwrap() {
                chunked.push(message);
            }
        }
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn prop_realtime_bytes_do_not_disturb_messages(
        messages in prop::collection::vec(channel_message(), 1..16),
        positions in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut bytes = encode_all(&messages);
        for position in &positions {
            bytes.insert(position.index(bytes.len() + 1), 0xF8);
        }

        let parsed = SerialMidiParser::new().feed(&bytes);
        let clocks = parsed
            .iter()
            .filter(|m| **m == MidiMessage::Realtime(SystemRealtime::TimingClock))
            .count();
        let channel: Vec<_> = parsed.into_iter().filter(|m| m.is_channel_message()).collect();

        prop_assert_eq!(clocks, positions.len());
        prop_assert_eq!(channel, messages);
    }

    #[test]
    fn prop_resolve_stays_in_range(
        channel in 0u8..16,
        address in 0u8..128,
        offset in any::<i32>(),
        config in bank_config(),
    ) {
        let base = Address::new(channel, address).unwrap();
        let resolved = resolve(base, BankOffset(offset), &config);
        prop_assert!(resolved.channel() < 16);
        prop_assert!(resolved.address() < 128);
    }

    #[test]
    fn prop_release_uses_press_address(
        gestures in prop::collection::vec(gesture(), 0..64),
        config in bank_config(),
    ) {
        let base = Address::new(3, 60).unwrap();
        let mut button = MidiButton::new("pad", base, config, NoteSender::default());
        let mut offset = BankOffset(0);
        let mut out: Vec<MidiMessage> = Vec::new();
        let mut pressed_at = Vec::new();

        for gesture in gestures {
            match gesture {
                Gesture::Press => {
                    if button.state() == ControlState::Idle {
                        pressed_at.push(resolve(base, offset, &config));
                    }
                    button.press(offset, &mut out).unwrap();
                }
                Gesture::Release => button.release(&mut out).unwrap(),
                Gesture::Bank(o) => offset = BankOffset(o),
            }
        }

        // Every "on" goes to the address resolved with the offset at press time
        let on_addresses: Vec<_> = out
            .iter()
            .filter_map(|m| match m {
                MidiMessage::Channel(msg) if msg.kind == MessageKind::NoteOn => {
                    Some(Address::new(msg.channel, msg.data1).unwrap())
                }
                _ => None,
            })
            .collect();
        prop_assert_eq!(on_addresses, pressed_at);

        // Strict on/off alternation, each off at the address of its on
        for pair in out.chunks(2) {
            let MidiMessage::Channel(on) = &pair[0] else {
                panic!("unexpected message {:?}", pair[0]);
            };
            prop_assert_eq!(on.kind, MessageKind::NoteOn);
            if let Some(MidiMessage::Channel(off)) = pair.get(1) {
                prop_assert_eq!(off.kind, MessageKind::NoteOff);
                prop_assert_eq!((off.channel, off.data1), (on.channel, on.data1));
            }
        }
    }
}
