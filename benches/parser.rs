use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use midi_surface::parser::{encode_hex, HexMidiParser, MidiParser, SerialMidiParser};

/// A few seconds of busy controller traffic: notes, running status CCs,
/// clock ticks and a short SysEx
fn traffic() -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..512u32 {
        let note = (i % 128) as u8;
        bytes.extend([0x90, note, 0x7F, 0xF8, 0x80, note, 0x40]);
        bytes.extend([0xB0, 7, note, 10, note]);
        if i % 64 == 0 {
            bytes.extend([0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7]);
        }
    }
    bytes
}

fn bench_parsers(c: &mut Criterion) {
    let binary = traffic();
    let hex = encode_hex(&binary);

    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(binary.len() as u64));
    group.bench_function("binary", |b| {
        b.iter(|| {
            let mut parser = SerialMidiParser::new();
            black_box(&binary)
                .iter()
                .filter_map(|&byte| parser.parse(byte))
                .count()
        })
    });
    group.bench_function("hex", |b| {
        b.iter(|| {
            let mut parser = HexMidiParser::new();
            black_box(hex.as_bytes())
                .iter()
                .filter_map(|&byte| parser.parse(byte))
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_parsers);
criterion_main!(benches);
