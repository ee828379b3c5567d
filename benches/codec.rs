use criterion::{Criterion, criterion_group, criterion_main};
use pacswitch::{Layout, codec::mutate};
use std::hint::black_box;

fn record() -> Vec<u8> {
    let mut bytes = vec![0x46, 0, 0, 0, 0x10, 0, 0, 0, 0x09, 0, 0, 0, 0, 0, 0, 0];
    let padding = b"proxy.example.com:3128";
    bytes.extend_from_slice(&(padding.len() as u32).to_le_bytes());
    bytes.extend_from_slice(padding);
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 256]);
    bytes
}

fn bench_codec(c: &mut Criterion) {
    let disabled = record();
    let enabled = mutate(Layout::Padded, &disabled, true, "http://example.com/proxy.pac")
        .unwrap_or_default();

    c.bench_function("mutate_enable", |b| {
        b.iter(|| {
            mutate(
                Layout::Padded,
                black_box(&disabled),
                true,
                black_box("http://example.com/proxy.pac"),
            )
        })
    });

    c.bench_function("mutate_disable", |b| {
        b.iter(|| mutate(Layout::Padded, black_box(&enabled), false, ""))
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
