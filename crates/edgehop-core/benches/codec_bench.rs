//! Criterion benchmarks for the Edgehop binary codec.
//!
//! Mouse-move and key messages are encoded on every input event while a
//! remote screen is active, so codec latency sits directly on the
//! input-to-display path.
//!
//! Run with:
//! ```bash
//! cargo bench --package edgehop-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edgehop_core::protocol::codec::{decode_message, encode_message};
use edgehop_core::protocol::messages::Message;

// ── Message fixtures ──────────────────────────────────────────────────────────

fn fixtures() -> Vec<(&'static str, Message)> {
    vec![
        ("MouseMove", Message::MouseMove { x: 960, y: 540 }),
        ("KeyDown", Message::KeyDown { key: 0x61, mask: 0x0002 }),
        ("KeyRepeat", Message::KeyRepeat { key: 0x61, mask: 0, count: 4 }),
        ("MouseWheel", Message::MouseWheel { delta: -120 }),
        ("Enter", Message::Enter { x: 1, y: 384, mask: 0 }),
        ("Leave", Message::Leave),
        ("ScreenInfo", Message::ScreenInfo { width: 1920, height: 1080, zone: 1 }),
        (
            "ClipboardData(1KiB)",
            Message::ClipboardData { id: 0, data: vec![0x42; 1024] },
        ),
    ]
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_message");
    for (name, msg) in fixtures() {
        group.bench_with_input(BenchmarkId::new("msg", name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)).expect("encode must succeed"))
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_message");
    for (name, msg) in fixtures() {
        let bytes = encode_message(&msg).expect("encode must succeed for benchmark setup");
        group.bench_with_input(BenchmarkId::new("msg", name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).expect("decode must succeed"))
        });
    }
    group.finish();
}

/// Full round-trip for the two highest-frequency messages.
fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_decode_roundtrip");

    let mouse = Message::MouseMove { x: 960, y: 540 };
    group.bench_function("MouseMove", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&mouse)).unwrap();
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    let key = Message::KeyDown { key: 0x61, mask: 0x0002 };
    group.bench_function("KeyDown", |b| {
        b.iter(|| {
            let bytes = encode_message(black_box(&key)).unwrap();
            decode_message(black_box(&bytes)).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip_hot_path);
criterion_main!(benches);
