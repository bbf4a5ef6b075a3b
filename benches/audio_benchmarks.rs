//! Performance benchmarks for the audio hot path
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use tts_manager::audiosocket::{FRAME_BYTES, OUTPUT_SAMPLE_RATE, downsample, wrap_pcm16};
use tts_manager::models::Message;
use tts_manager::tts::elevenlabs::StreamResponse;
use uuid::Uuid;

/// PCM16 ramp of `ms` milliseconds at `rate`
fn pcm(rate: u32, ms: u32) -> Vec<u8> {
    let samples = (rate / 1000 * ms) as usize;
    (0..samples)
        .flat_map(|i| ((i as i16).wrapping_mul(31)).to_le_bytes())
        .collect()
}

/// Benchmark vendor audio conversion to 8 kHz
fn bench_downsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsample");
    group.measurement_time(Duration::from_secs(5));

    for rate in [16_000u32, 24_000, 48_000] {
        // One second of vendor audio
        let input = pcm(rate, 1000);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("1s", rate), &input, |b, input| {
            b.iter(|| downsample(black_box(input), rate, OUTPUT_SAMPLE_RATE).unwrap());
        });
    }

    group.finish();
}

/// Benchmark outbound frame encoding
fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encoding");

    let frame = vec![0x55u8; FRAME_BYTES];
    group.throughput(Throughput::Bytes(frame.len() as u64));
    group.bench_function("wrap_pcm16_20ms", |b| {
        b.iter(|| wrap_pcm16(black_box(&frame)).unwrap());
    });

    // A second of 8 kHz audio, split the way the sink writes it
    let second = pcm(OUTPUT_SAMPLE_RATE, 1000);
    group.throughput(Throughput::Bytes(second.len() as u64));
    group.bench_function("wrap_pcm16_1s_chunked", |b| {
        b.iter(|| {
            for chunk in black_box(&second).chunks(FRAME_BYTES) {
                black_box(wrap_pcm16(chunk).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark parsing of vendor audio messages
fn bench_vendor_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("vendor_messages");

    let text = "Hello, this is a test message for speech synthesis.";
    let chars: Vec<String> = text.chars().map(|c| c.to_string()).collect();
    let message = serde_json::json!({
        "audio": BASE64.encode(pcm(16_000, 250)),
        "alignment": {
            "chars": chars,
            "charStartTimesMs": vec![0u64; chars.len()],
            "charsDurationsMs": vec![10u64; chars.len()],
        },
    })
    .to_string();

    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("parse_audio_250ms", |b| {
        b.iter(|| serde_json::from_str::<StreamResponse>(black_box(&message)).unwrap());
    });

    group.bench_function("advance_progress", |b| {
        b.iter(|| {
            let mut progress = Message::new(Uuid::nil());
            progress.push_text(text);
            black_box(progress.advance(black_box(text)))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_downsample,
    bench_frame_encoding,
    bench_vendor_messages
);
criterion_main!(benches);
