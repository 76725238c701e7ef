//! Performance benchmarks for the session hot path
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use base64::{Engine, prelude::BASE64_STANDARD};
use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use voice_relay::core::session::{SessionEvent, TranscriptSource};
use voice_relay::core::turn::TurnAccumulator;
use voice_relay::core::vad::{EnergyVAD, VADConfig, mean_abs_amplitude};
use voice_relay::handlers::realtime::messages::{
    RealtimeIncomingMessage, RealtimeOutgoingMessage, decode_audio,
};

fn pcm_frame(amplitude: i16, samples: usize) -> Vec<u8> {
    std::iter::repeat_n(amplitude.to_le_bytes(), samples)
        .flatten()
        .collect()
}

/// Benchmark the VAD gate on typical frame sizes
fn bench_vad(c: &mut Criterion) {
    let mut group = c.benchmark_group("vad");
    group.measurement_time(Duration::from_secs(5));

    // 20 ms frames at the supported rates
    for rate in [8000usize, 16000, 48000] {
        let frame = pcm_frame(1200, rate / 50);
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("energy", rate), &frame, |b, frame| {
            b.iter(|| mean_abs_amplitude(black_box(frame)));
        });
    }

    let speech = pcm_frame(1200, 320);
    let silence = pcm_frame(20, 320);
    group.bench_function("speech_then_hangover", |b| {
        let mut vad = EnergyVAD::new(VADConfig::default());
        b.iter(|| {
            vad.process_frame(black_box(&speech));
            for _ in 0..20 {
                vad.process_frame(black_box(&silence));
            }
        });
    });

    group.finish();
}

/// Benchmark client message parsing, including audio payload decoding
fn bench_message_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_parsing");
    group.measurement_time(Duration::from_secs(5));

    let init = r#"{"type":"init","config":{"language":"ko","useWhisper":false,"sampleRate":16000}}"#;
    group.bench_function("init", |b| {
        b.iter(|| {
            let _: Result<RealtimeIncomingMessage, _> = serde_json::from_str(black_box(init));
        });
    });

    for samples in [320usize, 960, 4800] {
        let data = BASE64_STANDARD.encode(pcm_frame(800, samples));
        let audio = format!(r#"{{"type":"audio","data":"{data}","timestamp":1700000000000}}"#);
        group.throughput(Throughput::Bytes(audio.len() as u64));
        group.bench_with_input(BenchmarkId::new("audio", samples), &audio, |b, msg| {
            b.iter(|| {
                let parsed: RealtimeIncomingMessage =
                    serde_json::from_str(black_box(msg)).expect("valid audio message");
                if let RealtimeIncomingMessage::Audio { data, .. } = parsed {
                    black_box(decode_audio(&data).expect("valid audio payload"));
                }
            });
        });
    }

    group.finish();
}

/// Benchmark serialization of the events sent back to the browser
fn bench_event_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_serialization");
    group.measurement_time(Duration::from_secs(5));

    // 100 ms of 24 kHz model audio
    let audio = SessionEvent::AudioResponse {
        data: Bytes::from(pcm_frame(500, 2400)),
        sample_rate: 24000,
    };
    group.bench_function("audio_response", |b| {
        b.iter(|| {
            let message = RealtimeOutgoingMessage::from(black_box(audio.clone()));
            serde_json::to_string(&message).expect("serializable")
        });
    });

    let transcription = SessionEvent::Transcription {
        text: "안녕하세요, 오늘 회의를 시작하겠습니다.".to_string(),
        is_final: false,
        language: None,
        source: TranscriptSource::Input,
    };
    group.bench_function("transcription", |b| {
        b.iter(|| {
            let message = RealtimeOutgoingMessage::from(black_box(transcription.clone()));
            serde_json::to_string(&message).expect("serializable")
        });
    });

    group.finish();
}

/// Benchmark transcript accumulation across a long turn
fn bench_turn_accumulation(c: &mut Criterion) {
    c.bench_function("turn_accumulation_200_chunks", |b| {
        b.iter(|| {
            let mut turn = TurnAccumulator::new();
            for _ in 0..200 {
                black_box(turn.append_input("word "));
                black_box(turn.append_output("단어 "));
            }
            turn.complete()
        });
    });
}

criterion_group!(
    benches,
    bench_vad,
    bench_message_parsing,
    bench_event_serialization,
    bench_turn_accumulation,
);

criterion_main!(benches);
