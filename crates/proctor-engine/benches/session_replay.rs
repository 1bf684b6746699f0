//! Session replay benchmarks
//!
//! Measures tracker and scoring throughput on synthetic signal traces,
//! independent of decoding and model inference.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package proctor-engine --bench session_replay
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use proctor_engine::{replay, score, EngineConfig, SignalTrace};
use proctor_models::{event_types, BoundingBox, Detection, Event, FaceSignal};
use std::time::Duration;

const FPS: f64 = 5.0;

/// Synthetic trace with flickering objects and periodic absences.
fn synthetic_trace(frames: usize) -> SignalTrace {
    let labels = ["cell phone", "book", "laptop"];
    let mut trace = SignalTrace::new("bench://synthetic.webm", FPS);

    for i in 0..frames {
        let t = i as f64 / FPS;
        let detections: Vec<Detection> = labels
            .iter()
            .enumerate()
            .filter(|(k, _)| (i / (20 + k * 7)) % 3 == 0)
            .map(|(k, label)| {
                Detection::new(
                    *label,
                    0.3 + 0.1 * k as f64,
                    BoundingBox::new(10.0 * k as f64, 20.0, 64.0, 48.0),
                    t,
                )
            })
            .collect();

        let face = match (i / 40) % 4 {
            0 => FaceSignal::with_faces(1, true, t),
            1 => FaceSignal::with_faces(1, i % 2 == 0, t),
            2 => FaceSignal::absent(t),
            _ => FaceSignal::with_faces(2, true, t),
        };

        trace.push(t, &detections, &face);
    }

    trace
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));

    let config = EngineConfig::default();

    // 1, 10 and 60 minutes at the default sample rate
    for frames in [300usize, 3_000, 18_000] {
        let trace = synthetic_trace(frames);

        group.throughput(Throughput::Elements(frames as u64));
        group.bench_with_input(BenchmarkId::new("frames", frames), &trace, |b, trace| {
            b.iter(|| {
                let report = replay(black_box(trace), &config);
                black_box(report)
            })
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    let kinds = [
        event_types::FACE_ABSENT,
        event_types::MULTIPLE_FACES,
        event_types::FOCUS_LOST,
        "cell_phone_detected",
        "book_detected",
    ];

    for count in [10usize, 1_000] {
        let events: Vec<Event> = (0..count)
            .map(|i| Event::critical(kinds[i % kinds.len()], i as f64, "bench"))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("events", count), &events, |b, events| {
            b.iter(|| black_box(score(black_box(events))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_replay, bench_score);
criterion_main!(benches);
