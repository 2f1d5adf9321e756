//! Marshaling benchmarks
//!
//! Measures lookup decoding and write/lookup round trips against the
//! in-process runtime, over growing frequency counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jevresp::interop::memory::{FindBehavior, MemoryLauncher, MemoryScript, WriteBehavior};
use jevresp::{Bridge, BridgeConfig, ChannelId, FindRequest, OutputFormat};

fn channels(count: usize) -> Vec<ChannelId> {
    (0..count)
        .map(|i| ChannelId::new(&format!("ST{:02}", i), "BHZ", "IU", "00"))
        .collect()
}

fn frequencies(count: usize) -> Vec<f64> {
    (1..=count).map(|f| f as f64 * 0.1).collect()
}

fn bridge(find: FindBehavior) -> Bridge<MemoryLauncher> {
    let script = MemoryScript::new().with_find(find).with_write(WriteBehavior::Accept);
    Bridge::new(MemoryLauncher::new(script), BridgeConfig::default())
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("find");

    for nfreqs in [10, 100, 1000] {
        let mut bridge = bridge(FindBehavior::Synthetic(channels(8)));
        let request = FindRequest::new(frequencies(nfreqs));

        group.bench_with_input(BenchmarkId::new("decode", nfreqs), &request, |b, request| {
            b.iter(|| {
                let list = bridge.find_responses(black_box(request));
                black_box(list)
            });
        });
    }

    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for nfreqs in [10, 100, 1000] {
        let mut seed = bridge(FindBehavior::Synthetic(channels(8)));
        let list = match seed.find_responses(&FindRequest::new(frequencies(nfreqs))) {
            Ok(list) => list,
            Err(e) => panic!("seed lookup failed: {}", e),
        };

        let mut bridge = bridge(FindBehavior::EchoWritten);
        let request = FindRequest::new(frequencies(nfreqs));

        group.bench_with_input(BenchmarkId::new("write_find", nfreqs), &list, |b, list| {
            b.iter(|| {
                let written = bridge.write_responses(black_box(list), OutputFormat::AmpPhase, false);
                let echoed = bridge.find_responses(&request);
                black_box((written, echoed))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find, bench_round_trip);
criterion_main!(benches);
