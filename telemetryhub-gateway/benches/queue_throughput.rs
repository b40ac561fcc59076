//! Benchmarks for the telemetry queue

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use telemetryhub::TelemetrySample;
use telemetryhub_gateway::TelemetryQueue;

fn make_samples(count: u32) -> Vec<TelemetrySample> {
    (0..count)
        .map(|seq| {
            let value = 42.0 + (f64::from(seq) / 10.0).sin();
            TelemetrySample::new(value, "arb.units", seq)
        })
        .collect()
}

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");

    let samples = make_samples(1000);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("push_pop_1000_unbounded", |b| {
        b.iter(|| {
            let queue = TelemetryQueue::new();
            for sample in &samples {
                queue.push(sample.clone());
            }
            queue.shutdown();
            while let Some(sample) = queue.pop() {
                black_box(sample);
            }
        })
    });

    group.bench_function("push_1000_drop_oldest_capacity_64", |b| {
        b.iter(|| {
            let queue = TelemetryQueue::with_capacity(64);
            for sample in &samples {
                queue.push(sample.clone());
            }
            black_box(queue.dropped());
        })
    });

    group.finish();
}

fn bench_producer_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_concurrent");

    let samples = make_samples(1000);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("handoff_1000_across_threads", |b| {
        b.iter(|| {
            let queue = Arc::new(TelemetryQueue::with_capacity(256));

            let producer = {
                let queue = queue.clone();
                let samples = samples.clone();
                thread::spawn(move || {
                    for sample in samples {
                        queue.push(sample);
                    }
                    queue.shutdown();
                })
            };

            let consumer = {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut count = 0u32;
                    while let Some(sample) = queue.pop() {
                        black_box(sample);
                        count += 1;
                    }
                    count
                })
            };

            producer.join().unwrap();
            black_box(consumer.join().unwrap());
        })
    });

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_producer_consumer);
criterion_main!(benches);
