use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use serde_json::json;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use tablebeat_events::{Event, InMemoryBatch, NoopObserver};
use tablebeat_infra::{
    Client, InMemoryConnector, InMemoryStore, OutputConfig, extract, make_output,
};

fn heartbeat(i: usize) -> Event {
    let payload = json!({
        "monitor_id": format!("monitor-{}", i % 64),
        "checked_at": format!("2024-05-01T12:{:02}:{:02}Z", (i / 60) % 60, i % 60),
        "status": if i % 7 == 0 { "down" } else { "up" },
        "duration_ms": i % 1000,
    });
    Event::new(json!({
        "headers": { "Model": ["Heartbeat"] },
        "data": { "data": payload.to_string() }
    }))
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn connected_client(rt: &Runtime) -> Client<InMemoryConnector> {
    let config = OutputConfig::new("bench", "beats", "secret", "telemetry");
    let connector = InMemoryConnector::new(Arc::new(InMemoryStore::new()));
    let group = make_output(config, connector, Arc::new(NoopObserver)).expect("valid config");
    rt.block_on(group.client.connect()).expect("connect");
    group.client
}

/// Benchmark: extraction alone (no store).
fn bench_extract(c: &mut Criterion) {
    let event = heartbeat(1);
    c.bench_function("extract_record", |b| {
        b.iter(|| black_box(extract(black_box(&event)).is_ok()))
    });
}

/// Benchmark: full publish of one batch into the in-memory store.
fn bench_publish_throughput(c: &mut Criterion) {
    let rt = runtime();
    let client = connected_client(&rt);
    let cancel = CancellationToken::new();

    let mut group = c.benchmark_group("publish_batch");
    for size in [1usize, 64, 512, 2048] {
        let events: Vec<Event> = (0..size).map(heartbeat).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| {
                let (batch, _receipt) = InMemoryBatch::new(events.clone());
                let summary = rt
                    .block_on(client.publish(batch, &cancel))
                    .expect("publish");
                black_box(summary)
            })
        });
    }
    group.finish();
}

/// Benchmark: batches where every other event is unroutable.
fn bench_publish_mixed(c: &mut Criterion) {
    let rt = runtime();
    let client = connected_client(&rt);
    let cancel = CancellationToken::new();

    let events: Vec<Event> = (0..512)
        .map(|i| {
            if i % 2 == 0 {
                heartbeat(i)
            } else {
                Event::new(json!({ "data": { "data": "{}" } }))
            }
        })
        .collect();

    c.bench_function("publish_batch_half_dropped", |b| {
        b.iter(|| {
            let (batch, _receipt) = InMemoryBatch::new(events.clone());
            black_box(rt.block_on(client.publish(batch, &cancel)).expect("publish"))
        })
    });
}

criterion_group!(
    benches,
    bench_extract,
    bench_publish_throughput,
    bench_publish_mixed
);
criterion_main!(benches);
