//! Batch encoding and payload URL construction benchmarks.

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use mixpanel_sender::StdConsumer;
use mixpanel_sender::buffer::{Batch, encode_json_array};
use url::Url;

fn create_message(id: usize) -> Bytes {
    Bytes::from(format!(
        r#"{{"event":"Benchmark Event","properties":{{"token":"bench-token","distinct_id":"user-{id}","time":1700000000,"mp_lib":"rust","plan":"premium"}}}}"#
    ))
}

fn create_messages(count: usize) -> Vec<Bytes> {
    (0..count).map(create_message).collect()
}

fn bench_encode_json_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_json_array");

    for batch_size in [1, 50, 500, 5000] {
        let messages = create_messages(batch_size);
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &messages,
            |b, messages| b.iter(|| black_box(encode_json_array(messages))),
        );
    }

    group.finish();
}

fn bench_request_url(c: &mut Criterion) {
    let target = Url::parse("https://api.mixpanel.com/track").unwrap();
    let mut group = c.benchmark_group("request_url");

    for batch_size in [1, 50, 500] {
        let payload = Batch::new("events", create_messages(batch_size)).encode();
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &payload,
            |b, payload| b.iter(|| black_box(StdConsumer::request_url(&target, payload))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encode_json_array, bench_request_url);
criterion_main!(benches);
