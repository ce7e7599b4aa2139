//! # Forwarding Gateway Benchmarks
//!
//! | Path | Work per operation |
//! |------|--------------------|
//! | Envelope decode | One bincode request per inbound frame |
//! | Envelope encode | One bincode response per reply |
//! | Registry commit | One locked move per successful login |
//! | Directive parse | One parse per delivered directive |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fwd_gateway::domain::{ConnectionRecord, Request, Response};
use fwd_gateway::ports::EnvelopeCodec;
use fwd_gateway::{BincodeCodec, ConnectionKey, ConnectionRegistry, UserId};
use shared_bus::Directive;
use std::net::SocketAddr;

// ============================================================================
// Envelope codec
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let codec = BincodeCodec::new();

    let login = codec.encode_request(&Request::login(42, "hunter2")).unwrap();
    group.bench_function("decode_login", |b| {
        b.iter(|| black_box(codec.decode(black_box(&login)).is_ok()))
    });

    for size in [64usize, 1024, 16 * 1024] {
        let frame = codec
            .encode_request(&Request::post(7, vec![0xAB; size]))
            .unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("decode_post", size), &frame, |b, frame| {
            b.iter(|| black_box(codec.decode(frame).is_ok()))
        });

        let delivery = Response::delivery(42, vec![0xCD; size]);
        group.bench_with_input(BenchmarkId::new("encode_delivery", size), &delivery, |b, r| {
            b.iter(|| black_box(codec.encode(r).map(|f| f.len())))
        });
    }

    group.finish();
}

// ============================================================================
// Local connection registry
// ============================================================================

fn bench_registry_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for live in [10usize, 1_000, 10_000] {
        let registry = ConnectionRegistry::new();
        for i in 0..live {
            let endpoint: SocketAddr = format!("10.1.{}.{}:4000", i / 250, i % 250).parse().unwrap();
            let (record, _rx) = ConnectionRecord::new(endpoint, 8);
            registry.insert(ConnectionKey::from_user(UserId::new(i as i64)), record);
        }

        let endpoint: SocketAddr = "10.9.9.9:5000".parse().unwrap();
        group.bench_with_input(BenchmarkId::new("commit", live), &live, |b, _| {
            b.iter(|| {
                let (record, _rx) = ConnectionRecord::new(endpoint, 8);
                let provisional = ConnectionKey::from_endpoint(endpoint);
                registry.insert(provisional.clone(), record.clone());
                let displaced = registry.commit(
                    provisional.as_str(),
                    ConnectionKey::from_user(UserId::new(-1)),
                    record,
                );
                black_box(displaced)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Directive parsing
// ============================================================================

fn bench_directive_parse(c: &mut Criterion) {
    let payload = Directive::DeleteUser(1_234_567).to_bytes();
    c.bench_function("directive_parse", |b| {
        b.iter(|| black_box(Directive::parse(black_box(&payload)).is_ok()))
    });
}

criterion_group!(benches, bench_codec, bench_registry_commit, bench_directive_parse);
criterion_main!(benches);
