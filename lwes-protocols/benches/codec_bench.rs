#[macro_use]
extern crate criterion;

use std::net::Ipv4Addr;

use criterion::{black_box, Criterion};

use lwes_protocols::{decode, encode, Event};

fn sample_event() -> Event {
    Event::new("Http::Request")
        .with("method", "GET")
        .with("path", "/index.html")
        .with("status", 200u16)
        .with("bytes", 51_234u32)
        .with("latency_us", 1_834i64)
        .with("client", Ipv4Addr::new(192, 168, 10, 4))
        .with("cached", false)
}

fn benchmark_encode(c: &mut Criterion) {
    let event = sample_event();

    c.bench_function("event_encode", |b| {
        b.iter(|| {
            black_box(encode(&event)).unwrap();
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let datagram = encode(&sample_event()).unwrap();

    c.bench_function("event_decode", |b| {
        b.iter(|| {
            black_box(decode(&datagram)).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_encode, benchmark_decode);
criterion_main!(benches);
