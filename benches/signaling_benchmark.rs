use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use serde_json::json;

use tether::signaling::{ClientEvent, ConnId, RelayKind, RoomRegistry, ServerEvent};

const OFFER_FRAME: &str = r#"["offer",{"type":"offer","sdp":"v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\na=group:BUNDLE 0\r\n"},"x7k2q9","AbCdEfGhIjKlMnOpQrSt"]"#;

/// inbound frame decoding benchmark
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("offer", |b| {
        b.iter(|| {
            let event = ClientEvent::parse(black_box(OFFER_FRAME)).unwrap();
            black_box(event)
        })
    });

    group.bench_function("create-room", |b| {
        b.iter(|| {
            let event = ClientEvent::parse(black_box(r#"["create-room"]"#)).unwrap();
            black_box(event)
        })
    });

    group.finish();
}

/// outbound relay encoding benchmark
fn bench_encode(c: &mut Criterion) {
    let event = ServerEvent::Relay {
        kind: RelayKind::IceCandidate,
        payload: json!({
            "candidate": "candidate:842163049 1 udp 1677729535 203.0.113.7 46154 typ srflx",
            "sdpMid": "0",
            "sdpMLineIndex": 0
        }),
        from: ConnId::generate(),
    };

    let mut group = c.benchmark_group("Encode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ice-candidate", |b| {
        b.iter(|| black_box(black_box(&event).to_message().unwrap()))
    });

    group.finish();
}

/// room create / host teardown cycle benchmark
fn bench_registry(c: &mut Criterion) {
    let mut registry = RoomRegistry::new();
    let bystander = ConnId::generate();
    for _ in 0..1000 {
        registry.create(bystander);
    }

    let mut group = c.benchmark_group("Registry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("create_then_remove_if_host", |b| {
        b.iter(|| {
            let host = ConnId::generate();
            let code = registry.create(black_box(host));
            let removed = registry.remove_if_host(host);
            black_box((code, removed))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_registry);
criterion_main!(benches);
