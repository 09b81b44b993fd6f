//! Framing benchmark suite.
//!
//! Measures delimiter framing at different buffer sizes:
//! - Delimiter search over buffers of 1 KiB, 16 KiB and 256 KiB
//! - Subscription delivery of newline-terminated records
//! - Reactor round trip through the in-memory transport
//!
//! Run with: cargo bench --bench framing
//! Results saved to: target/criterion/

use std::hint::black_box;

use classic_serial::{
    Accessory, ByteBuffer, ConnectionId, MemoryTransport, Serial,
    session::SubscriptionHub,
};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BUFFER_SIZES: &[usize] = &[1024, 16 * 1024, 256 * 1024];
const RECORD_COUNTS: &[usize] = &[16, 256];
const PROTOCOL: &str = "com.example.serial";

// ============================================================================
// Helpers
// ============================================================================

/// Filler bytes that never contain `\r\n`, followed by one terminator.
fn payload(size: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..size.saturating_sub(2))
        .map(|i| b'a' + (i % 26) as u8)
        .collect();
    bytes.extend_from_slice(b"\r\n");
    bytes
}

fn records(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| format!("record-{i:04}\n").into_bytes())
        .collect()
}

// ============================================================================
// Benchmark: Delimiter Search
// ============================================================================

fn bench_find_delimiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_delimiter");

    for &size in BUFFER_SIZES {
        let mut buffer = ByteBuffer::new();
        buffer.append(&payload(size));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("crlf", size), &buffer, |b, buffer| {
            b.iter(|| black_box(buffer.find_delimiter(black_box(b"\r\n"))));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Subscription Delivery
// ============================================================================

fn bench_subscription_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscription_delivery");
    let hub = SubscriptionHub::new();
    if hub
        .subscribe(b"\n".to_vec(), |record| {
            black_box(record);
        })
        .is_err()
    {
        return;
    }

    for &count in RECORD_COUNTS {
        let input = records(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("records", count), &input, |b, input| {
            b.iter(|| {
                let mut buffer = ByteBuffer::new();
                buffer.append(input);
                black_box(hub.react(&mut buffer))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Reactor Round Trip
// ============================================================================

fn bench_reactor_read(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let (serial, peer) = rt.block_on(async {
        let (transport, peer) = MemoryTransport::pair();
        let serial = Serial::builder()
            .supported_protocol(PROTOCOL)
            .transport(transport)
            .attached(Accessory::new(1, "Bench").with_protocol(PROTOCOL))
            .spawn()
            .expect("spawn");
        serial.connect(ConnectionId::ANY).await.expect("connect");
        (serial, peer)
    });

    c.bench_function("reactor_send_then_read_until", |b| {
        b.to_async(&rt).iter(|| async {
            peer.send(b"OK\n".to_vec());
            black_box(serial.read_until(b"\n".to_vec()).await.expect("read"))
        });
    });
}

criterion_group!(
    benches,
    bench_find_delimiter,
    bench_subscription_delivery,
    bench_reactor_read
);
criterion_main!(benches);
