use atcloud::config::LinkOptions;
use atcloud::network::application::cloud::{payload, Client};
use atcloud::network::at::{CommandChannel, ConnectionLifecycle};
use atcloud::network::buffer::SharedResponseBuffer;
use atcloud::network::{Delay, Write};
use criterion::{BatchSize, Criterion, Throughput};
use std::hint::black_box;

static RX: SharedResponseBuffer<256> = SharedResponseBuffer::new();

/// Answers every command on the spot, straight into the receive buffer.
struct InstantModem;

impl Write for InstantModem {
    type Error = ();

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let reply: &[u8] = if buf.starts_with(b"cmd=0&") {
            b"cmd=0&res=1\r\n"
        } else if buf.starts_with(b"cmd=1&") {
            b"cmd=1&res=1\r\n"
        } else if buf.starts_with(b"cmd=2&") {
            b"cmd=2&res=1\r\n"
        } else if buf.starts_with(b"AT") {
            b"\r\nOK\r\n"
        } else {
            b""
        };
        RX.fill(reply);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct NoDelay;

impl Delay for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

type BenchClient = Client<InstantModem, NoDelay, &'static SharedResponseBuffer<256>>;

fn setup_client() -> BenchClient {
    let channel = CommandChannel::new(InstantModem, NoDelay, &RX);
    Client::new(ConnectionLifecycle::attach_open_socket(
        channel,
        LinkOptions::default(),
    ))
}

pub fn bench_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange");
    group.throughput(Throughput::Bytes(4));
    group.bench_function("probe", |b| {
        let mut channel = CommandChannel::new(InstantModem, NoDelay, &RX);
        b.iter(|| {
            channel
                .exchange(black_box(b"AT\r\n"), Some(b"OK".as_slice()), 500)
                .expect("Failed to exchange");
        })
    });
    group.finish();
}

pub fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let message = "#25.5#60";
    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("publish", |b| {
        b.iter_batched_ref(
            setup_client,
            |client| {
                client
                    .publish("4af24e3731744508bd519435397e4ab5", "mydht004", message)
                    .expect("Failed to publish");
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_handshake(c: &mut Criterion) {
    let mut group = c.benchmark_group("handshake");
    let topics = ["mydht004", "myMP25004", "myLUX004"];
    group.throughput(Throughput::Elements(topics.len() as u64));
    group.bench_function("handshake", |b| {
        b.iter_batched_ref(
            setup_client,
            |client| {
                client
                    .handshake("4af24e3731744508bd519435397e4ab5", &topics)
                    .expect("Failed to subscribe");
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_build_payload(c: &mut Criterion) {
    c.bench_function("build_publish_payload", |b| {
        b.iter(|| {
            payload::publish(
                black_box("4af24e3731744508bd519435397e4ab5"),
                black_box("mydht004"),
                black_box("#25.5#60"),
            )
            .expect("Failed to build payload")
        })
    });
}
