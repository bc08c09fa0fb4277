//! Criterion benchmarks for rust_log_writer

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_log_writer::encoder::Encoder;
use rust_log_writer::prelude::*;
use rust_log_writer::sinks::DiscardSink;
use std::sync::Arc;
use std::time::Duration;

fn sample_fields() -> Vec<Field> {
    vec![
        Field::new("user_id", 12345u64),
        Field::new("path", "/api/v1/orders"),
        Field::new("latency", Duration::from_micros(1250)),
        Field::new("cached", false),
        Field::new("ratio", 0.875),
    ]
}

fn encoder_config() -> EncoderConfig {
    EncoderConfig::new(TimeEncoding::Iso8601, DurationEncoding::Seconds)
}

// ============================================================================
// Encoder Benchmarks
// ============================================================================

fn bench_encode_entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_entry");
    group.throughput(Throughput::Elements(1));

    let entry = LogEntry::new(LogLevel::Info, "request served").with_logger_name("http");
    let fields = sample_fields();

    for layout in [Layout::Mixed, Layout::Json, Layout::Console] {
        let encoder = MixedEncoder::with_layout(encoder_config(), layout);
        group.bench_function(layout.as_str(), |b| {
            b.iter(|| {
                let buf = encoder.encode_entry(black_box(&entry), black_box(&fields)).unwrap();
                buf.release();
            });
        });
    }

    group.finish();
}

fn bench_string_escaping(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_escaping");
    group.throughput(Throughput::Elements(1));

    let encoder = MixedEncoder::json(encoder_config());
    let plain = LogEntry::new(LogLevel::Info, "a".repeat(256));
    let noisy = LogEntry::new(LogLevel::Info, "line\n\"quoted\"\ttab\u{1}é".repeat(16));

    group.bench_function("plain_ascii", |b| {
        b.iter(|| encoder.encode_entry(black_box(&plain), &[]).unwrap().release());
    });

    group.bench_function("needs_escaping", |b| {
        b.iter(|| encoder.encode_entry(black_box(&noisy), &[]).unwrap().release());
    });

    group.finish();
}

fn bench_context_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("context");
    group.throughput(Throughput::Elements(1));

    let mut encoder = MixedEncoder::new(encoder_config());
    for field in sample_fields() {
        field.add_to(&mut encoder);
    }

    group.bench_function("clone_encoder", |b| {
        b.iter(|| black_box(encoder.clone_encoder()));
    });

    group.finish();
}

// ============================================================================
// Logger Benchmarks
// ============================================================================

fn discard_logger(level: LogLevel) -> Logger {
    let core = LogCore::new(
        Box::new(MixedEncoder::new(encoder_config())),
        Arc::new(DiscardSink),
        AtomicLevel::new(level),
    );
    Logger::new("bench", vec![Arc::new(core)])
}

fn bench_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("logging");
    group.throughput(Throughput::Elements(1));

    let logger = discard_logger(LogLevel::Info);
    let fields = sample_fields();

    group.bench_function("info_no_fields", |b| {
        b.iter(|| logger.info(black_box("Info message"), &[]).unwrap());
    });

    group.bench_function("info_with_fields", |b| {
        b.iter(|| logger.info(black_box("Info message"), black_box(&fields)).unwrap());
    });

    group.bench_function("filtered_debug", |b| {
        b.iter(|| logger.debug(black_box("Debug message"), &[]).unwrap());
    });

    let with_caller = logger.with_caller(true);
    group.bench_function("info_with_caller", |b| {
        b.iter(|| with_caller.info(black_box("Info message"), &[]).unwrap());
    });

    group.finish();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");
    let threads = 4;
    let per_thread = 250;
    group.throughput(Throughput::Elements((threads * per_thread) as u64));

    let logger = discard_logger(LogLevel::Info);

    group.bench_function("4_threads", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..threads {
                    s.spawn(|| {
                        for i in 0..per_thread {
                            logger.info("concurrent", &[Field::new("i", i as u64)]).unwrap();
                        }
                    });
                }
            });
        });
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_encode_entry,
    bench_string_escaping,
    bench_context_clone,
    bench_logging,
    bench_concurrent_logging
);

criterion_main!(benches);
