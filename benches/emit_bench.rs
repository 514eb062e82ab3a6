use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringprobe::{
    ringbuf::layout::record_size, EmitArgs, EmitProgram, EmitStatus, Event, HashTable, RingBuffer,
    RingConfig,
};
use std::{sync::Arc, thread};

fn benchmark_emit_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("Emit_SingleThreaded");

    for capacity in [4096usize, 65536, 1 << 20].iter() {
        let per_fill = (capacity / record_size(Event::SIZE)) as u64;
        group.throughput(Throughput::Elements(per_fill));
        group.bench_with_input(
            BenchmarkId::new("emit_then_drain", capacity),
            capacity,
            |b, &capacity| {
                let config = RingConfig::new("bench", capacity).with_notifications(false);
                let ring = Arc::new(RingBuffer::with_config(config).unwrap());
                let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));

                b.iter(|| {
                    for i in 0..per_fill {
                        assert_eq!(program.emit(&EmitArgs::new(i)), EmitStatus::Submitted);
                    }
                    let mut consumer = ring.consumer().unwrap();
                    let events = consumer.drain_events().unwrap();
                    assert_eq!(events.len() as u64, per_fill);
                });
            },
        );
    }

    group.finish();
}

fn benchmark_notifications(c: &mut Criterion) {
    let mut group = c.benchmark_group("Emit_Notifications");
    let capacity = 4096;

    for enabled in [false, true].iter() {
        group.bench_with_input(
            BenchmarkId::new("emit_consume", enabled),
            enabled,
            |b, &enabled| {
                let config = RingConfig::new("bench", capacity).with_notifications(enabled);
                let ring = Arc::new(RingBuffer::with_config(config).unwrap());
                let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));
                let mut consumer = ring.consumer().unwrap();

                b.iter(|| {
                    program.emit(&EmitArgs::new(7));
                    consumer.next_event().unwrap().unwrap()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_contended_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("Emit_Contention");
    let per_thread = 2000u64;

    for producers in [2usize, 4].iter() {
        group.throughput(Throughput::Elements(per_thread * *producers as u64));
        group.bench_with_input(
            BenchmarkId::new("producers", producers),
            producers,
            |b, &producers| {
                let ring = Arc::new(RingBuffer::new(16384).unwrap());
                let program = EmitProgram::new(ring.clone(), Arc::new(HashTable::default()));

                b.iter(|| {
                    thread::scope(|s| {
                        for _ in 0..producers {
                            s.spawn(|| {
                                for i in 0..per_thread {
                                    while program.emit(&EmitArgs::new(i)) != EmitStatus::Submitted
                                    {
                                        thread::yield_now();
                                    }
                                }
                            });
                        }

                        let mut consumer = ring.consumer().unwrap();
                        let mut seen = 0;
                        while seen < per_thread * producers as u64 {
                            match consumer.next() {
                                Some(_) => seen += 1,
                                None => thread::yield_now(),
                            }
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_emit_drain,
    benchmark_notifications,
    benchmark_contended_producers,
);
criterion_main!(benches);
