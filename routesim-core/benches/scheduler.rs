use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use routesim_core::EventScheduler;
use std::time::Duration;

fn schedule_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");
    for count in [1_000u64, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count));
        group.bench_function(format!("schedule_then_drain/{count}"), |b| {
            b.iter_batched(
                EventScheduler::<u64>::new,
                |mut scheduler| {
                    // Reversed insertion order stresses the heap.
                    for k in (0..count).rev() {
                        scheduler
                            .schedule(Duration::from_micros(k), k)
                            .expect("within the timeline");
                    }
                    while let Some(event) = scheduler.pop() {
                        black_box(event);
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn same_time_fifo(c: &mut Criterion) {
    c.bench_function("scheduler/same_time_fifo/10000", |b| {
        b.iter_batched(
            EventScheduler::<u64>::new,
            |mut scheduler| {
                for k in 0..10_000u64 {
                    scheduler
                        .schedule(Duration::from_secs(1), k)
                        .expect("within the timeline");
                }
                while let Some(event) = scheduler.pop() {
                    black_box(event);
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, schedule_then_drain, same_time_fifo);
criterion_main!(benches);
