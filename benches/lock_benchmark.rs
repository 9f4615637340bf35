/*!
 * Lock Benchmarks
 *
 * Compare the MCS queue lock against parking_lot and std mutexes, and the
 * spin strategies against each other under contention
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mcs_queue_lock::{McsLock, QueueMutex, SpinConfig, SpinStrategy, WaitNode};
use std::thread;

const OPS_PER_THREAD: usize = 1_000;

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    let mcs = McsLock::new();
    group.bench_function("mcs_acquire_release", |b| {
        b.iter(|| {
            mcs.acquire().unwrap();
            black_box(&mcs);
            mcs.release().unwrap();
        });
    });

    let mut node = WaitNode::new();
    group.bench_function("mcs_with_node", |b| {
        b.iter(|| mcs.with_node(&mut node, || black_box(1u64)).unwrap());
    });

    let queue_mutex = QueueMutex::new(0u64);
    group.bench_function("queue_mutex", |b| {
        b.iter(|| *queue_mutex.lock().unwrap() += 1);
    });

    let pl = parking_lot::Mutex::new(0u64);
    group.bench_function("parking_lot", |b| {
        b.iter(|| *pl.lock() += 1);
    });

    let std_mutex = std::sync::Mutex::new(0u64);
    group.bench_function("std", |b| {
        b.iter(|| *std_mutex.lock().unwrap() += 1);
    });

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended");

    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::new("queue_mutex", threads), &threads, |b, &threads| {
            let counter = QueueMutex::new(0u64);
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..OPS_PER_THREAD {
                                *counter.lock().unwrap() += 1;
                            }
                        });
                    }
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("parking_lot", threads), &threads, |b, &threads| {
            let counter = parking_lot::Mutex::new(0u64);
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..OPS_PER_THREAD {
                                *counter.lock() += 1;
                            }
                        });
                    }
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("std", threads), &threads, |b, &threads| {
            let counter = std::sync::Mutex::new(0u64);
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..OPS_PER_THREAD {
                                *counter.lock().unwrap() += 1;
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_spin_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("spin_strategy");
    let threads = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    for strategy in [SpinStrategy::Spin, SpinStrategy::Yield, SpinStrategy::Adaptive] {
        let config = SpinConfig::default().with_strategy(strategy);

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", strategy)),
            &config,
            |b, config| {
                let lock = McsLock::with_config(*config);
                b.iter(|| {
                    thread::scope(|s| {
                        for _ in 0..threads {
                            s.spawn(|| {
                                for _ in 0..OPS_PER_THREAD {
                                    lock.acquire().unwrap();
                                    black_box(&lock);
                                    lock.release().unwrap();
                                }
                            });
                        }
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_contended, bench_spin_strategies);
criterion_main!(benches);
