//! Throughput benchmarks: append and read paths under varying thread counts,
//! and the two gate backends against each other.

use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use swell::{CondvarGate, ConcurrentVec, Gate, Heap};

const PUSHES: u64 = 10_000;

fn push_with_gate<G: Gate>(threads: u64) {
    let vec: ConcurrentVec<u64, G> = ConcurrentVec::builder()
        .capacity(8)
        .try_build_in(Heap)
        .unwrap();
    let per_thread = PUSHES / threads;
    thread::scope(|s| {
        for _ in 0..threads {
            let vec = &vec;
            s.spawn(move || {
                for i in 0..per_thread {
                    vec.push(i).unwrap();
                }
            });
        }
    });
    assert_eq!(vec.len() as u64, per_thread * threads);
}

fn bench_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push");
    group.throughput(Throughput::Elements(PUSHES));
    for threads in [1u64, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::new("ticket", threads),
            &threads,
            |b, &threads| b.iter(|| push_with_gate::<swell::TicketGate>(threads)),
        );
        group.bench_with_input(
            BenchmarkId::new("condvar", threads),
            &threads,
            |b, &threads| b.iter(|| push_with_gate::<CondvarGate>(threads)),
        );
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let vec = ConcurrentVec::with_capacity(PUSHES as usize);
    for i in 0..PUSHES {
        vec.push(i).unwrap();
    }

    let mut group = c.benchmark_group("read");
    group.throughput(Throughput::Elements(PUSHES));
    group.bench_function("get", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            for i in 0..PUSHES as usize {
                sum += vec.get(i).unwrap();
            }
            sum
        });
    });
    group.bench_function("iter", |b| b.iter(|| vec.iter().sum::<u64>()));
    group.finish();
}

fn bench_extend(c: &mut Criterion) {
    let batch: Vec<u64> = (0..64).collect();
    let mut group = c.benchmark_group("extend");
    group.throughput(Throughput::Elements(PUSHES));
    group.bench_function("extend_from_slice_64", |b| {
        b.iter(|| {
            let vec = ConcurrentVec::with_capacity(8);
            for _ in 0..PUSHES / 64 {
                vec.extend_from_slice(&batch).unwrap();
            }
            vec.len()
        });
    });
    group.finish();
}

criterion_group!(benches, bench_push, bench_read, bench_extend);
criterion_main!(benches);
