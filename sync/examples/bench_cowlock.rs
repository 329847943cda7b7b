//! benchmark: CowLock reads vs std RwLock reads, plus write-path costs
//!
//! run with: cargo run --release --example bench_cowlock

use std::hint::black_box;
use std::sync::RwLock;
use std::time::Instant;
use ward_sync::CowLock;

const ITERATIONS: u64 = 5_000_000;
const WARMUP: u64 = 100_000;
const PAYLOAD: usize = 128;

fn bench_cowlock_read(lock: &CowLock<Vec<u64>>) -> (u64, u128) {
    for _ in 0..WARMUP {
        black_box(black_box(lock).read()[0]);
    }

    let start = Instant::now();
    let mut sum = 0u64;
    for _ in 0..ITERATIONS {
        let g = black_box(lock).read();
        sum = sum.wrapping_add(black_box(g[0]));
    }
    (black_box(sum), start.elapsed().as_nanos())
}

fn bench_rwlock_read(lock: &RwLock<Vec<u64>>) -> (u64, u128) {
    for _ in 0..WARMUP {
        black_box(black_box(lock).read().unwrap()[0]);
    }

    let start = Instant::now();
    let mut sum = 0u64;
    for _ in 0..ITERATIONS {
        let g = black_box(lock).read().unwrap();
        sum = sum.wrapping_add(black_box(g[0]));
    }
    (black_box(sum), start.elapsed().as_nanos())
}

fn bench_write_in_place(lock: &CowLock<Vec<u64>>) -> u128 {
    let start = Instant::now();
    for i in 0..ITERATIONS / 10 {
        let mut w = black_box(lock).try_write();
        w[0] = i;
        w.commit();
    }
    start.elapsed().as_nanos()
}

fn bench_write_cow(lock: &CowLock<Vec<u64>>) -> u128 {
    // a parked reader forces every write onto the clone-and-publish path
    let _reader = lock.read();

    let start = Instant::now();
    for i in 0..ITERATIONS / 100 {
        let mut w = black_box(lock).try_write();
        w[0] = i;
        w.commit();
    }
    start.elapsed().as_nanos()
}

fn report(name: &str, ops: u64, elapsed_ns: u128) {
    println!(
        "{:<24} {:>12} ops in {:>8.2} ms  ({:>7.2} ns/op)",
        name,
        ops,
        elapsed_ns as f64 / 1_000_000.0,
        elapsed_ns as f64 / ops as f64
    );
}

fn main() {
    let payload = vec![7u64; PAYLOAD];

    let cow = CowLock::new(payload.clone());
    let rw = RwLock::new(payload);

    let (_, ns) = bench_cowlock_read(&cow);
    report("CowLock read", ITERATIONS, ns);

    let (_, ns) = bench_rwlock_read(&rw);
    report("RwLock read", ITERATIONS, ns);

    let ns = bench_write_in_place(&cow);
    report("CowLock write in-place", ITERATIONS / 10, ns);

    let ns = bench_write_cow(&cow);
    report("CowLock write cow", ITERATIONS / 100, ns);
}
