//! demo: 4 reader threads decoding a guarded chunk while one thread
//! appends to it.
//!
//! run with: RUST_LOG=trace cargo run --release --example contention
//! (trace level logs each append that takes the copy-on-write fallback)

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use ward_chunk::{GuardedChunk, Sample, MAX_SAMPLES};

const READERS: usize = 4;

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let chunk = Arc::new(GuardedChunk::new());
    let done = Arc::new(AtomicBool::new(false));
    let reads = Arc::new(AtomicU64::new(0));

    let readers: Vec<_> = (0..READERS)
        .map(|id| {
            let chunk = Arc::clone(&chunk);
            let done = Arc::clone(&done);
            let reads = Arc::clone(&reads);
            thread::spawn(move || {
                let mut max_seen = 0usize;
                while !done.load(Ordering::Acquire) {
                    let snapshot = chunk.samples();
                    assert!(snapshot.len() >= max_seen, "snapshot went backwards");
                    max_seen = snapshot.len();
                    reads.fetch_add(1, Ordering::Relaxed);
                }
                log::info!("reader {} finished, last snapshot {} samples", id, max_seen);
            })
        })
        .collect();

    let start = Instant::now();
    for t in 0..i64::from(MAX_SAMPLES) {
        chunk
            .append(Sample {
                timestamp: t * 15,
                value: t as f64,
            })
            .expect("append");
    }
    let append_elapsed = start.elapsed();

    done.store(true, Ordering::Release);
    for r in readers {
        r.join().unwrap();
    }
    let total = start.elapsed();

    println!("\n========== Results ==========");
    println!("Samples appended:  {}", chunk.len());
    println!("Snapshot reads:    {}", reads.load(Ordering::Relaxed));
    println!("Append time:       {:.2?}", append_elapsed);
    println!("Total time:        {:.2?}", total);
    println!("=============================");
}
