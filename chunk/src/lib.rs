//! concurrently guarded, delta-encoded sample chunks.
//!
//! this crate provides the data side of the workspace: an append-only
//! encoded time-series chunk ([`SampleChunk`]) and [`GuardedChunk`], the
//! same chunk wrapped in the `ward-sync` copy-on-write lock so many
//! reader threads can decode it while one appender mutates it.
//!
//! # example
//!
//! ```
//! use ward_chunk::{GuardedChunk, Sample};
//!
//! let chunk = GuardedChunk::new();
//!
//! // appender (single thread)
//! chunk.append(Sample { timestamp: 1000, value: 0.5 }).unwrap();
//! chunk.append(Sample { timestamp: 1015, value: 0.75 }).unwrap();
//!
//! // readers (any thread) decode a consistent snapshot
//! let samples = chunk.samples();
//! assert_eq!(samples.len(), 2);
//! ```

pub mod encode;
pub mod error;
mod guarded;

pub use encode::{Sample, SampleChunk, MAX_SAMPLES};
pub use error::ChunkError;
pub use guarded::GuardedChunk;
