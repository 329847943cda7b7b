//! a sample chunk guarded for concurrent access.
//!
//! combines [`SampleChunk`] with the [`CowLock`] protocol: many reader
//! threads decode the chunk without blocking while one appender mutates
//! it. when the appender finds the exclusive lock free it encodes in
//! place; when readers hold the chunk it encodes into a private clone and
//! publishes the clone atomically. readers either see the chunk entirely
//! before a sample or entirely after it, never mid-encode.

use crate::encode::{Sample, SampleChunk};
use crate::error::ChunkError;
use ward_sync::{CowLock, ReadGuard};

/// an encoded sample chunk shared between many readers and one appender.
///
/// single-appender discipline is the caller's responsibility, exactly as
/// with the underlying lock; reads are safe from any number of threads.
///
/// # example
///
/// ```
/// use ward_chunk::{GuardedChunk, Sample};
///
/// let chunk = GuardedChunk::new();
/// chunk.append(Sample { timestamp: 1000, value: 1.0 }).unwrap();
///
/// let snapshot = chunk.read();
/// assert_eq!(snapshot.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct GuardedChunk {
    inner: CowLock<SampleChunk>,
}

impl GuardedChunk {
    /// create an empty guarded chunk.
    pub fn new() -> Self {
        Self {
            inner: CowLock::new(SampleChunk::new()),
        }
    }

    /// append one sample, never waiting for readers.
    ///
    /// uncontended appends mutate the live chunk under the exclusive
    /// lock; contended ones pay a clone and an atomic publish instead.
    /// a failed append (full or out-of-order) publishes nothing and
    /// releases whatever was held.
    pub fn append(&self, sample: Sample) -> Result<(), ChunkError> {
        let mut access = self.inner.try_write();
        if !access.is_in_place() {
            log::trace!(
                "append at t={} taking copy-on-write fallback",
                sample.timestamp
            );
        }
        access.append(sample)?;
        access.commit();
        Ok(())
    }

    /// acquire read access to the current snapshot.
    ///
    /// the guard pins what it observed: appends published while it is
    /// held do not change what it decodes.
    pub fn read(&self) -> ReadGuard<'_, SampleChunk> {
        self.inner.read()
    }

    /// decode all samples from the current snapshot.
    pub fn samples(&self) -> Vec<Sample> {
        self.read().iter().collect()
    }

    /// number of samples in the current snapshot.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// whether the current snapshot holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// number of readers currently holding access (diagnostics).
    pub fn reader_count(&self) -> usize {
        self.inner.reader_count()
    }
}
