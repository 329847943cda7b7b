//! append-only delta-encoded sample chunk.
//!
//! layout: per sample, a zigzag-varint timestamp (full value for the
//! first sample, delta from the previous one afterwards) followed by the
//! raw little-endian bits of the f64 value. appends validate before
//! touching the buffer, so a rejected sample never leaves partial bytes
//! behind.
//!
//! `Clone` is a deep copy: a cloned chunk shares no storage with the
//! original, which is what the copy-on-write path of the guarding layer
//! relies on.

use crate::error::ChunkError;

/// maximum samples a chunk holds before it must be cut.
pub const MAX_SAMPLES: u16 = 240;

/// a single timestamped measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// timestamp in milliseconds.
    pub timestamp: i64,
    /// measured value.
    pub value: f64,
}

/// append-only encoded chunk of timestamped samples.
///
/// # example
///
/// ```
/// use ward_chunk::{Sample, SampleChunk};
///
/// let mut chunk = SampleChunk::new();
/// chunk.append(Sample { timestamp: 1000, value: 0.5 }).unwrap();
/// chunk.append(Sample { timestamp: 1015, value: 0.75 }).unwrap();
///
/// let decoded: Vec<Sample> = chunk.iter().collect();
/// assert_eq!(decoded.len(), 2);
/// assert_eq!(decoded[1].timestamp, 1015);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SampleChunk {
    buf: Vec<u8>,
    count: u16,
    last_timestamp: i64,
}

impl SampleChunk {
    /// create an empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// number of samples appended so far.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// whether the chunk holds no samples.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// encoded size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.buf.len()
    }

    /// timestamp of the most recently appended sample, if any.
    pub fn last_timestamp(&self) -> Option<i64> {
        (self.count > 0).then_some(self.last_timestamp)
    }

    /// append a sample.
    ///
    /// timestamps must be non-decreasing; a full chunk rejects further
    /// appends. validation happens before any byte is written.
    pub fn append(&mut self, sample: Sample) -> Result<(), ChunkError> {
        if self.count >= MAX_SAMPLES {
            return Err(ChunkError::Full { cap: MAX_SAMPLES });
        }
        if self.count > 0 && sample.timestamp < self.last_timestamp {
            return Err(ChunkError::OutOfOrder {
                last: self.last_timestamp,
                got: sample.timestamp,
            });
        }

        let delta = if self.count == 0 {
            sample.timestamp
        } else {
            sample.timestamp - self.last_timestamp
        };
        put_varint(&mut self.buf, zigzag(delta));
        self.buf
            .extend_from_slice(&sample.value.to_bits().to_le_bytes());

        self.count += 1;
        self.last_timestamp = sample.timestamp;
        Ok(())
    }

    /// iterate over decoded samples in append order.
    pub fn iter(&self) -> SampleIter<'_> {
        SampleIter {
            buf: &self.buf,
            pos: 0,
            remaining: self.count,
            prev_timestamp: 0,
        }
    }
}

/// decoding iterator over a chunk's samples.
pub struct SampleIter<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u16,
    prev_timestamp: i64,
}

impl Iterator for SampleIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.remaining == 0 {
            return None;
        }

        let delta = unzigzag(read_varint(self.buf, &mut self.pos)?);
        let timestamp = self.prev_timestamp + delta;

        let end = self.pos + 8;
        let bytes: [u8; 8] = self.buf.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;

        self.prev_timestamp = timestamp;
        self.remaining -= 1;

        Some(Sample {
            timestamp,
            value: f64::from_bits(u64::from_le_bytes(bytes)),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

fn zigzag(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn unzigzag(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn put_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Option<u64> {
    let mut v = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos)?;
        *pos += 1;
        v |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some(v);
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
}
