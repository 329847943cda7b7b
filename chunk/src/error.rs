//! error types for chunk operations.

use thiserror::Error;

/// error returned when appending a sample to a chunk fails.
///
/// a failed append never leaves a partially-encoded sample behind; the
/// chunk is exactly as it was before the call.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// the chunk reached its sample capacity and must be cut.
    #[error("chunk is full ({cap} samples)")]
    Full {
        /// the capacity that was hit.
        cap: u16,
    },

    /// the sample's timestamp is older than the last appended one.
    #[error("out-of-order append: last timestamp {last}, got {got}")]
    OutOfOrder {
        /// timestamp of the most recently appended sample.
        last: i64,
        /// the rejected timestamp.
        got: i64,
    },
}
