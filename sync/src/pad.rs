//! cache-line alignment to prevent false sharing.
//!
//! the lock state word is the hottest field in this crate. without
//! alignment it can land on the same cache line as the snapshot pointer,
//! and every reader CAS would invalidate the writer's snapshot loads.

use core::fmt;
use core::ops::{Deref, DerefMut};

/// cache line size on mainstream x86_64 and aarch64 parts.
pub const CACHE_LINE: usize = 64;

/// aligns a value to a 64-byte boundary so adjacent fields never share a
/// cache line.
///
/// # example
///
/// ```
/// use ward_sync::CacheAligned;
/// use std::sync::atomic::AtomicI32;
///
/// let state = CacheAligned::new(AtomicI32::new(0));
/// assert_eq!(core::mem::align_of_val(&state), 64);
/// ```
#[repr(align(64))]
pub struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    /// wrap a value in its own cache line.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// unwrap the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CacheAligned<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CacheAligned<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Default> Default for CacheAligned<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAligned")
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_and_size() {
        let padded = CacheAligned::new(0u8);
        assert_eq!(core::mem::align_of_val(&padded), CACHE_LINE);
        assert!(core::mem::size_of_val(&padded) >= CACHE_LINE);
    }

    #[test]
    fn test_deref_round_trip() {
        let mut padded = CacheAligned::new(41u64);
        *padded += 1;
        assert_eq!(*padded, 42);
        assert_eq!(padded.into_inner(), 42);
    }
}
