//! optimistic copy-on-write locking for single-writer, multi-reader data.
//!
//! this crate provides a synchronization primitive for scenarios where:
//! - read operations vastly outnumber writes
//! - readers must never pay kernel-mutex latency
//! - the writer must never wait behind readers
//! - single-writer semantics are acceptable
//!
//! # available primitives
//!
//! - [`CowLock`]: spin-counted read access plus an optimistic exclusive
//!   write lock with a copy-on-write fallback when contended
//!
//! # example
//!
//! ```
//! use ward_sync::CowLock;
//!
//! let lock = CowLock::new(String::from("alpha"));
//!
//! // read (from any thread, spin-based, never blocks on a kernel lock)
//! assert_eq!(*lock.read(), "alpha");
//!
//! // write (single writer): uncontended, so mutation is in place
//! let mut w = lock.try_write();
//! assert!(w.is_in_place());
//! w.push_str("-beta");
//! w.commit();
//!
//! assert_eq!(*lock.read(), "alpha-beta");
//! ```

mod backoff;
mod cowlock;
mod pad;

pub use backoff::snooze;
pub use cowlock::{CowLock, Draft, ReadGuard, WriteAccess, WriteGuard};
pub use pad::{CacheAligned, CACHE_LINE};
