//! optimistic copy-on-write lock for single-writer, multi-reader data.
//!
//! readers spin-acquire a shared count on a single atomic word and never
//! take a kernel lock. the writer makes exactly one attempt at exclusive
//! access: if it wins, it mutates the live snapshot in place while all
//! readers are excluded; if it loses, it mutates a private deep clone and
//! publishes the clone atomically. either way the writer never waits for
//! readers, and no reader ever observes a half-mutated snapshot.
//!
//! # state word
//!
//! - `0`: unlocked, no active readers
//! - `n > 0`: `n` active readers
//! - `-1`: exclusively write-locked
//!
//! # characteristics
//!
//! - **single writer**: only one thread may call [`CowLock::try_write`]
//!   or [`CowLock::publish`] at a time (not enforced, caller
//!   responsibility)
//! - **multiple readers**: any number of threads can read concurrently
//! - **no fairness**: readers spin while the writer holds exclusive
//!   access; there is no queue and no bounded-wait guarantee
//! - **staleness window**: a reader that acquired before a copy-on-write
//!   publish keeps seeing the pre-publish snapshot until it re-reads
//!
//! # example
//!
//! ```
//! use ward_sync::CowLock;
//!
//! let lock = CowLock::new(vec![1u64, 2, 3]);
//!
//! // reader holds access; the writer falls back to a private clone
//! let r = lock.read();
//! let mut w = lock.try_write();
//! assert!(!w.is_in_place());
//! w.push(4);
//!
//! // the reader still sees the old contents
//! assert_eq!(r.len(), 3);
//!
//! // commit publishes the clone; new readers see the mutation
//! w.commit();
//! assert_eq!(r.len(), 3);
//! assert_eq!(lock.read().len(), 4);
//! ```

use crate::backoff::snooze;
use crate::pad::CacheAligned;
use arc_swap::ArcSwap;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

const UNLOCKED: i32 = 0;
const WRITE_LOCKED: i32 = -1;

/// snapshot cell, only reachable through a [`CowLock`].
///
/// the state word mediates access: shared references exist only while the
/// reader count is positive, the one exclusive reference only while the
/// word is `WRITE_LOCKED`.
struct Slot<T>(UnsafeCell<T>);

// safety: the CAS protocol on the state word makes `&T` (state > 0) and
// `&mut T` (state == -1) mutually exclusive; clones taken on the
// contended write path run while no in-place mutator can exist.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

impl<T> Slot<T> {
    fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }
}

/// a copy-on-write lock for single-writer, multi-reader scenarios.
///
/// see the [module docs](self) for the protocol.
pub struct CowLock<T> {
    /// 0 = unlocked, n > 0 = n active readers, -1 = write-locked.
    state: CacheAligned<AtomicI32>,
    /// the one live reference to the current contents. replaced wholesale
    /// by [`publish`](CowLock::publish), never mutated through while
    /// readers are active.
    snapshot: ArcSwap<Slot<T>>,
}

impl<T> CowLock<T> {
    /// create a new lock around an initial value.
    pub fn new(value: T) -> Self {
        Self {
            state: CacheAligned::new(AtomicI32::new(UNLOCKED)),
            snapshot: ArcSwap::from_pointee(Slot::new(value)),
        }
    }

    /// acquire shared read access, spinning until no writer is in its
    /// exclusive section.
    ///
    /// the returned guard pins the snapshot it observed: a concurrent
    /// copy-on-write publish never changes what this guard sees. dropping
    /// the guard releases the reader count on every exit path.
    ///
    /// there is no timeout and no fairness guarantee; under sustained
    /// exclusive locking this spins (with progressive backoff) until the
    /// writer releases.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            let observed = self.state.load(Ordering::Acquire);
            if observed >= 0
                && self
                    .state
                    .compare_exchange_weak(
                        observed,
                        observed + 1,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return ReadGuard {
                    lock: self,
                    slot: self.snapshot.load(),
                };
            }
            snooze(&mut spins);
        }
    }

    /// atomically replace the snapshot with a new value.
    ///
    /// required after mutating a private clone; must not be used after an
    /// in-place mutation, where the live snapshot already is the mutated
    /// object. a single atomic store, not a CAS loop: the single-writer
    /// assumption means there is no competing publisher.
    ///
    /// readers that acquired before this call keep the snapshot they
    /// pinned; readers that acquire afterwards see the new value.
    pub fn publish(&self, value: T) {
        self.snapshot.store(Arc::new(Slot::new(value)));
    }

    /// number of readers currently holding access (0 while write-locked).
    pub fn reader_count(&self) -> usize {
        self.state.load(Ordering::Acquire).max(0) as usize
    }

    /// whether a writer currently holds the exclusive lock.
    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Acquire) == WRITE_LOCKED
    }
}

impl<T: Clone> CowLock<T> {
    /// make exactly one attempt at the exclusive write lock; always
    /// returns usable mutation material.
    ///
    /// - CAS `0 -> -1` succeeds: [`WriteAccess::InPlace`]. the guard
    ///   mutates the live snapshot directly; no reader can enter until it
    ///   drops, and none was active when the CAS succeeded.
    /// - CAS fails (readers active): [`WriteAccess::Cloned`]. the draft
    ///   owns a deep clone nobody else references; mutations stay
    ///   invisible until [`Draft::publish`] (or
    ///   [`WriteAccess::commit`]).
    ///
    /// either way the writer makes unconditional forward progress; the
    /// contended path costs one clone instead of a wait.
    ///
    /// at most one thread may be in a write (in-place or cloned) at a
    /// time. this is the caller's contract, not checked here.
    pub fn try_write(&self) -> WriteAccess<'_, T> {
        if self
            .state
            .compare_exchange(UNLOCKED, WRITE_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            WriteAccess::InPlace(WriteGuard {
                lock: self,
                slot: self.snapshot.load_full(),
            })
        } else {
            // contended: clone the live snapshot and work on the copy.
            // safety: a failed CAS under the single-writer contract means
            // only readers are active, so nothing mutates the slot while
            // we clone it.
            let value = {
                let slot = self.snapshot.load();
                unsafe { (*slot.0.get()).clone() }
            };
            WriteAccess::Cloned(Draft { lock: self, value })
        }
    }
}

impl<T: Default> Default for CowLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for CowLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CowLock")
            .field("state", &self.state.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// shared read access to the snapshot observed at acquisition time.
///
/// holds one unit of the reader count; dropping it is the paired release.
pub struct ReadGuard<'a, T> {
    lock: &'a CowLock<T>,
    slot: arc_swap::Guard<Arc<Slot<T>>>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // safety: this guard holds a positive reader count, so no
        // in-place mutator (state == -1) can exist.
        unsafe { &*self.slot.0.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        let prev = self.lock.state.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "reader count underflow");
    }
}

/// exclusive in-place write access to the live snapshot.
///
/// exists only when the exclusive CAS succeeded, so dropping it is always
/// a genuine release; the unlock cannot be reached without ownership.
pub struct WriteGuard<'a, T> {
    lock: &'a CowLock<T>,
    slot: Arc<Slot<T>>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // safety: state == -1 while this guard exists.
        unsafe { &*self.slot.0.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // safety: state == -1 excludes every reader, and the
        // single-writer contract excludes other mutators.
        unsafe { &mut *self.slot.0.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        // guard ownership guarantees state is -1 here; a plain release
        // store suffices where a raw-API design would need a guarded CAS.
        self.lock.state.store(UNLOCKED, Ordering::Release);
    }
}

/// a private, unshared clone of the snapshot, taken when the exclusive
/// lock was contended.
///
/// mutations are unobservable through the lock until [`Draft::publish`];
/// dropping the draft discards them.
pub struct Draft<'a, T> {
    lock: &'a CowLock<T>,
    value: T,
}

impl<T> Draft<'_, T> {
    /// atomically install the draft as the new snapshot.
    pub fn publish(self) {
        self.lock.publish(self.value);
    }

    /// discard without publishing, keeping the mutated clone.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Draft<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Draft<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// outcome of a write attempt: both arms hand the writer something to
/// mutate, they differ only in how the mutation becomes visible.
pub enum WriteAccess<'a, T> {
    /// exclusive lock held; mutations land on the live snapshot and are
    /// visible as soon as the guard drops.
    InPlace(WriteGuard<'a, T>),
    /// lock contended; mutations land on a private clone and become
    /// visible only when committed.
    Cloned(Draft<'a, T>),
}

impl<'a, T> WriteAccess<'a, T> {
    /// whether the exclusive lock was acquired.
    pub fn is_in_place(&self) -> bool {
        matches!(self, WriteAccess::InPlace(_))
    }

    /// finish the write: release the exclusive lock, or publish the
    /// draft. after this the mutation is visible to new readers.
    pub fn commit(self) {
        match self {
            WriteAccess::InPlace(guard) => drop(guard),
            WriteAccess::Cloned(draft) => draft.publish(),
        }
    }
}

impl<T> Deref for WriteAccess<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        match self {
            WriteAccess::InPlace(guard) => guard,
            WriteAccess::Cloned(draft) => draft,
        }
    }
}

impl<T> DerefMut for WriteAccess<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        match self {
            WriteAccess::InPlace(guard) => &mut *guard,
            WriteAccess::Cloned(draft) => &mut *draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_reader_count_pairing() {
        let lock = CowLock::new(7u64);
        assert_eq!(lock.reader_count(), 0);
        {
            let a = lock.read();
            let b = lock.read();
            assert_eq!(lock.reader_count(), 2);
            assert_eq!(*a, 7);
            assert_eq!(*b, 7);
        }
        assert_eq!(lock.reader_count(), 0);
    }

    #[test]
    fn test_in_place_write_when_free() {
        let lock = CowLock::new(vec![1u64]);
        let mut w = lock.try_write();
        assert!(w.is_in_place());
        assert!(lock.is_write_locked());
        w.push(2);
        w.commit();
        assert!(!lock.is_write_locked());
        assert_eq!(*lock.read(), vec![1, 2]);
    }

    #[test]
    fn test_cloned_write_when_readers_active() {
        let lock = CowLock::new(vec![1u64]);
        let r = lock.read();
        let w = lock.try_write();
        assert!(!w.is_in_place());
        // the draft is never the live snapshot
        assert!(!std::ptr::eq(&*r, &*w));
        // the failed attempt left the reader count untouched
        assert_eq!(lock.reader_count(), 1);
        assert!(!lock.is_write_locked());
    }

    #[test]
    fn test_draft_invisible_until_publish() {
        let lock = CowLock::new(vec![1u64]);
        let early_reader = lock.read();

        let mut w = lock.try_write();
        assert!(!w.is_in_place());
        w.push(2);

        // mid-mutation, a fresh reader still sees the old snapshot
        assert_eq!(*lock.read(), vec![1]);

        w.commit();

        // the pre-publish reader keeps its pinned snapshot
        assert_eq!(*early_reader, vec![1]);
        // fresh readers see the published clone
        assert_eq!(*lock.read(), vec![1, 2]);
    }

    #[test]
    fn test_draft_dropped_without_publish() {
        let lock = CowLock::new(vec![1u64]);
        let _r = lock.read();
        let mut w = lock.try_write();
        w.push(99);
        drop(w);
        assert_eq!(*lock.read(), vec![1]);
    }

    #[test]
    fn test_noop_publish_keeps_contents() {
        let lock = CowLock::new(vec![1u64, 2, 3]);
        let before = lock.read().clone();
        let _r = lock.read();
        let w = lock.try_write();
        assert!(!w.is_in_place());
        w.commit(); // publish an unmodified clone
        assert_eq!(*lock.read(), before);
    }

    #[test]
    fn test_readers_excluded_during_exclusive_section() {
        let lock = Arc::new(CowLock::new(0u64));
        let acquired = Arc::new(AtomicUsize::new(0));
        // 4 readers + this thread
        let all_in = Arc::new(Barrier::new(5));
        let release = Arc::new(Barrier::new(5));

        let writer = lock.try_write();
        assert!(writer.is_in_place());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let acquired = Arc::clone(&acquired);
                let all_in = Arc::clone(&all_in);
                let release = Arc::clone(&release);
                thread::spawn(move || {
                    let g = lock.read();
                    acquired.fetch_add(1, Ordering::SeqCst);
                    all_in.wait();
                    release.wait();
                    drop(g);
                })
            })
            .collect();

        // all 4 must keep retrying while the exclusive lock is held
        thread::sleep(Duration::from_millis(50));
        assert_eq!(acquired.load(Ordering::SeqCst), 0);

        drop(writer);

        all_in.wait();
        assert_eq!(acquired.load(Ordering::SeqCst), 4);
        assert_eq!(lock.reader_count(), 4);

        release.wait();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(lock.reader_count(), 0);
    }

    #[test]
    fn test_staleness_window_across_publish() {
        let lock = CowLock::new(vec![1u64]);

        let r1 = lock.read();
        let r2 = lock.read();
        let r3 = lock.read();
        assert_eq!(lock.reader_count(), 3);

        let mut w = lock.try_write();
        assert!(!w.is_in_place());
        w.push(2);
        w.commit();

        // readers that locked before the publish see the old snapshot
        assert_eq!(*r1, vec![1]);
        assert_eq!(*r2, vec![1]);
        assert_eq!(*r3, vec![1]);
        // a reader locking after the publish sees the new contents
        assert_eq!(*lock.read(), vec![1, 2]);
    }

    #[test]
    fn test_stress_readers_and_writer() {
        const WRITES: u64 = 2_000;

        let lock = Arc::new(CowLock::new(Vec::<u64>::new()));
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Acquire) {
                        let g = lock.read();
                        // a torn or half-mutated snapshot would break
                        // strict monotonicity
                        for pair in g.windows(2) {
                            assert!(pair[0] < pair[1]);
                        }
                        drop(g);
                    }
                })
            })
            .collect();

        let writer = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                let mut in_place = 0u64;
                for i in 0..WRITES {
                    let mut w = lock.try_write();
                    if w.is_in_place() {
                        in_place += 1;
                    }
                    w.push(i);
                    w.commit();
                }
                in_place
            })
        };

        let in_place = writer.join().unwrap();
        done.store(true, Ordering::Release);
        for r in readers {
            r.join().unwrap();
        }

        assert_eq!(lock.reader_count(), 0);
        assert!(!lock.is_write_locked());
        let final_contents = lock.read();
        assert_eq!(final_contents.len(), WRITES as usize);
        // both paths should be exercised under this much contention, but
        // only the totals are guaranteed
        assert!(in_place <= WRITES);
    }
}
