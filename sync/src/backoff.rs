//! progressive backoff for spin-wait loops.
//!
//! the read-acquire retry loop calls [`snooze`] between CAS attempts.
//! short waits stay on-core with pause instructions; sustained waits
//! yield the scheduler so the thread holding the lock can run.

/// progressive wait between retries of a contended atomic operation.
///
/// three phases keyed off the caller-held iteration counter:
/// - below 64 iterations: a single pause instruction (waits this short
///   usually end within a few loop turns)
/// - below 512: a growing batch of pause instructions, backing the core
///   off the contended cache line
/// - beyond that: yield the scheduler every few turns so a descheduled
///   lock holder gets CPU time
///
/// # example
///
/// ```ignore
/// let mut spins = 0u32;
/// loop {
///     if try_acquire() {
///         break;
///     }
///     snooze(&mut spins);
/// }
/// ```
#[inline]
pub fn snooze(iteration: &mut u32) {
    let i = *iteration;
    if i < 64 {
        core::hint::spin_loop();
    } else if i < 512 {
        let pauses = (((i - 64) >> 4) + 1).min(16);
        for _ in 0..pauses {
            core::hint::spin_loop();
        }
    } else if i % 8 == 0 {
        std::thread::yield_now();
    } else {
        core::hint::spin_loop();
    }
    *iteration = iteration.wrapping_add(1);
}
