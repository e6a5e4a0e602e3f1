//! Counting semaphore (spec §4.8's `CreateSemaphore`/`LockSemaphore`/
//! `UnlockSemaphore`). No `original_source` file names a dedicated
//! semaphore implementation, so this generalizes the retry-sleep idiom
//! [`super::mutex::Mutex`] already uses; `kobj::header::ObjectType::Semaphore`
//! is the reserved object type a `CreateSemaphore` handle resolves to.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch::x86_64::cpu;
use crate::sync::mutex::RETRY_SLEEP_MS;

pub struct Semaphore {
    count: AtomicU32,
    max_count: u32,
}

impl Semaphore {
    pub fn new(initial_count: u32, max_count: u32) -> Self {
        Self {
            count: AtomicU32::new(initial_count.min(max_count)),
            max_count,
        }
    }

    /// Non-blocking acquire: decrements the count if it is nonzero.
    /// Returns `false` without blocking if the semaphore is exhausted —
    /// the syscall surface parks the caller in `WAITOBJECT` itself
    /// rather than spinning inside this call.
    pub fn try_lock(&self) -> bool {
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current == 0 {
                return false;
            }
            if self
                .count
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Blocking acquire, retry-sleeping the same way a contended
    /// [`super::mutex::Mutex`] does.
    pub fn lock(&self) {
        while !self.try_lock() {
            cpu::sleep_and_yield(RETRY_SLEEP_MS);
        }
    }

    /// `UnlockSemaphore`: increments the count. Returns `false` without
    /// incrementing if the count is already at `max_count`.
    pub fn unlock(&self) -> bool {
        loop {
            let current = self.count.load(Ordering::Acquire);
            if current >= self.max_count {
                return false;
            }
            if self
                .count
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_lock_fails_once_exhausted() {
        let sem = Semaphore::new(1, 4);
        assert!(sem.try_lock());
        assert!(!sem.try_lock());
    }

    #[test]
    fn unlock_saturates_at_max_count() {
        let sem = Semaphore::new(4, 4);
        assert!(!sem.unlock());
        assert_eq!(sem.count(), 4);
    }

    #[test]
    fn unlock_then_lock_round_trips() {
        let sem = Semaphore::new(0, 2);
        assert!(!sem.try_lock());
        assert!(sem.unlock());
        assert!(sem.try_lock());
        assert_eq!(sem.count(), 0);
    }
}
