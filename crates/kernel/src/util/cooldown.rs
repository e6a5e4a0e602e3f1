//! Throttles a repeating log/warning so a storm of identical events (e.g.
//! spurious interrupts) cannot flood the log. Grounded on
//! `original_source/kernel/include/utils/Cooldown.h`.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

pub struct Cooldown {
    period_ms: u32,
    last_fire_ms: AtomicU64,
    suppressed: AtomicU32,
}

impl Cooldown {
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_fire_ms: AtomicU64::new(0),
            suppressed: AtomicU32::new(0),
        }
    }

    /// Returns `Some(suppressed_count)` if the caller should actually log
    /// now (and the suppressed count since the last log), or `None` if
    /// the event should be silently counted and skipped.
    pub fn tick(&self, now_ms: u64) -> Option<u32> {
        let last = self.last_fire_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) >= self.period_ms as u64 {
            self.last_fire_ms.store(now_ms, Ordering::Relaxed);
            let suppressed = self.suppressed.swap(0, Ordering::Relaxed);
            Some(suppressed)
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_first_call_then_throttles() {
        let cd = Cooldown::new(2000);
        assert_eq!(cd.tick(0), Some(0));
        assert_eq!(cd.tick(500), None);
        assert_eq!(cd.tick(1999), None);
        assert_eq!(cd.tick(2000), Some(2));
    }
}
