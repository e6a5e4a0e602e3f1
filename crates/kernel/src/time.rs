//! Time and timestamp utilities
//!
//! The PIT (programmable interval timer) drives `Irq::Timer` at a fixed
//! rate; `arch::x86_64::idt`'s timer handler calls `tick()` once per
//! interrupt. Everything else in the kernel reads time through this
//! module rather than touching the tick counter directly.

use core::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// PIT reload value used at init time: 1193182 Hz / DIVISOR = tick rate.
/// DIVISOR = 1193 gives ~1000 Hz, i.e. one tick per millisecond.
pub const PIT_HZ: u64 = 1000;

static TICKS: AtomicU64 = AtomicU64::new(0);

/// `SetLocalTime`'s offset from boot-relative uptime (milliseconds).
/// EXOS has no RTC driver in this core (spec.md's device-driver
/// non-goal); `GetLocalTime`/`SetLocalTime` work entirely off this
/// offset applied to [`get_uptime_ms`].
static LOCAL_OFFSET_MS: AtomicI64 = AtomicI64::new(0);

/// Advance the tick counter by one. Called only from the timer interrupt
/// handler; never call this from task context.
pub fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Ticks elapsed since boot.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Current timestamp in microseconds since boot.
pub fn get_timestamp_us() -> u64 {
    ticks() * (1_000_000 / PIT_HZ)
}

/// Uptime in milliseconds since boot.
pub fn get_uptime_ms() -> u64 {
    ticks() * (1000 / PIT_HZ)
}

/// `GetLocalTime`: boot uptime plus whatever offset `set_local_time_ms`
/// last recorded.
pub fn get_local_time_ms() -> i64 {
    get_uptime_ms() as i64 + LOCAL_OFFSET_MS.load(Ordering::Relaxed)
}

/// `SetLocalTime`: records the offset such that [`get_local_time_ms`]
/// reports `new_time_ms` right now.
pub fn set_local_time_ms(new_time_ms: i64) {
    let offset = new_time_ms - get_uptime_ms() as i64;
    LOCAL_OFFSET_MS.store(offset, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both assertions share the global tick counter, so they run as one
    // test: splitting them risks interleaving with another test thread
    // ticking the same counter between the `before` read and the assert.
    #[test]
    fn tick_advances_uptime_and_timestamp() {
        let uptime_before = get_uptime_ms();
        let timestamp_before = get_timestamp_us();
        tick();
        tick();
        assert_eq!(get_uptime_ms(), uptime_before + 2);
        assert_eq!(get_timestamp_us(), timestamp_before + 2000);
    }

    #[test]
    fn set_local_time_then_get_reflects_the_requested_value() {
        set_local_time_ms(1_700_000_000_000);
        let now = get_local_time_ms();
        assert!((now - 1_700_000_000_000).abs() < 1000);
    }
}
