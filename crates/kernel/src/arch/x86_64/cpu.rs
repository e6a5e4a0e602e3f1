//! Low-level CPU primitives: IRQ-safe critical sections, CPU feature
//! detection, and the "sleeping beauty" halt loop (spec §5, §7).
//!
//! `cli`/`sti`/`hlt` are privileged instructions that fault outside ring
//! 0; under `testing` (host `cargo test`, ring 3) this module swaps in a
//! software-only simulation of the enable/disable flag so the mutex and
//! scheduler tests that build on [`IrqGuard`] can run on a developer
//! machine instead of only under QEMU.

use raw_cpuid::CpuId;

#[cfg(not(test))]
mod backend {
    use x86_64::instructions::interrupts;

    pub fn are_enabled() -> bool {
        interrupts::are_enabled()
    }

    pub fn disable() {
        interrupts::disable();
    }

    pub fn enable() {
        interrupts::enable();
    }

    pub fn halt() {
        x86_64::instructions::hlt();
    }
}

#[cfg(test)]
mod backend {
    use core::sync::atomic::{AtomicBool, Ordering};

    static SIMULATED_ENABLED: AtomicBool = AtomicBool::new(true);

    pub fn are_enabled() -> bool {
        SIMULATED_ENABLED.load(Ordering::SeqCst)
    }

    pub fn disable() {
        SIMULATED_ENABLED.store(false, Ordering::SeqCst);
    }

    pub fn enable() {
        SIMULATED_ENABLED.store(true, Ordering::SeqCst);
    }

    pub fn halt() {}
}

/// Saves the current interrupt-enable state and disables interrupts.
/// Dropping the guard restores whatever state was saved — nested guards
/// compose correctly because each one remembers its own prior state
/// rather than unconditionally re-enabling interrupts.
pub struct IrqGuard {
    was_enabled: bool,
}

impl IrqGuard {
    pub fn enter() -> Self {
        let was_enabled = backend::are_enabled();
        backend::disable();
        Self { was_enabled }
    }
}

impl Drop for IrqGuard {
    fn drop(&mut self) {
        if self.was_enabled {
            backend::enable();
        }
    }
}

/// Runs `f` with interrupts disabled, restoring the prior state on exit.
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _guard = IrqGuard::enter();
    f()
}

/// Blocks the calling task for approximately `ms` milliseconds by
/// yielding to the scheduler, used by contended mutex retry loops (spec
/// §4.4's 20 ms retry). Not itself IRQ-safe critical-section machinery —
/// callers must not hold the `IrqGuard` across this call.
pub fn sleep_and_yield(ms: u32) {
    crate::sched::scheduler::sleep_current(ms);
}

/// The fatal-error terminal state (spec §7 "Fatal"): disable interrupts,
/// halt, and if an NMI or similar wakes the CPU, jump right back to
/// `hlt`. Never returns.
pub fn halt_forever() -> ! {
    backend::disable();
    loop {
        backend::halt();
    }
}

/// Minimal CPU feature probe, queried once at boot to confirm the
/// required baseline (long mode already active, SSE2 present) before
/// touching the FPU/SSE register state the scheduler's context switch
/// preserves.
#[derive(Debug, Clone, Copy)]
pub struct CpuFeatures {
    pub has_sse2: bool,
    pub has_apic: bool,
}

pub fn detect_cpu_features() -> CpuFeatures {
    let cpuid = CpuId::new();
    let features = cpuid.get_feature_info();
    CpuFeatures {
        has_sse2: features.as_ref().map(|f| f.has_sse2()).unwrap_or(false),
        has_apic: features.as_ref().map(|f| f.has_apic()).unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_irq_guards_restore_outer_state() {
        assert!(backend::are_enabled());
        {
            let _outer = IrqGuard::enter();
            assert!(!backend::are_enabled());
            {
                let _inner = IrqGuard::enter();
                assert!(!backend::are_enabled());
            }
            assert!(!backend::are_enabled());
        }
        assert!(backend::are_enabled());
    }
}
