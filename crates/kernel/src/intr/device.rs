//! Device interrupt controller (spec §4.6). Slot table and field set are
//! grounded on `original_source/kernel/include/drivers/DeviceInterrupt.h`
//! and `kernel/source/DeviceInterrupt.c`; the spurious-interrupt cooldown
//! on `original_source/kernel/include/utils/Cooldown.h`.
//!
//! Top half and bottom half run in different interrupt contexts: `dispatch`
//! is the top half, called by the architecture trampoline with interrupts
//! disabled, and only queues the bottom half rather than running it.
//! `run_pending_bottom_halves` is the deferred half, called by the same
//! trampoline after EOI once interrupts are back on.

use core::sync::atomic::{AtomicU32, Ordering};

use spin::Mutex;

use crate::kobj::handle::Handle;
use crate::util::cooldown::Cooldown;
use crate::util::list::FifoList;

/// First IDT vector the device interrupt slots occupy.
pub const DEVICE_VECTOR_BASE: u8 = 48;
/// `DEVICE_INTERRUPT_VECTOR_MAX`: number of device interrupt slots.
pub const DEVICE_VECTOR_COUNT: u8 = 32;

pub type Isr = fn(device: Handle, context: usize) -> bool;
pub type BottomHalf = fn(device: Handle, context: usize);
pub type Poll = fn(device: Handle, context: usize);

/// Everything the top half needs to call into a driver. `Device` is
/// represented as a non-owning object handle rather than a raw pointer
/// (spec §9's cyclic-graph/arena-handle design note).
#[derive(Clone, Copy)]
pub struct DeviceRegistration {
    pub device: Handle,
    pub legacy_irq: u8,
    pub target_cpu: u8,
    pub isr: Isr,
    pub bottom_half: Option<BottomHalf>,
    pub poll: Option<Poll>,
    pub context: usize,
    pub name: &'static str,
}

#[derive(Clone, Copy)]
struct Slot {
    registration: DeviceRegistration,
    enabled: bool,
}

pub struct DeviceInterruptController {
    slots: [Option<Slot>; DEVICE_VECTOR_COUNT as usize],
}

impl DeviceInterruptController {
    pub const fn new() -> Self {
        Self {
            slots: [None; DEVICE_VECTOR_COUNT as usize],
        }
    }

    /// Atomically allocates a free slot and records the registration
    /// (spec §4.6). Returns `None` on exhaustion.
    fn register(&mut self, registration: DeviceRegistration) -> Option<u8> {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(Slot {
                    registration,
                    enabled: true,
                });
                return Some(i as u8);
            }
        }
        None
    }

    /// Disables the vector and clears the slot. Safe to call from driver
    /// teardown.
    fn unregister(&mut self, slot: u8) -> bool {
        match self.slots.get_mut(slot as usize) {
            Some(entry @ Some(_)) => {
                *entry = None;
                true
            }
            _ => false,
        }
    }

    fn is_enabled(&self, slot: u8) -> bool {
        self.slots
            .get(slot as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.enabled)
            .unwrap_or(false)
    }

    /// Vector for a given slot, saturating at the last slot if out of
    /// range, matching `GetDeviceInterruptVector`'s clamp.
    pub fn vector_for_slot(slot: u8) -> u8 {
        let clamped = slot.min(DEVICE_VECTOR_COUNT - 1);
        DEVICE_VECTOR_BASE + clamped
    }
}

impl Default for DeviceInterruptController {
    fn default() -> Self {
        Self::new()
    }
}

static CONTROLLER: Mutex<DeviceInterruptController> = Mutex::new(DeviceInterruptController::new());
static SPURIOUS: Cooldown = Cooldown::new(5_000);
static SPURIOUS_COUNT: AtomicU32 = AtomicU32::new(0);

/// Bottom halves queued by the top half, waiting to run with interrupts
/// enabled (spec §4.6). `(bottom_half, device, context)`.
static PENDING_BOTTOM_HALVES: Mutex<FifoList<(BottomHalf, Handle, usize)>> =
    Mutex::new(FifoList::new());

/// Registers a device interrupt handler, returning the assigned slot, or
/// `None` if every slot is in use.
pub fn register(registration: DeviceRegistration) -> Option<u8> {
    CONTROLLER.lock().register(registration)
}

/// Disables the vector and clears the slot.
pub fn unregister(slot: u8) -> bool {
    CONTROLLER.lock().unregister(slot)
}

pub fn is_enabled(slot: u8) -> bool {
    CONTROLLER.lock().is_enabled(slot)
}

/// Top half: called by the architecture trampoline with interrupts
/// disabled. An ISR return of `true` means "handled, queue the bottom
/// half"; `false` (or no registration in this slot) counts as spurious.
/// The bottom half itself is never called from here — it is enqueued onto
/// [`PENDING_BOTTOM_HALVES`] and only runs once [`run_pending_bottom_halves`]
/// is invoked after EOI with interrupts re-enabled (spec §4.6).
pub fn dispatch(slot: u8) {
    let registration = {
        let controller = CONTROLLER.lock();
        controller
            .slots
            .get(slot as usize)
            .and_then(|s| s.as_ref())
            .map(|s| s.registration)
    };

    match registration {
        Some(reg) => {
            let handled = (reg.isr)(reg.device, reg.context);
            if handled {
                if let Some(bottom_half) = reg.bottom_half {
                    PENDING_BOTTOM_HALVES
                        .lock()
                        .push_back((bottom_half, reg.device, reg.context));
                }
            } else {
                note_spurious(reg.name);
            }
        }
        None => note_spurious("<unregistered>"),
    }
}

/// Drains and runs every bottom half queued by [`dispatch`]. Must only be
/// called with interrupts enabled, after EOI, before the interrupted task
/// resumes (spec §4.6) — the architecture trampoline is the only caller.
pub fn run_pending_bottom_halves() {
    loop {
        let next = PENDING_BOTTOM_HALVES.lock().pop_front();
        match next {
            Some((bottom_half, device, context)) => bottom_half(device, context),
            None => break,
        }
    }
}

fn note_spurious(name: &str) {
    SPURIOUS_COUNT.fetch_add(1, Ordering::Relaxed);
    let now = crate::time::get_uptime_ms();
    if let Some(suppressed) = SPURIOUS.tick(now) {
        crate::warn!(
            "[INTR] spurious/unhandled device interrupt from {} (total={}, suppressed={})",
            name,
            SPURIOUS_COUNT.load(Ordering::Relaxed),
            suppressed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_isr(_device: Handle, _context: usize) -> bool {
        true
    }

    #[test]
    fn register_assigns_first_free_slot() {
        let mut controller = DeviceInterruptController::new();
        let reg = DeviceRegistration {
            device: Handle(1),
            legacy_irq: 9,
            target_cpu: 0,
            isr: dummy_isr,
            bottom_half: None,
            poll: None,
            context: 0,
            name: "test",
        };
        let slot = controller.register(reg).unwrap();
        assert_eq!(slot, 0);
        assert!(controller.is_enabled(slot));
    }

    #[test]
    fn unregister_frees_the_slot_for_reuse() {
        let mut controller = DeviceInterruptController::new();
        let reg = DeviceRegistration {
            device: Handle(1),
            legacy_irq: 9,
            target_cpu: 0,
            isr: dummy_isr,
            bottom_half: None,
            poll: None,
            context: 0,
            name: "test",
        };
        let slot = controller.register(reg).unwrap();
        assert!(controller.unregister(slot));
        assert!(!controller.is_enabled(slot));
        let slot2 = controller.register(reg).unwrap();
        assert_eq!(slot, slot2);
    }

    #[test]
    fn register_fails_once_every_slot_is_taken() {
        let mut controller = DeviceInterruptController::new();
        let reg = DeviceRegistration {
            device: Handle(1),
            legacy_irq: 9,
            target_cpu: 0,
            isr: dummy_isr,
            bottom_half: None,
            poll: None,
            context: 0,
            name: "test",
        };
        for _ in 0..DEVICE_VECTOR_COUNT {
            assert!(controller.register(reg).is_some());
        }
        assert!(controller.register(reg).is_none());
    }

    #[test]
    fn vector_for_slot_saturates_at_last_slot() {
        assert_eq!(
            DeviceInterruptController::vector_for_slot(200),
            DEVICE_VECTOR_BASE + DEVICE_VECTOR_COUNT - 1
        );
    }

    use core::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    static BOTTOM_HALF_RUNS: AtomicUsize = AtomicUsize::new(0);

    fn counting_bottom_half(_device: Handle, _context: usize) {
        BOTTOM_HALF_RUNS.fetch_add(1, AtomicOrdering::SeqCst);
    }

    // Exercises both `dispatch`'s deferral and `run_pending_bottom_halves`'s
    // draining in one test: these are the only two tests touching the
    // module's global `CONTROLLER`/`PENDING_BOTTOM_HALVES` statics, and
    // keeping them in one test avoids two tests racing on shared state.
    #[test]
    fn dispatch_defers_bottom_half_until_drained() {
        BOTTOM_HALF_RUNS.store(0, AtomicOrdering::SeqCst);
        while PENDING_BOTTOM_HALVES.lock().pop_front().is_some() {}

        let reg = DeviceRegistration {
            device: Handle(42),
            legacy_irq: 9,
            target_cpu: 0,
            isr: dummy_isr,
            bottom_half: Some(counting_bottom_half),
            poll: None,
            context: 0,
            name: "test",
        };
        let slot = register(reg).unwrap();

        dispatch(slot);
        assert_eq!(BOTTOM_HALF_RUNS.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(PENDING_BOTTOM_HALVES.lock().len(), 1);

        dispatch(slot);
        assert_eq!(PENDING_BOTTOM_HALVES.lock().len(), 2);

        run_pending_bottom_halves();
        assert_eq!(BOTTOM_HALF_RUNS.load(AtomicOrdering::SeqCst), 2);
        assert!(PENDING_BOTTOM_HALVES.lock().is_empty());

        unregister(slot);
    }
}
