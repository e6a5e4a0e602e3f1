//! Kernel initialization phases, run once from `kernel_main` in strict
//! dependency order (spec §2's layer table: frame allocator and heap
//! before paging, paging before objects/scheduler, scheduler before
//! messaging and interrupts). Grounded on the teacher's `init::phases`
//! staged-boot shape, collapsed to the five layers this core actually
//! has — there is no separate platform/driver phase because device
//! discovery and binding are out of scope (spec.md's Non-goals).

pub mod config;

use alloc::string::ToString;

use crate::process::task::Priority;
use crate::sched::scheduler::SCHEDULER;
use crate::process::table::PROCESSES;

/// L1: physical frame allocator + kernel heap. Must run before anything
/// that calls `alloc::*` or touches [`crate::mm::FRAME_BITMAP`].
pub fn memory_init(total_frames: usize) -> Result<(), &'static str> {
    crate::heap::init_heap().map_err(|_| "heap init failed")?;
    crate::mm::init(total_frames);
    Ok(())
}

/// L4/L5: device interrupt controller and the syscall surface have no
/// per-boot state to initialize beyond their static tables; this phase
/// exists as the documented point where a future driver-bring-up phase
/// would register device ISRs (spec §4.6), not because anything happens
/// here today.
pub fn driver_init() {
    crate::info!("[INIT] driver/interrupt plumbing ready ({} device slots)", config::DEVICE_VECTOR_COUNT);
}

/// L3: creates the kernel process and its idle task — the task the
/// scheduler dispatches when no other task is ready (spec §4.5 step 4).
/// Returns the idle task's id so `kernel_main` can recognize it if it
/// ever needs to special-case it.
pub fn subsystem_init() -> crate::process::ids::TaskId {
    let mut sched = SCHEDULER.lock();
    let mut table = PROCESSES.lock();
    let (_pid, idle_task) = table.create_process(&mut sched, "kernel".to_string(), Priority::Idle, 0);
    crate::info!("[INIT] kernel process created, idle task {:?}", idle_task);
    idle_task
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_init_brings_up_heap_and_frame_bitmap() {
        memory_init(1024).unwrap();
        let stats = crate::heap::get_heap_stats();
        assert_eq!(stats.allocation_failures, 0);
    }
}
