//! EXOS kernel entry point: boots the CPU into long mode (via
//! `bootloader_api`), brings up the architecture layer, then runs the
//! kernel init phases in `init` before handing off to the idle task.
//! Grounded on the teacher's `main.rs` staged-boot shape (`_start` ->
//! `arch_early_init()` -> subsystem init -> idle loop), trimmed of the
//! teacher's multi-architecture/SMP/driver-discovery branches that have
//! no counterpart here.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

extern crate alloc;

pub mod arch;
pub mod driver;
pub mod fileio;
pub mod heap;
pub mod hid;
pub mod init;
pub mod intr;
pub mod kobj;
pub mod lib;
pub mod mm;
pub mod msg;
pub mod process;
pub mod sched;
pub mod sync;
pub mod syscall;
pub mod time;
pub mod util;

#[cfg(not(test))]
use bootloader_api::{entry_point, BootInfo};
#[cfg(not(test))]
use bootloader_api::info::MemoryRegionKind;

/// Writes raw bytes to the COM1 console. The one thing [`lib::panic`]
/// needs from the entry crate: it runs after a panic, possibly with the
/// heap or scheduler in an inconsistent state, so it goes straight to
/// the serial port rather than through `printk`'s ring buffer.
///
/// # Safety
/// Serial output is not reentrant-safe against an interrupted `SERIAL1`
/// holder; only ever called from panic context, which has already
/// disabled interrupts.
pub unsafe fn uart_print(msg: &[u8]) {
    crate::arch::x86_64::serial::serial_write(msg);
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    lib::panic::panic_handler(info)
}

#[cfg(not(test))]
entry_point!(kernel_main);

/// Counts 4 KiB frames across every `Usable` region of the bootloader's
/// memory map. EXOS's frame bitmap only ever tracks usable RAM (spec
/// §4.1); reserved/bootloader/unknown regions are never handed to
/// [`mm::FRAME_BITMAP`].
#[cfg(not(test))]
fn count_usable_frames(boot_info: &BootInfo) -> usize {
    boot_info
        .memory_regions
        .iter()
        .filter(|r| r.kind == MemoryRegionKind::Usable)
        .map(|r| ((r.end - r.start) / mm::page::PAGE_SIZE as u64) as usize)
        .sum()
}

#[cfg(not(test))]
fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    unsafe {
        arch::x86_64::boot::early_init().expect("early CPU bring-up failed");
    }

    let total_frames = count_usable_frames(boot_info);
    init::memory_init(total_frames).expect("memory init failed");

    let idle_task = init::subsystem_init();
    init::driver_init();

    crate::info!("[BOOT] EXOS kernel up, idle task {:?}", idle_task);

    // The idle task (spec §4.5 step 4): hlt with interrupts enabled so
    // the timer tick keeps firing and the scheduler can preempt us the
    // moment another task becomes ready.
    loop {
        x86_64::instructions::hlt();
    }
}
