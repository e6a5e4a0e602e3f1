//! Early CPU bring-up: GDT/TSS/IDT, the legacy PIC, and the serial
//! console, in the order the CPU requires them (GDT before TSS, TSS
//! before IDT, IDT before any interrupt is unmasked). Grounded on the
//! teacher's `arch::x86_64::boot::early_init`, trimmed of the APIC/HPET/
//! TSC bring-up the teacher's richer timer stack needed — EXOS drives
//! everything off the PIT through [`crate::time`] (spec §4.5's timer
//! interrupt is the scheduler's only preemption source).

use super::{cpu, gdt, idt, pic, serial, tss};

/// Runs once, with interrupts disabled, before the heap or any other
/// kernel subsystem is touched.
///
/// # Safety
/// Must be called exactly once, at the very start of [`crate::kernel_main`],
/// before any other architecture or kernel subsystem initialization.
pub unsafe fn early_init() -> Result<(), &'static str> {
    x86_64::instructions::interrupts::disable();

    gdt::init_gdt();
    tss::init_tss();
    serial::init_serial()?;

    let features = cpu::detect_cpu_features();
    if !features.has_sse2 {
        return Err("CPU does not support SSE2");
    }

    idt::init_idt_early();
    pic::init();
    pic::enable_irq(pic::Irq::Timer);
    pic::enable_irq(pic::Irq::Keyboard);

    x86_64::instructions::interrupts::enable();
    Ok(())
}
