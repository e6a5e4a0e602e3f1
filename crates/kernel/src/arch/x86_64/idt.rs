//! # Interrupt Descriptor Table (IDT)
//!
//! The IDT is a table of interrupt and exception handlers used by the x86_64 CPU.
//! When an interrupt or exception occurs, the CPU uses the IDT to find the appropriate
//! handler function to execute.
//!
//! ## IDT Structure
//!
//! The IDT contains 256 entries (vectors 0-255):
//! - **0-31**:  CPU exceptions (divide error, page fault, etc.)
//! - **32-47**: Legacy PIC IRQs, remapped by [`super::pic`] (IRQ0 timer, IRQ1 keyboard, ...)
//! - **48-79**: Device interrupt slots dispatched through [`crate::intr::device`] (spec §4.6)
//! - **80-255**: Unused, default to the spurious handler
//!
//! ## Exception Vectors (0-31)
//!
//! ```text
//! Vector  Mnemonic  Description                      Error Code
//! ------  --------  -------------------------------  ----------
//! 0       #DE       Divide Error                     No
//! 1       #DB       Debug Exception                  No
//! 2       NMI       Non-Maskable Interrupt           No
//! 3       #BP       Breakpoint                       No
//! 4       #OF       Overflow                         No
//! 5       #BR       Bound Range Exceeded              No
//! 6       #UD       Invalid Opcode                   No
//! 7       #NM       Device Not Available             No
//! 8       #DF       Double Fault                     Yes (always 0)
//! 9       ---       Coprocessor Segment Overrun      No (legacy)
//! 10      #TS       Invalid TSS                      Yes
//! 11      #NP       Segment Not Present              Yes
//! 12      #SS       Stack Segment Fault              Yes
//! 13      #GP       General Protection Fault         Yes
//! 14      #PF       Page Fault                       Yes
//! 15      ---       Reserved                         No
//! 16      #MF       x87 FPU Error                    No
//! 17      #AC       Alignment Check                  Yes (always 0)
//! 18      #MC       Machine Check                    No
//! 19      #XM       SIMD Floating-Point Exception    No
//! 20      #VE       Virtualization Exception         No
//! 21-31   ---       Reserved                         No
//! ```
//!
//! ## Double Fault Handler
//!
//! The double fault handler is special because it uses the IST (Interrupt Stack Table).
//! This ensures it has a valid stack even if the kernel stack is corrupted.

use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};
use lazy_static::lazy_static;
use crate::arch::x86_64::tss::{DOUBLE_FAULT_IST_INDEX, NMI_IST_INDEX, MACHINE_CHECK_IST_INDEX};
use crate::arch::x86_64::pic::{self, Irq};
use crate::intr::device::{DEVICE_VECTOR_BASE, DEVICE_VECTOR_COUNT};

/// Generates one `extern "x86-interrupt"` trampoline per device slot and
/// registers it at `$base + slot`. Each trampoline calls
/// `intr::device::dispatch(slot)` (the top half, interrupts still disabled)
/// with its slot number baked in at compile time, sends EOI for the
/// underlying legacy IRQ line, then re-enables interrupts and drains any
/// bottom half `dispatch` queued (spec §4.6) before returning.
macro_rules! device_slot_handlers {
    ($idt:expr, $base:expr, $($slot:literal),* $(,)?) => {
        $(
            {
                extern "x86-interrupt" fn handler(_stack_frame: InterruptStackFrame) {
                    crate::intr::device::dispatch($slot);
                    unsafe {
                        pic::end_of_interrupt($base + $slot);
                    }
                    x86_64::instructions::interrupts::enable();
                    crate::intr::device::run_pending_bottom_halves();
                }
                $idt[($base + $slot) as usize].set_handler_fn(handler);
            }
        )*
    };
}

/// Stamps out one EOI-only trampoline per legacy IRQ that has no kernel
/// subsystem wired to it yet. Without this the PIC stops delivering
/// further interrupts on that line once it fires.
macro_rules! legacy_irq_stubs {
    ($idt:expr, $($irq:expr),* $(,)?) => {
        $(
            {
                extern "x86-interrupt" fn handler(_stack_frame: InterruptStackFrame) {
                    unsafe {
                        pic::end_of_interrupt($irq.to_vector());
                    }
                }
                $idt[$irq.to_vector() as usize].set_handler_fn(handler);
            }
        )*
    };
}

lazy_static! {
    /// Global Interrupt Descriptor Table
    ///
    /// This table is initialized once during boot and contains handlers for all
    /// CPU exceptions, the remapped legacy PIC IRQs, and the device interrupt
    /// slot range.
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        // CPU Exceptions (0-31)
        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.debug.set_handler_fn(debug_handler);
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        unsafe {
            idt.non_maskable_interrupt
                .set_handler_fn(nmi_handler)
                .set_stack_index(NMI_IST_INDEX);
        }
        idt.overflow.set_handler_fn(overflow_handler);
        idt.bound_range_exceeded.set_handler_fn(bound_range_exceeded_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.device_not_available.set_handler_fn(device_not_available_handler);

        // Double fault - uses dedicated IST stack
        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(DOUBLE_FAULT_IST_INDEX);
        }

        idt.invalid_tss.set_handler_fn(invalid_tss_handler);
        idt.segment_not_present.set_handler_fn(segment_not_present_handler);
        idt.stack_segment_fault.set_handler_fn(stack_segment_fault_handler);
        idt.general_protection_fault.set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.x87_floating_point.set_handler_fn(x87_floating_point_handler);
        idt.alignment_check.set_handler_fn(alignment_check_handler);

        unsafe {
            idt.machine_check
                .set_handler_fn(machine_check_handler)
                .set_stack_index(MACHINE_CHECK_IST_INDEX);
        }

        idt.simd_floating_point.set_handler_fn(simd_floating_point_handler);
        idt.virtualization.set_handler_fn(virtualization_handler);

        // Legacy PIC IRQs, remapped to vectors 32-47 (spec §5: timer tick
        // is the scheduler's preemption source; keyboard feeds `hid`).
        idt[Irq::Timer.to_vector() as usize].set_handler_fn(timer_interrupt_handler);
        idt[Irq::Keyboard.to_vector() as usize].set_handler_fn(keyboard_interrupt_handler);
        legacy_irq_stubs!(idt, Irq::COM1, Irq::COM2, Irq::LPT1, Irq::LPT2, Irq::Floppy,
            Irq::RTC, Irq::ACPI, Irq::Free1, Irq::Free2, Irq::Mouse, Irq::FPU,
            Irq::PrimaryATA, Irq::SecondaryATA);

        // Device interrupt slots [48, 80) (spec §4.6). The x86-interrupt
        // ABI doesn't pass the firing vector to the handler, so each slot
        // gets its own monomorphic trampoline (`device_slot_handlers!`)
        // that closes over its slot number at compile time.
        device_slot_handlers!(idt, DEVICE_VECTOR_BASE, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12,
            13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31);

        idt
    };
}

/// Initialize the IDT (early boot version)
///
/// # Safety
///
/// Must be called during early boot, after GDT/TSS are loaded.
pub unsafe fn init_idt_early() {
    IDT.load();
}

fn is_kernel_mode(stack_frame: &InterruptStackFrame) -> bool {
    (stack_frame.code_segment & 0x3) == 0
}

//
// CPU exception handlers
//

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: DIVIDE ERROR\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn debug_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: DEBUG\n{:#?}", stack_frame);
}

/// Cannot be disabled by CLI; reserved for critical hardware errors.
extern "x86-interrupt" fn nmi_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: NON-MASKABLE INTERRUPT (NMI)\n{:#?}", stack_frame);
}

/// Triggered by INT3. Recoverable, so it does not panic.
extern "x86-interrupt" fn breakpoint_handler(_stack_frame: InterruptStackFrame) {
    crate::debug!("EXCEPTION: BREAKPOINT");
}

extern "x86-interrupt" fn overflow_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: OVERFLOW\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn bound_range_exceeded_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: BOUND RANGE EXCEEDED\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn invalid_opcode_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: INVALID OPCODE\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn device_not_available_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: DEVICE NOT AVAILABLE\n{:#?}", stack_frame);
}

/// Uses a dedicated IST stack so it can run even with a corrupted kernel stack.
extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) -> ! {
    panic!(
        "EXCEPTION: DOUBLE FAULT (error_code: {:#x})\n{:#?}",
        error_code, stack_frame
    );
}

extern "x86-interrupt" fn invalid_tss_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "EXCEPTION: INVALID TSS (error_code: {:#x})\n{:#?}",
        error_code, stack_frame
    );
}

extern "x86-interrupt" fn segment_not_present_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "EXCEPTION: SEGMENT NOT PRESENT (error_code: {:#x})\n{:#?}",
        error_code, stack_frame
    );
}

extern "x86-interrupt" fn stack_segment_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "EXCEPTION: STACK SEGMENT FAULT (error_code: {:#x})\n{:#?}",
        error_code, stack_frame
    );
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    let selector_index = (error_code >> 3) & 0x1FFF;
    let is_external = (error_code & 0x1) != 0;
    let in_idt = (error_code & 0x2) != 0;

    panic!(
        "EXCEPTION: GENERAL PROTECTION FAULT\n\
         Error Code: {:#x}\n\
         Selector Index: {}\n\
         External: {}\n\
         In IDT: {}\n\
         {:#?}",
        error_code, selector_index, is_external, in_idt, stack_frame
    );
}

/// Classifies the fault through [`crate::mm::fault::handle`] instead of
/// panicking unconditionally; only a kernel-mode fault on a kernel-half
/// address is fatal (spec §7).
extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;
    use crate::mm::fault::{self, FaultCode, FaultOutcome};

    let fault_addr = Cr2::read();
    let mut code = FaultCode::empty();
    if error_code.contains(PageFaultErrorCode::PROTECTION_VIOLATION) {
        code |= FaultCode::PRESENT;
    }
    if error_code.contains(PageFaultErrorCode::CAUSED_BY_WRITE) {
        code |= FaultCode::WRITE;
    }
    if error_code.contains(PageFaultErrorCode::USER_MODE) {
        code |= FaultCode::USER;
    }
    if error_code.contains(PageFaultErrorCode::MALFORMED_TABLE) {
        code |= FaultCode::RESERVED;
    }
    if error_code.contains(PageFaultErrorCode::INSTRUCTION_FETCH) {
        code |= FaultCode::FETCH;
    }

    let kernel_mode = is_kernel_mode(&stack_frame);
    let outcome = fault::handle(fault_addr.as_u64() as u32, code, kernel_mode);

    if outcome == FaultOutcome::Fatal {
        panic!(
            "EXCEPTION: PAGE FAULT\n\
             Accessed Address: {:#x}\n\
             Error Code: {:?}\n\
             {:#?}",
            fault_addr, error_code, stack_frame
        );
    }
}

extern "x86-interrupt" fn x87_floating_point_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: x87 FLOATING POINT ERROR\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn alignment_check_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    panic!(
        "EXCEPTION: ALIGNMENT CHECK (error_code: {:#x})\n{:#?}",
        error_code, stack_frame
    );
}

/// Uses a dedicated IST stack. Hardware failures are never recoverable.
extern "x86-interrupt" fn machine_check_handler(stack_frame: InterruptStackFrame) -> ! {
    panic!("EXCEPTION: MACHINE CHECK (HARDWARE ERROR)\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn simd_floating_point_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: SIMD FLOATING POINT ERROR\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn virtualization_handler(stack_frame: InterruptStackFrame) {
    panic!("EXCEPTION: VIRTUALIZATION EXCEPTION\n{:#?}", stack_frame);
}

//
// Legacy PIC IRQ handlers (vectors 32-47)
//

/// IRQ0: advances the tick counter and preempts via the scheduler.
extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    crate::time::tick();
    crate::sched::scheduler::SCHEDULER.lock().tick();

    unsafe {
        pic::end_of_interrupt(Irq::Timer.to_vector());
    }
}

/// IRQ1: hands the scancode off to `hid` for layout translation.
extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    use x86_64::instructions::port::Port;

    let scancode: u8 = unsafe { Port::new(0x60).read() };
    crate::hid::layout::feed_scancode(scancode);

    unsafe {
        pic::end_of_interrupt(Irq::Keyboard.to_vector());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idt_loaded() {
        let _ = &*IDT;
    }
}
