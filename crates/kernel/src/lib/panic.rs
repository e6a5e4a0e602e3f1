// Enhanced panic handler
//
// Implements the "sleeping beauty" fatal path: disable interrupts, dump
// diagnostics, halt forever. A recursion guard prevents a panic raised
// while formatting a panic from looping.

use core::panic::PanicInfo;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use alloc::string::ToString;

/// Global panic state - prevents recursive panics
static PANICKING: AtomicBool = AtomicBool::new(false);

/// Panic counter for tracking multiple panics
static PANIC_COUNT: AtomicU64 = AtomicU64::new(0);

/// Enhanced panic handler with comprehensive diagnostics
pub fn panic_handler(info: &PanicInfo) -> ! {
    // Check for recursive panic
    if PANICKING.swap(true, Ordering::SeqCst) {
        unsafe {
            crate::uart_print(b"\n!!! RECURSIVE PANIC !!!\n");
        }
        halt();
    }

    let panic_num = PANIC_COUNT.fetch_add(1, Ordering::SeqCst) + 1;

    disable_interrupts();

    print_panic_header(panic_num);
    print_panic_info(info);
    print_registers();
    print_system_state();
    print_recent_logs();
    print_stack_trace();
    print_next_steps();

    log_panic_structured(info);

    halt();
}

fn print_panic_header(panic_num: u64) {
    unsafe {
        crate::uart_print(b"\n");
        crate::uart_print(b"================================================================================\n");
        crate::uart_print(b"!!!                        KERNEL PANIC                                      !!!\n");
        crate::uart_print(b"================================================================================\n");

        if panic_num > 1 {
            let msg = alloc::format!("Panic #{}\n", panic_num);
            crate::uart_print(msg.as_bytes());
        }
        crate::uart_print(b"\n");
    }
}

fn print_panic_info(info: &PanicInfo) {
    unsafe {
        crate::uart_print(b"PANIC INFORMATION:\n");
        crate::uart_print(b"------------------\n");

        if let Some(location) = info.location() {
            let loc = alloc::format!("  Location: {}:{}:{}\n",
                location.file(), location.line(), location.column());
            crate::uart_print(loc.as_bytes());
        } else {
            crate::uart_print(b"  Location: <unknown>\n");
        }

        if let Some(payload) = info.payload().downcast_ref::<&str>() {
            let msg = alloc::format!("  Message:  {}\n", payload);
            crate::uart_print(msg.as_bytes());
        } else if let Some(payload) = info.payload().downcast_ref::<alloc::string::String>() {
            let msg = alloc::format!("  Message:  {}\n", payload);
            crate::uart_print(msg.as_bytes());
        } else {
            crate::uart_print(b"  Message:  <no message>\n");
        }

        crate::uart_print(b"\n");
    }
}

fn print_registers() {
    use core::arch::asm;

    unsafe {
        crate::uart_print(b"REGISTER DUMP:\n");
        crate::uart_print(b"--------------\n");

        let mut rax: u64; let mut rbx: u64; let mut rcx: u64; let mut rdx: u64;
        let mut rsi: u64; let mut rdi: u64; let mut rbp: u64; let mut rsp: u64;
        let mut r8: u64; let mut r9: u64; let mut r10: u64; let mut r11: u64;
        let mut r12: u64; let mut r13: u64; let mut r14: u64; let mut r15: u64;
        let mut rip: u64;

        asm!("mov {}, rax", out(reg) rax);
        asm!("mov {}, rbx", out(reg) rbx);
        asm!("mov {}, rcx", out(reg) rcx);
        asm!("mov {}, rdx", out(reg) rdx);
        asm!("mov {}, rsi", out(reg) rsi);
        asm!("mov {}, rdi", out(reg) rdi);
        asm!("mov {}, rbp", out(reg) rbp);
        asm!("mov {}, rsp", out(reg) rsp);
        asm!("mov {}, r8", out(reg) r8);
        asm!("mov {}, r9", out(reg) r9);
        asm!("mov {}, r10", out(reg) r10);
        asm!("mov {}, r11", out(reg) r11);
        asm!("mov {}, r12", out(reg) r12);
        asm!("mov {}, r13", out(reg) r13);
        asm!("mov {}, r14", out(reg) r14);
        asm!("mov {}, r15", out(reg) r15);
        asm!("lea {}, [rip]", out(reg) rip);

        let regs = alloc::format!(
            "  rax: {:016x}  rbx: {:016x}  rcx: {:016x}  rdx: {:016x}\n\
             rsi: {:016x}  rdi: {:016x}  rbp: {:016x}  rsp: {:016x}\n\
             r8:  {:016x}  r9:  {:016x}  r10: {:016x}  r11: {:016x}\n\
             r12: {:016x}  r13: {:016x}  r14: {:016x}  r15: {:016x}\n\
             rip: {:016x}\n",
            rax, rbx, rcx, rdx, rsi, rdi, rbp, rsp,
            r8, r9, r10, r11, r12, r13, r14, r15, rip
        );
        crate::uart_print(regs.as_bytes());

        crate::uart_print(b"\n");
    }
}

fn print_system_state() {
    unsafe {
        crate::uart_print(b"SYSTEM STATE:\n");
        crate::uart_print(b"-------------\n");

        let uptime_ms = crate::time::get_uptime_ms();
        let uptime_sec = uptime_ms / 1000;
        let msg = alloc::format!("  Uptime:       {} seconds ({} ms)\n", uptime_sec, uptime_ms);
        crate::uart_print(msg.as_bytes());

        {
            let stats = crate::heap::get_heap_stats();
            let current_mb = stats.current_allocated / (1024 * 1024);
            let peak_mb = stats.peak_allocated / (1024 * 1024);
            let allocs = stats.total_allocations;
            let deallocs = stats.total_deallocations;
            let failures = stats.allocation_failures;
            let msg = alloc::format!(
                "  Heap usage:   {} MB current, {} MB peak\n\
                 Allocations: {} allocs, {} deallocs, {} active\n\
                 Failures:    {}\n",
                current_mb, peak_mb, allocs, deallocs,
                allocs.saturating_sub(deallocs), failures
            );
            crate::uart_print(msg.as_bytes());
        }

        if let Some(task_id) = crate::sched::scheduler::current_task_id() {
            let msg = alloc::format!("  Current task: {:?}\n", task_id);
            crate::uart_print(msg.as_bytes());
        }

        crate::uart_print(b"\n");
    }
}

fn print_recent_logs() {
    unsafe {
        crate::uart_print(b"RECENT LOGS:\n");
        crate::uart_print(b"------------\n");
        let mut buf = [0u8; 1024];
        let n = crate::lib::bootlog::drain(&mut buf);
        if n > 0 {
            crate::uart_print(&buf[..n]);
        } else {
            crate::uart_print(b"  [no boot log captured]\n");
        }
        crate::uart_print(b"\n");
    }
}

fn print_stack_trace() {
    use core::arch::asm;

    unsafe {
        crate::uart_print(b"STACK TRACE:\n");
        crate::uart_print(b"------------\n");

        let mut rbp: u64;
        asm!("mov {}, rbp", out(reg) rbp);

        crate::uart_print(b"  [Stack unwinding requires frame pointers]\n");
        crate::uart_print(b"  [Build with RUSTFLAGS=\"-C force-frame-pointers=yes\"]\n");

        for i in 0..10 {
            if rbp == 0 || rbp < 0x1000 {
                break;
            }
            if rbp > 0x1000_0000_0000 {
                break;
            }

            let frame_ptr = rbp as *const u64;
            let ret_addr = frame_ptr.offset(1).read_volatile();

            let msg = alloc::format!("  #{}: {:016x}\n", i, ret_addr);
            crate::uart_print(msg.as_bytes());

            rbp = frame_ptr.read_volatile();
        }

        crate::uart_print(b"\n");
    }
}

fn print_next_steps() {
    unsafe {
        crate::uart_print(b"DEBUGGING STEPS:\n");
        crate::uart_print(b"----------------\n");
        crate::uart_print(b"  1. Check panic location and message above\n");
        crate::uart_print(b"  2. Examine register values for invalid pointers\n");
        crate::uart_print(b"  3. Check heap usage for memory exhaustion\n");
        crate::uart_print(b"  4. Review recent logs for error patterns\n");
        crate::uart_print(b"  5. If stack trace available, identify call chain\n");
        crate::uart_print(b"  6. Check system uptime for timing-related issues\n");
        crate::uart_print(b"\n");
        crate::uart_print(b"COMMON CAUSES:\n");
        crate::uart_print(b"--------------\n");
        crate::uart_print(b"  - Null or invalid pointer dereference\n");
        crate::uart_print(b"  - Array out of bounds access\n");
        crate::uart_print(b"  - Heap corruption or exhaustion\n");
        crate::uart_print(b"  - Stack overflow\n");
        crate::uart_print(b"  - Assertion failure\n");
        crate::uart_print(b"  - Unhandled error condition\n");
        crate::uart_print(b"\n");
    }
}

fn log_panic_structured(info: &PanicInfo) {
    unsafe {
        let location = info.location()
            .map(|l| alloc::format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let message = if let Some(payload) = info.payload().downcast_ref::<&str>() {
            payload.to_string()
        } else if let Some(payload) = info.payload().downcast_ref::<alloc::string::String>() {
            payload.clone()
        } else {
            "no message".to_string()
        };

        let timestamp = crate::time::get_timestamp_us();
        let log = alloc::format!(
            "{{\"ts\":{},\"subsystem\":\"PANIC\",\"status\":\"kernel_panic\",\"level\":\"FATAL\",\"location\":\"{}\",\"message\":\"{}\"}}\n",
            timestamp, location, message.replace('"', "\\\"")
        );
        crate::uart_print(log.as_bytes());
    }
}

#[inline(always)]
fn disable_interrupts() {
    unsafe {
        core::arch::asm!("cli");
    }
}

#[inline(always)]
fn halt() -> ! {
    unsafe {
        crate::uart_print(b"================================================================================\n");
        crate::uart_print(b"System halted.\n");
        crate::uart_print(b"================================================================================\n");
    }

    crate::arch::x86_64::cpu::halt_forever();
}

/// Get current panic count
pub fn get_panic_count() -> u64 {
    PANIC_COUNT.load(Ordering::Relaxed)
}

/// Check if currently panicking
pub fn is_panicking() -> bool {
    PANICKING.load(Ordering::Relaxed)
}
