//! Page fault classification — the fatal/non-fatal split spec §7's error
//! taxonomy draws between "page fault in kernel mode without a registered
//! handler" (Fatal) and a plain user-mode access violation (Permission).
//!
//! [`crate::arch::x86_64::idt`] calls [`handle`] instead of panicking
//! directly on every `#PF`; only a kernel-mode fault with no handler
//! reaches the panic/"sleeping beauty" path.

use crate::mm::region::page_privilege;
use crate::mm::region::Privilege;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy)]
    pub struct FaultCode: u32 {
        const PRESENT  = 1 << 0;
        const WRITE    = 1 << 1;
        const USER     = 1 << 2;
        const RESERVED = 1 << 3;
        const FETCH    = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The fault was on a user address and is reported back as a syscall
    /// or process-termination error, never a kernel panic.
    Handled,
    /// Kernel-mode fault with no registered handler: fatal per spec §7.
    Fatal,
}

/// Classifies a `#PF` and logs it. Returns [`FaultOutcome::Fatal`] only
/// for a fault on a kernel-half address with the faulting `CS` in ring 0.
pub fn handle(faulting_address: u32, code: FaultCode, kernel_mode: bool) -> FaultOutcome {
    let priv_area = page_privilege(faulting_address);

    if kernel_mode && priv_area == Privilege::Kernel {
        crate::error!(
            "[MM] fatal page fault at {:#x} (code={:?}) in kernel mode",
            faulting_address,
            code
        );
        return FaultOutcome::Fatal;
    }

    crate::warn!(
        "[MM] page fault at {:#x} (code={:?}), user_mode={}",
        faulting_address,
        code,
        !kernel_mode
    );
    FaultOutcome::Handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_mode_fault_on_user_address_is_handled() {
        let outcome = handle(0x0060_0000, FaultCode::PRESENT, false);
        assert_eq!(outcome, FaultOutcome::Handled);
    }

    #[test]
    fn kernel_mode_fault_on_kernel_address_is_fatal() {
        let outcome = handle(0xC010_0000, FaultCode::WRITE, true);
        assert_eq!(outcome, FaultOutcome::Fatal);
    }
}
