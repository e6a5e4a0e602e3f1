//! x86_64 architecture-specific code: CPU primitives, GDT/TSS, IDT, the
//! legacy PIC, and the COM1 serial console.

pub mod boot;
pub mod cpu;
pub mod gdt;
pub mod idt;
pub mod pic;
pub mod serial;
pub mod trapframe;
pub mod tss;
