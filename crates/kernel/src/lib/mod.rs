//! Core library utilities shared by every kernel subsystem: error codes,
//! the printk-style logger, the boot ring buffer, and the panic handler.

pub mod error;
pub mod printk;
pub mod ringbuf;
pub mod panic;
pub mod bootlog;
