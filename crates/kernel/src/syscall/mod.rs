//! User-facing syscall surface (spec §4.8, §6). `numbers` is the stable
//! ABI table; `dispatch` is the single entry point every trap handler
//! eventually calls, the same one-entry-point shape [`crate::driver`]
//! uses for its own `Commands(Function, Parameter)` call.

pub mod dispatch;
pub mod numbers;
