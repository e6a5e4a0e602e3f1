//! Device interrupt controller (spec §4.6).

pub mod device;
