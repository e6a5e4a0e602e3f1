//! Human input device plumbing: the `EKM1` keyboard layout file format
//! and scancode routing (spec §6).

pub mod layout;
