//! Architecture-specific code. EXOS targets 32-bit x86 (spec.md's
//! OVERVIEW); this tree builds on the `x86_64` crate's interrupt/segment
//! plumbing in long mode and treats it as the i386 logical model the
//! paging and trap-frame layers above it assume (documented as an Open
//! Question resolution in DESIGN.md).

#[cfg(target_arch = "x86_64")]
pub mod x86_64;
