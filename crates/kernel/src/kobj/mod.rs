//! Kernel object model and handle table (spec §4.3).

pub mod handle;
pub mod header;

use handle::HandleTable;

/// The single process-wide handle table (spec §9's "Global state": hung
/// off the `Kernel` singleton in a complete build; exposed as a static
/// here for the same reason the eleven mutexes are statics).
pub static HANDLES: HandleTable = HandleTable::new();
