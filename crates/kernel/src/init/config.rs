//! Compile-time tunables (spec §9's "Global state", §4.D). EXOS has no
//! dynamic reconfiguration — the original `Base.h` hardcodes these as
//! `#define`s, and the Rust port keeps them as `pub const` for the same
//! reason rather than inventing a config file nothing would ever write.

/// Ceiling on simultaneously live processes. Not enforced by any single
/// data structure today (the process table is a `BTreeMap`); exists so
/// callers have a documented number to validate `CreateProcess` pressure
/// against.
pub const MAX_PROCESSES: usize = 64;

/// Ceiling on simultaneously live tasks, same role as [`MAX_PROCESSES`].
pub const MAX_TASKS: usize = 256;

pub use crate::heap::HEAP_SIZE;
pub use crate::intr::device::DEVICE_VECTOR_COUNT;
pub use crate::msg::queue::CAPACITY as MESSAGE_QUEUE_CAPACITY;
