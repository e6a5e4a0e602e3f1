//! Synchronization primitives: the recursive owner-tracked mutex and the
//! eleven named global locks (spec §4.4, §5).

pub mod mutex;
pub mod semaphore;

pub use mutex::{
    Mutex, Order, OrderGuard, MUTEX_CONSOLE, MUTEX_DESKTOP, MUTEX_FILE, MUTEX_FILESYSTEM,
    MUTEX_KERNEL, MUTEX_LOG, MUTEX_MEMORY, MUTEX_PROCESS, MUTEX_SCHEDULE, MUTEX_SESSION,
    MUTEX_TASK, MUTEX_USERACCOUNT,
};
pub use semaphore::Semaphore;
