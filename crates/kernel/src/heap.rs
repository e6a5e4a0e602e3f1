//! Kernel heap allocator
//!
//! Backs `alloc::*` with a single reserved region inside the kernel's linear
//! window (`VMA_KERNEL..`). The region is fixed-size and non-growable: EXOS
//! has no demand paging, so the heap cannot be extended by mapping more
//! frames on pressure. Allocation failure is reported through [`KernelError::OutOfMemory`]
//! at the call site, never by panicking.

use core::alloc::{GlobalAlloc, Layout};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use linked_list_allocator::LockedHeap;

use crate::lib::error::KernelError;

/// Base linear address of the kernel heap region.
pub const HEAP_START: usize = 0xC010_0000;
/// 8 MiB is enough for every kernel object the core allocates; drivers and
/// userland processes get their memory from [`crate::mm::region`] instead.
pub const HEAP_SIZE: usize = 8 * 1024 * 1024;

#[repr(align(4096))]
struct HeapRegion([u8; HEAP_SIZE]);

static mut HEAP_MEMORY: HeapRegion = HeapRegion([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: StatsAllocator = StatsAllocator {
    inner: LockedHeap::empty(),
};

static HEAP_READY: AtomicBool = AtomicBool::new(false);

#[derive(Default)]
struct HeapCounters {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    current: AtomicUsize,
    peak: AtomicUsize,
    failures: AtomicUsize,
}

static COUNTERS: HeapCounters = HeapCounters {
    allocations: AtomicUsize::new(0),
    deallocations: AtomicUsize::new(0),
    current: AtomicUsize::new(0),
    peak: AtomicUsize::new(0),
    failures: AtomicUsize::new(0),
};

struct StatsAllocator {
    inner: LockedHeap,
}

unsafe impl GlobalAlloc for StatsAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if ptr.is_null() {
            COUNTERS.failures.fetch_add(1, Ordering::Relaxed);
            crate::warn!("[HEAP] allocation of {} bytes failed", layout.size());
        } else {
            COUNTERS.allocations.fetch_add(1, Ordering::Relaxed);
            let now = COUNTERS.current.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
            COUNTERS.peak.fetch_max(now, Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        COUNTERS.deallocations.fetch_add(1, Ordering::Relaxed);
        COUNTERS.current.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

/// Statistics snapshot, used by the panic handler and `GetSystemInfo`.
#[derive(Debug, Clone, Copy)]
pub struct HeapStats {
    pub total_allocations: usize,
    pub total_deallocations: usize,
    pub current_allocated: usize,
    pub peak_allocated: usize,
    pub allocation_failures: usize,
}

pub fn get_heap_stats() -> HeapStats {
    HeapStats {
        total_allocations: COUNTERS.allocations.load(Ordering::Relaxed),
        total_deallocations: COUNTERS.deallocations.load(Ordering::Relaxed),
        current_allocated: COUNTERS.current.load(Ordering::Relaxed),
        peak_allocated: COUNTERS.peak.load(Ordering::Relaxed),
        allocation_failures: COUNTERS.failures.load(Ordering::Relaxed),
    }
}

/// Initializes the global allocator. Must run once, before the first
/// `alloc`/`Box`/`Vec` use, and before any other task is scheduled.
pub fn init_heap() -> Result<(), KernelError> {
    if HEAP_READY.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    unsafe {
        let region = core::ptr::addr_of_mut!(HEAP_MEMORY) as *mut u8;
        ALLOCATOR.inner.lock().init(region, HEAP_SIZE);
    }

    crate::info!("[HEAP] {} KiB heap ready at {:#x}", HEAP_SIZE / 1024, HEAP_START);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn heap_allocates_and_frees() {
        init_heap().unwrap();
        let before = get_heap_stats().current_allocated;
        let mut v: Vec<u32> = Vec::with_capacity(256);
        for i in 0..256 {
            v.push(i);
        }
        assert!(get_heap_stats().current_allocated >= before);
        drop(v);
    }
}
