//! Physical frame allocator — one bit per 4 KiB physical frame.
//!
//! Grounded on spec §4.1. Single-threaded allocation under `MUTEX_MEMORY`;
//! the caller is responsible for holding that lock (see [`crate::sync`]).
//! There is no fragmentation concept and no swap path: exhaustion is a
//! plain allocation failure.

use crate::lib::error::KernelError;
use crate::mm::page::{pa_to_pfn, pfn_to_pa, PhysAddr, PAGE_SIZE};

/// Maximum physical RAM the bitmap tracks (128 MiB — matches the teacher's
/// assumed bring-up memory size; real hardware size is discovered from the
/// bootloader memory map and only the frames within it are ever usable).
pub const MAX_FRAMES: usize = 128 * 1024 * 1024 / PAGE_SIZE;
const WORDS: usize = MAX_FRAMES / 64;

pub struct FrameBitmap {
    words: [u64; WORDS],
    total_frames: usize,
}

impl FrameBitmap {
    pub const fn new() -> Self {
        Self {
            words: [0; WORDS],
            total_frames: 0,
        }
    }

    /// Marks `[0, frame_count)` as available and everything beyond as
    /// permanently reserved (out of the physical range present on this
    /// machine).
    pub fn init(&mut self, frame_count: usize) {
        let frame_count = frame_count.min(MAX_FRAMES);
        self.total_frames = frame_count;
        for i in frame_count..MAX_FRAMES {
            self.set_bit(i);
        }
    }

    fn set_bit(&mut self, frame: usize) {
        self.words[frame / 64] |= 1 << (frame % 64);
    }

    fn clear_bit(&mut self, frame: usize) {
        self.words[frame / 64] &= !(1 << (frame % 64));
    }

    fn is_set(&self, frame: usize) -> bool {
        self.words[frame / 64] & (1 << (frame % 64)) != 0
    }

    /// First-fit scan for a single free frame: always returns the
    /// lowest-index free frame, starting the scan over from 0 every call.
    pub fn alloc(&mut self) -> Result<PhysAddr, KernelError> {
        for frame in 0..self.total_frames {
            if !self.is_set(frame) {
                self.set_bit(frame);
                return Ok(pfn_to_pa(frame));
            }
        }
        Err(KernelError::OutOfMemory)
    }

    /// Clears the bit for `addr`. Freeing an already-free frame logs a
    /// warning and is otherwise a no-op — never a hard error.
    pub fn free(&mut self, addr: PhysAddr) {
        let frame = pa_to_pfn(addr);
        if frame >= self.total_frames {
            crate::warn!("[MM] free of out-of-range frame {:#x}", addr);
            return;
        }
        if !self.is_set(frame) {
            crate::warn!("[MM] double-free of frame {:#x}", addr);
            return;
        }
        self.clear_bit(frame);
    }

    /// Reserves a physical range (BIOS/ACPI/MMIO) so the allocator never
    /// hands these frames out.
    pub fn reserve_range(&mut self, start: PhysAddr, len: usize) {
        let first = pa_to_pfn(start);
        let count = (len + PAGE_SIZE - 1) / PAGE_SIZE;
        for frame in first..(first + count).min(MAX_FRAMES) {
            self.set_bit(frame);
        }
    }

    pub fn free_frame_count(&self) -> usize {
        let mut n = 0;
        for frame in 0..self.total_frames {
            if !self.is_set(frame) {
                n += 1;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_free_round_trips_bitmap_state() {
        let mut bm = FrameBitmap::new();
        bm.init(256);
        let before = bm.free_frame_count();
        let addr = bm.alloc().unwrap();
        assert_eq!(bm.free_frame_count(), before - 1);
        bm.free(addr);
        assert_eq!(bm.free_frame_count(), before);
    }

    #[test]
    fn exhaustion_returns_out_of_memory() {
        let mut bm = FrameBitmap::new();
        bm.init(2);
        bm.alloc().unwrap();
        bm.alloc().unwrap();
        assert_eq!(bm.alloc(), Err(KernelError::OutOfMemory));
    }

    #[test]
    fn reserved_range_is_never_handed_out() {
        let mut bm = FrameBitmap::new();
        bm.init(16);
        bm.reserve_range(0, 16 * PAGE_SIZE);
        assert_eq!(bm.alloc(), Err(KernelError::OutOfMemory));
    }

    #[test]
    fn alloc_always_returns_lowest_free_frame() {
        let mut bm = FrameBitmap::new();
        bm.init(8);
        let first = bm.alloc().unwrap();
        let _second = bm.alloc().unwrap();
        bm.free(first);
        assert_eq!(bm.alloc().unwrap(), first);
    }

    #[test]
    fn double_free_is_a_warning_not_a_panic() {
        let mut bm = FrameBitmap::new();
        bm.init(4);
        let addr = bm.alloc().unwrap();
        bm.free(addr);
        bm.free(addr);
    }
}
