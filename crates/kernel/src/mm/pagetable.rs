//! i386 page directory / page table entry layout and the recursive
//! self-map (spec §3, §6, §9 "Recursive page-directory mapping").
//!
//! Entries are the literal 32-bit hardware bitfields: bit 0 Present, 1
//! R/W, 2 U/S, 3 WT, 4 CD, 5 Accessed, 6 Dirty (PTE only), 7 PageSize
//! (PDE only), 8 Global, 9 Fixed (EXOS-specific, not swappable), 10-11
//! OS-available, 12-31 frame address. We keep this exact layout even
//! though the CPU the kernel actually boots on runs in long mode
//! ([`crate::arch::x86_64`]): it is EXOS's own logical address-space
//! format, walked and maintained entirely in software by [`super::region`].

use bitflags::bitflags;

use crate::mm::page::{page_align_down, PhysAddr, PAGE_SIZE};

pub const ENTRIES_PER_TABLE: usize = 1024;

/// PDE slot reserved for the self-referencing recursive mapping.
pub const RECURSIVE_SLOT: usize = 1023;

/// With PDE 1023 self-mapped, the active page directory is readable here.
pub const RECURSIVE_PD_ADDR: u32 = 0xFFFF_F000;

/// And each page table is mapped at this base plus `dir_index * 4KiB`.
pub const RECURSIVE_PT_BASE: u32 = 0xFFC0_0000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u32 {
        const PRESENT    = 1 << 0;
        const WRITABLE   = 1 << 1;
        const USER       = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const CACHE_DISABLE = 1 << 4;
        const ACCESSED   = 1 << 5;
        const DIRTY      = 1 << 6;
        const PAGE_SIZE  = 1 << 7;
        const GLOBAL     = 1 << 8;
        /// EXOS-specific: page is not eligible for swap (no swap path exists
        /// yet, but the bit is preserved so a future implementation doesn't
        /// need a format change).
        const FIXED      = 1 << 9;
    }
}

const FRAME_MASK: u32 = 0xFFFF_F000;

/// A single page-directory or page-table entry.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Entry(u32);

impl Entry {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn new(frame: PhysAddr, flags: EntryFlags) -> Self {
        debug_assert_eq!(frame & !FRAME_MASK, 0, "frame address must be page-aligned");
        Self((frame & FRAME_MASK) | flags.bits())
    }

    pub fn is_present(&self) -> bool {
        self.0 & EntryFlags::PRESENT.bits() != 0
    }

    pub fn frame(&self) -> PhysAddr {
        self.0 & FRAME_MASK
    }

    pub fn flags(&self) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.0)
    }

    pub fn set_flag(&mut self, flag: EntryFlags, value: bool) {
        let mut flags = self.flags();
        flags.set(flag, value);
        self.0 = self.frame() | flags.bits();
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl core::fmt::Debug for Entry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Entry")
            .field("frame", &self.frame())
            .field("flags", &self.flags())
            .finish()
    }
}

/// A 4 KiB-aligned table of 1024 entries — used for both page directories
/// and page tables, since the i386 format is identical at both levels.
#[repr(C, align(4096))]
pub struct Table {
    entries: [Entry; ENTRIES_PER_TABLE],
}

impl Table {
    pub const fn zeroed() -> Self {
        Self {
            entries: [Entry::empty(); ENTRIES_PER_TABLE],
        }
    }

    pub fn entry(&self, index: usize) -> Entry {
        self.entries[index]
    }

    pub fn set_entry(&mut self, index: usize, entry: Entry) {
        self.entries[index] = entry;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| !e.is_present())
    }
}

/// Splits a linear address into its page-directory index, page-table
/// index, and in-page offset.
pub fn split_linear(linear: u32) -> (usize, usize, usize) {
    let dir = (linear >> 22) as usize & 0x3FF;
    let table = (linear >> 12) as usize & 0x3FF;
    let offset = (linear & 0xFFF) as usize;
    (dir, table, offset)
}

/// Linear address of the page table for `dir_index`, reachable through
/// the recursive self-map without pinning a temporary frame.
pub fn recursive_pt_addr(dir_index: usize) -> u32 {
    RECURSIVE_PT_BASE + (dir_index as u32) * PAGE_SIZE as u32
}

pub fn align_range(base: u32, size: u32) -> (u32, u32) {
    let start = page_align_down(base);
    let end = crate::mm::page::page_align_up(base + size);
    (start, end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_frame_and_flags() {
        let e = Entry::new(0x0040_3000, EntryFlags::PRESENT | EntryFlags::WRITABLE);
        assert_eq!(e.frame(), 0x0040_3000);
        assert!(e.is_present());
        assert!(e.flags().contains(EntryFlags::WRITABLE));
        assert!(!e.flags().contains(EntryFlags::USER));
    }

    #[test]
    fn split_linear_matches_i386_layout() {
        let (dir, table, offset) = split_linear(0xC010_1234);
        assert_eq!(dir, 0xC010_1234u32 as usize >> 22 & 0x3FF);
        assert_eq!(table, 0xC010_1234u32 as usize >> 12 & 0x3FF);
        assert_eq!(offset, 0x234);
    }

    #[test]
    fn recursive_slot_is_1023() {
        assert_eq!(RECURSIVE_SLOT, 1023);
        assert_eq!(recursive_pt_addr(0), RECURSIVE_PT_BASE);
    }

    #[test]
    fn align_range_rounds_outward() {
        let (base, size) = align_range(0x1001, 0x1FFE);
        assert_eq!(base, 0x1000);
        assert_eq!(size, 0x3000);
    }
}
