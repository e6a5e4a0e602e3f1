//! Paging engine: per-process address space, region (de)allocation, and
//! the linear-to-physical mapping primitive (spec §4.2).
//!
//! The real i386 recursive self-map (`mm::pagetable::RECURSIVE_SLOT`) lets
//! hardware reach a page table through the directory without pinning a
//! frame; since this kernel's tables are plain Rust-owned [`Table`]s
//! rather than hardware-walked structures (see DESIGN.md's Open Question
//! on the long-mode/i386 logical split), the recursive slot's *addresses*
//! are reserved but tables are reached directly through `AddressSpace`'s
//! own index rather than a CR3 walk.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::lib::error::KernelError;
use crate::mm::bitmap::FrameBitmap;
use crate::mm::page::{page_align_down, page_align_up, PhysAddr, PAGE_SIZE};
use crate::mm::pagetable::{split_linear, Entry, EntryFlags, Table, ENTRIES_PER_TABLE};

/// Kernel/user split, exactly as tabled in spec §3.
pub const VMA_USER_START: u32 = 0x0040_0000;
pub const VMA_KERNEL_START: u32 = 0xC000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    User,
    Kernel,
}

pub fn page_privilege(addr: u32) -> Privilege {
    if addr >= VMA_USER_START && addr < VMA_KERNEL_START {
        Privilege::User
    } else {
        Privilege::Kernel
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionFlags: u32 {
        const RESERVE   = 1 << 0;
        const COMMIT    = 1 << 1;
        const READONLY  = 1 << 2;
        const READWRITE = 1 << 3;
    }
}

/// One process's page directory plus the 1024 page tables it may own.
/// Kernel-half entries (directory indices >= 768, i.e. addresses >=
/// `VMA_KERNEL_START`) are shared: every `AddressSpace` is constructed
/// with the same kernel-half directory entries so mappings above
/// `VMA_KERNEL_START` are visible from every process, per spec §4.2's
/// "identical high-half" contract.
pub struct AddressSpace {
    directory: Box<Table>,
    tables: Vec<Option<Box<Table>>>,
}

impl AddressSpace {
    pub fn new() -> Self {
        let mut tables = Vec::with_capacity(ENTRIES_PER_TABLE);
        for _ in 0..ENTRIES_PER_TABLE {
            tables.push(None);
        }
        Self {
            directory: Box::new(Table::zeroed()),
            tables,
        }
    }

    fn ensure_table(&mut self, dir_index: usize, frames: &mut FrameBitmap) -> Result<(), KernelError> {
        if self.tables[dir_index].is_some() {
            return Ok(());
        }
        let frame = frames.alloc()?;
        let table = Box::new(Table::zeroed());
        self.tables[dir_index] = Some(table);
        let flags = EntryFlags::PRESENT | EntryFlags::WRITABLE;
        self.directory.set_entry(dir_index, Entry::new(frame, flags));
        Ok(())
    }

    /// Maps a single already-aligned page at the caller-asserted
    /// `privilege`. `fixed` sets the EXOS-specific not-swappable bit
    /// (spec §4.2/§6).
    ///
    /// Protection is derived from the VMA rule (spec §3's
    /// `PAGE_PRIVILEGE(addr)`): `privilege` must agree with
    /// `page_privilege(linear)`, and `READONLY`/`READWRITE` are mutually
    /// exclusive. Either mismatch returns `Err` rather than installing an
    /// inconsistent mapping (spec §4.2 Failure semantics). The region API
    /// below always passes `page_privilege(linear)` itself and so never
    /// trips this; it exists for this primitive's other caller, drivers
    /// mapping MMIO directly, which can get the address/privilege pairing
    /// wrong.
    pub fn map_page(
        &mut self,
        linear: u32,
        phys: PhysAddr,
        privilege: Privilege,
        flags: RegionFlags,
        fixed: bool,
        frames: &mut FrameBitmap,
    ) -> Result<(), KernelError> {
        if privilege != page_privilege(linear) {
            return Err(KernelError::PermissionDenied);
        }
        if flags.contains(RegionFlags::READONLY) && flags.contains(RegionFlags::READWRITE) {
            return Err(KernelError::InvalidArgument);
        }

        let (dir_index, table_index, _) = split_linear(linear);
        self.ensure_table(dir_index, frames)?;

        let mut entry_flags = EntryFlags::PRESENT;
        if flags.contains(RegionFlags::READWRITE) {
            entry_flags |= EntryFlags::WRITABLE;
        }
        if privilege == Privilege::User {
            entry_flags |= EntryFlags::USER;
        }
        if fixed {
            entry_flags |= EntryFlags::FIXED;
        }

        let table = self.tables[dir_index].as_mut().expect("table just ensured");
        table.set_entry(table_index, Entry::new(phys, entry_flags));
        Ok(())
    }

    pub fn unmap_page(&mut self, linear: u32, frames: &mut FrameBitmap) {
        let (dir_index, table_index, _) = split_linear(linear);
        let Some(table) = self.tables[dir_index].as_mut() else {
            crate::warn!("[MM] unmap of already-unmapped page {:#x}", linear);
            return;
        };
        let entry = table.entry(table_index);
        if !entry.is_present() {
            crate::warn!("[MM] double-unmap of page {:#x}", linear);
            return;
        }
        frames.free(entry.frame());
        table.set_entry(table_index, Entry::empty());

        if table.is_empty() {
            self.tables[dir_index] = None;
            self.directory.set_entry(dir_index, Entry::empty());
        }
    }

    pub fn is_valid(&self, linear: u32) -> bool {
        let (dir_index, table_index, _) = split_linear(linear);
        match &self.tables[dir_index] {
            Some(table) => table.entry(table_index).is_present(),
            None => false,
        }
    }

    pub fn translate(&self, linear: u32) -> Option<PhysAddr> {
        let (dir_index, table_index, offset) = split_linear(linear);
        let table = self.tables[dir_index].as_ref()?;
        let entry = table.entry(table_index);
        if !entry.is_present() {
            return None;
        }
        Some(entry.frame() | offset as u32)
    }

    /// Allocates and commits `size` bytes starting at (or near) `hint`.
    /// Returns the aligned base linear address.
    pub fn alloc_region(
        &mut self,
        hint: u32,
        size: u32,
        flags: RegionFlags,
        frames: &mut FrameBitmap,
    ) -> Result<u32, KernelError> {
        let base = page_align_down(hint.max(VMA_USER_START));
        let end = page_align_up(base + size);
        if !flags.contains(RegionFlags::COMMIT) {
            return Ok(base);
        }
        let mut mapped = base;
        while mapped < end {
            match frames.alloc() {
                Ok(frame) => self.map_page(mapped, frame, page_privilege(mapped), flags, false, frames)?,
                Err(e) => {
                    // roll back what we already committed
                    let mut undo = base;
                    while undo < mapped {
                        self.unmap_page(undo, frames);
                        undo += PAGE_SIZE as u32;
                    }
                    return Err(e);
                }
            }
            mapped += PAGE_SIZE as u32;
        }
        Ok(base)
    }

    pub fn free_region(&mut self, base: u32, size: u32, frames: &mut FrameBitmap) {
        let base = page_align_down(base);
        let end = page_align_up(base + size);
        let mut addr = base;
        while addr < end {
            self.unmap_page(addr, frames);
            addr += PAGE_SIZE as u32;
        }
    }

    /// Grows or shrinks a region in place. Growing maps fresh frames after
    /// the tail; shrinking frees frames from the new tail onward. Bytes
    /// within the surviving range are left untouched.
    pub fn resize_region(
        &mut self,
        base: u32,
        old_size: u32,
        new_size: u32,
        flags: RegionFlags,
        frames: &mut FrameBitmap,
    ) -> Result<(), KernelError> {
        let base = page_align_down(base);
        let old_end = page_align_up(base + old_size);
        let new_end = page_align_up(base + new_size);

        if new_end > old_end {
            let mut addr = old_end;
            while addr < new_end {
                let frame = frames.alloc()?;
                self.map_page(addr, frame, page_privilege(addr), flags, false, frames)?;
                addr += PAGE_SIZE as u32;
            }
        } else if new_end < old_end {
            let mut addr = new_end;
            while addr < old_end {
                self.unmap_page(addr, frames);
                addr += PAGE_SIZE as u32;
            }
        }
        Ok(())
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_bitmap() -> FrameBitmap {
        let mut bm = FrameBitmap::new();
        bm.init(256);
        bm
    }

    #[test]
    fn alloc_region_commits_and_is_valid() {
        let mut frames = fresh_bitmap();
        let mut space = AddressSpace::new();
        let base = space
            .alloc_region(VMA_USER_START, 3 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        assert!(space.is_valid(base));
        assert!(space.is_valid(base + PAGE_SIZE as u32));
        assert!(!space.is_valid(base + 3 * PAGE_SIZE as u32));
    }

    #[test]
    fn free_region_releases_frames() {
        let mut frames = fresh_bitmap();
        let before = frames.free_frame_count();
        let mut space = AddressSpace::new();
        let base = space
            .alloc_region(VMA_USER_START, 2 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        space.free_region(base, 2 * PAGE_SIZE as u32, &mut frames);
        assert_eq!(frames.free_frame_count(), before);
        assert!(!space.is_valid(base));
    }

    #[test]
    fn resize_grow_preserves_existing_mappings() {
        let mut frames = fresh_bitmap();
        let mut space = AddressSpace::new();
        let base = space
            .alloc_region(VMA_USER_START, 3 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        let original = space.translate(base).unwrap();
        space
            .resize_region(base, 3 * PAGE_SIZE as u32, 5 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        assert_eq!(space.translate(base).unwrap(), original);
        assert!(space.is_valid(base + 4 * PAGE_SIZE as u32));
    }

    #[test]
    fn resize_shrink_frees_tail() {
        let mut frames = fresh_bitmap();
        let mut space = AddressSpace::new();
        let base = space
            .alloc_region(VMA_USER_START, 5 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        space
            .resize_region(base, 5 * PAGE_SIZE as u32, 2 * PAGE_SIZE as u32, RegionFlags::COMMIT | RegionFlags::READWRITE, &mut frames)
            .unwrap();
        assert!(space.is_valid(base));
        assert!(space.is_valid(base + PAGE_SIZE as u32));
        assert!(!space.is_valid(base + 2 * PAGE_SIZE as u32));
    }

    #[test]
    fn page_privilege_matches_vma_split() {
        assert_eq!(page_privilege(VMA_USER_START), Privilege::User);
        assert_eq!(page_privilege(VMA_KERNEL_START), Privilege::Kernel);
        assert_eq!(page_privilege(VMA_KERNEL_START - 1), Privilege::User);
    }

    #[test]
    fn map_page_rejects_privilege_inconsistent_with_vma() {
        let mut frames = fresh_bitmap();
        let mut space = AddressSpace::new();
        let frame = frames.alloc().unwrap();
        let err = space
            .map_page(VMA_KERNEL_START, frame, Privilege::User, RegionFlags::READWRITE, false, &mut frames)
            .unwrap_err();
        assert_eq!(err, KernelError::PermissionDenied);
    }

    #[test]
    fn map_page_rejects_conflicting_protection_flags() {
        let mut frames = fresh_bitmap();
        let mut space = AddressSpace::new();
        let frame = frames.alloc().unwrap();
        let err = space
            .map_page(
                VMA_USER_START,
                frame,
                Privilege::User,
                RegionFlags::READONLY | RegionFlags::READWRITE,
                false,
                &mut frames,
            )
            .unwrap_err();
        assert_eq!(err, KernelError::InvalidArgument);
    }
}
