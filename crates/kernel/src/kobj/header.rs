//! The kernel object header: the common prefix of every long-lived
//! kernel entity (spec §3). `TypeID` never changes after construction;
//! `References` is mutated only through atomic increment/`Release`; a
//! type-mismatched dereference is a hard failure (returned as `None`,
//! never dereferenced).

use core::sync::atomic::{AtomicU32, Ordering};

use crate::process::ids::ProcessId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ObjectType {
    None = 0,
    Process = 1,
    Task = 2,
    Mutex = 3,
    Message = 4,
    Semaphore = 5,
    Window = 6,
    Desktop = 7,
    File = 8,
    Disk = 9,
    Driver = 10,
}

/// 64-bit object identity, a truncated UUID per spec §3. Not a handle:
/// stable for the object's lifetime but never exposed to user space
/// directly (user space only ever sees a `HANDLE`, see `kobj::handle`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

static NEXT_ID: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(1);

impl ObjectId {
    pub fn fresh() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub struct ObjHeader {
    type_id: ObjectType,
    references: AtomicU32,
    id: ObjectId,
    owner_process: ProcessId,
}

impl ObjHeader {
    pub fn new(type_id: ObjectType, owner_process: ProcessId) -> Self {
        Self {
            type_id,
            references: AtomicU32::new(1),
            id: ObjectId::fresh(),
            owner_process,
        }
    }

    pub fn type_id(&self) -> ObjectType {
        self.type_id
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn owner_process(&self) -> ProcessId {
        self.owner_process
    }

    pub fn references(&self) -> u32 {
        self.references.load(Ordering::Acquire)
    }

    /// `AcquireKernelObject`: increments the reference count.
    pub fn acquire(&self) {
        self.references.fetch_add(1, Ordering::AcqRel);
    }

    /// `ReleaseKernelObject`: decrements and returns `true` when this was
    /// the last reference (the caller must now run per-type teardown and
    /// free the object).
    pub fn release(&self) -> bool {
        self.references.fetch_sub(1, Ordering::AcqRel) == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_start_at_one() {
        let h = ObjHeader::new(ObjectType::Task, ProcessId(1));
        assert_eq!(h.references(), 1);
        assert_eq!(h.type_id(), ObjectType::Task);
    }

    #[test]
    fn lifecycle_reaches_zero_exactly_once() {
        let h = ObjHeader::new(ObjectType::Mutex, ProcessId(1));
        h.acquire();
        h.acquire();
        assert_eq!(h.references(), 3);
        assert!(!h.release());
        assert!(!h.release());
        assert!(h.release());
        assert_eq!(h.references(), 0);
    }

    #[test]
    fn ids_are_unique_across_objects() {
        let a = ObjHeader::new(ObjectType::File, ProcessId(1));
        let b = ObjHeader::new(ObjectType::File, ProcessId(1));
        assert_ne!(a.id(), b.id());
    }
}
