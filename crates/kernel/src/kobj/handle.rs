//! Handle table: `HANDLE -> LINEAR pointer to kernel object`, backed by
//! the radix tree (spec §3, §4.3). This is the one place raw kernel
//! object pointers are produced from an opaque integer; every other
//! access goes through [`Handle::get`], the single typed accessor that
//! replaces the C `SAFE_USE_*` macro family (spec §9): non-null AND
//! resident (it's in the table) AND type-matches (the downcast
//! succeeds), all in one call.

use core::any::Any;

use alloc::sync::Arc;
use spin::Mutex as SpinMutex;

use crate::kobj::header::ObjectType;
use crate::util::radix_tree::RadixTree;

/// Opaque handle value exposed to user space. Kernel-side, it's a key
/// into [`HandleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub u32);

struct Entry {
    type_id: ObjectType,
    value: Arc<dyn Any + Send + Sync>,
}

pub struct HandleTable {
    tree: SpinMutex<RadixTree<Entry>>,
    next: core::sync::atomic::AtomicU32,
}

impl HandleTable {
    pub const fn new() -> Self {
        Self {
            tree: SpinMutex::new(RadixTree::new()),
            next: core::sync::atomic::AtomicU32::new(1),
        }
    }

    /// Inserts a new object and returns the handle that refers to it.
    pub fn insert<T: Any + Send + Sync>(&self, type_id: ObjectType, value: Arc<T>) -> Handle {
        let key = self.next.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
        self.tree.lock().insert(
            key,
            Entry {
                type_id,
                value,
            },
        );
        Handle(key)
    }

    /// The single typed accessor: `None` unless the handle is present,
    /// the stored type matches `T`, and (trivially, since it's in the
    /// table) the value is live.
    pub fn get<T: Any + Send + Sync>(&self, handle: Handle) -> Option<Arc<T>> {
        let tree = self.tree.lock();
        let entry = tree.get(handle.0)?;
        entry.value.clone().downcast::<T>().ok()
    }

    pub fn type_of(&self, handle: Handle) -> Option<ObjectType> {
        self.tree.lock().get(handle.0).map(|e| e.type_id)
    }

    /// `DeleteObject`: removes the handle's table entry. Does not itself
    /// drop the last strong reference unless this was the only `Arc`
    /// clone outstanding — actual teardown happens through
    /// `ObjHeader::release` at the point the caller drops their `Arc`.
    pub fn remove(&self, handle: Handle) -> bool {
        self.tree.lock().remove(handle.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.tree.lock().len()
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(u32);

    #[test]
    fn get_with_matching_type_succeeds() {
        let table = HandleTable::new();
        let h = table.insert(ObjectType::File, Arc::new(Dummy(42)));
        let got = table.get::<Dummy>(h).unwrap();
        assert_eq!(got.0, 42);
    }

    #[test]
    fn get_with_wrong_type_returns_none() {
        let table = HandleTable::new();
        struct Other;
        let h = table.insert(ObjectType::File, Arc::new(Dummy(1)));
        assert!(table.get::<Other>(h).is_none());
    }

    #[test]
    fn removed_handle_is_no_longer_resident() {
        let table = HandleTable::new();
        let h = table.insert(ObjectType::Task, Arc::new(Dummy(7)));
        assert!(table.remove(h));
        assert!(table.get::<Dummy>(h).is_none());
    }
}
