//! RAM-backed file storage (spec §6's file interfaces, §8's file-write-
//! atomicity property). EXOS has no on-disk filesystem in this core
//! (spec.md: "Specific filesystems... are external collaborators"); this
//! backend is the one storage EXOS actually owns today, and doubles as
//! the host-testable harness for the atomicity contract since there is
//! no real disk hardware to fault-inject against in a test run.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::lib::error::KernelError;

/// Set by [`inject_next_write_failure`] to make the *next* [`RamFileBackend::write_all`]
/// fail partway through, the way spec.md's testable property 6 asks for
/// ("simulate failure midway, e.g. induced disk error").
static INJECT_FAILURE: AtomicBool = AtomicBool::new(false);

/// Arms a one-shot write failure for the next [`RamFileBackend::write_all`]
/// call. Test-only: production code has no path that ever wants a write
/// to fail except genuine resource exhaustion.
#[cfg(any(test, feature = "testing"))]
pub fn inject_next_write_failure() {
    INJECT_FAILURE.store(true, Ordering::SeqCst);
}

pub struct RamFileBackend {
    files: BTreeMap<String, Vec<u8>>,
}

impl RamFileBackend {
    pub const fn new() -> Self {
        Self { files: BTreeMap::new() }
    }

    pub fn read_all(&self, path: &str) -> Result<Vec<u8>, KernelError> {
        self.files.get(path).cloned().ok_or(KernelError::NotFound)
    }

    /// `FileWriteAll`: all-or-nothing. Builds the new contents in a
    /// staging buffer and only swaps it into the map on full success, so
    /// a failure midway leaves whatever was already on "disk" untouched
    /// (spec.md's atomicity property). Returns the number of bytes
    /// written, which is either `data.len()` or `0` — never a partial
    /// count.
    pub fn write_all(&mut self, path: &str, data: &[u8]) -> usize {
        if INJECT_FAILURE.swap(false, Ordering::SeqCst) {
            return 0;
        }

        let mut staged = Vec::with_capacity(data.len());
        staged.extend_from_slice(data);
        self.files.insert(String::from(path), staged);
        data.len()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn size(&self, path: &str) -> Option<usize> {
        self.files.get(path).map(|f| f.len())
    }

    pub fn remove(&mut self, path: &str) -> bool {
        self.files.remove(path).is_some()
    }
}

impl Default for RamFileBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut fs = RamFileBackend::new();
        let data: Vec<u8> = (0..=255u8).cycle().take(64 * 1024 + 123).collect();
        let written = fs.write_all("/temp/a.bin", &data);
        assert_eq!(written, data.len());
        assert_eq!(fs.read_all("/temp/a.bin").unwrap(), data);
    }

    #[test]
    fn injected_failure_leaves_prior_contents_untouched() {
        let mut fs = RamFileBackend::new();
        let original = alloc::vec![1u8, 2, 3];
        assert_eq!(fs.write_all("/temp/a.bin", &original), original.len());

        inject_next_write_failure();
        let attempted = alloc::vec![9u8; 4096];
        assert_eq!(fs.write_all("/temp/a.bin", &attempted), 0);
        assert_eq!(fs.read_all("/temp/a.bin").unwrap(), original);
    }

    #[test]
    fn read_of_missing_file_is_not_found() {
        let fs = RamFileBackend::new();
        assert_eq!(fs.read_all("/nope").unwrap_err(), KernelError::NotFound);
    }
}
