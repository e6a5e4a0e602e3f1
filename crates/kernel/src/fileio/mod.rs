//! File I/O (spec §6). EXOS owns one storage backend in this core, a
//! RAM-backed file table ([`backend::RamFileBackend`]); real
//! filesystem drivers are external collaborators (spec.md's
//! Non-goals). Two layers sit on top of it: the all-or-nothing
//! `FileReadAll`/`FileWriteAll` pair below, and the cursor-based
//! [`file::OpenFile`] handle used by `SYSCALL_OpenFile` and friends.

pub mod backend;
pub mod file;

use alloc::vec::Vec;

use spin::Mutex;

use crate::lib::error::KernelError;
use backend::RamFileBackend;

pub(crate) static FILES: Mutex<RamFileBackend> = Mutex::new(RamFileBackend::new());

/// `FileReadAll`: the whole file at once.
pub fn file_read_all(path: &str) -> Result<Vec<u8>, KernelError> {
    FILES.lock().read_all(path)
}

/// `FileWriteAll`: replaces the whole file atomically. Returns the
/// number of bytes written — `data.len()` on success, `0` on failure,
/// never a partial count (spec §8).
pub fn file_write_all(path: &str, data: &[u8]) -> usize {
    FILES.lock().write_all(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_read_all_of_missing_path_is_not_found() {
        assert_eq!(file_read_all("/nope").unwrap_err(), KernelError::NotFound);
    }
}
