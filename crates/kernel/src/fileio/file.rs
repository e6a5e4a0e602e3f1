//! Handle-based file I/O (`OpenFile`/`ReadFile`/`WriteFile`/
//! `Get`/`SetFilePointer`/`GetFileSize`, spec §6) layered over
//! [`super::FILES`]. `FileReadAll`/`FileWriteAll` (spec §6, §8) stay the
//! all-or-nothing entry points used for layout/config loading and the
//! atomicity test; this module adds the cursor-based form the syscall
//! surface's `SYSCALL_ReadFile`/`SYSCALL_WriteFile` need.

use alloc::string::String;

use crate::fileio::FILES;
use crate::lib::error::KernelError;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenMode: u32 {
        const READ   = 1 << 0;
        const WRITE  = 1 << 1;
        const CREATE = 1 << 2;
        const TRUNCATE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

/// The open-file object a `SYSCALL_OpenFile` handle resolves to
/// (`kobj::header::ObjectType::File`).
pub struct OpenFile {
    path: String,
    cursor: usize,
    mode: OpenMode,
}

impl OpenFile {
    /// `OpenFile`. `CREATE` without an existing file starts it empty;
    /// opening a missing file without `CREATE` fails with `NotFound`.
    pub fn open(path: &str, mode: OpenMode) -> Result<Self, KernelError> {
        let mut files = FILES.lock();
        if !files.exists(path) {
            if mode.contains(OpenMode::CREATE) {
                files.write_all(path, &[]);
            } else {
                return Err(KernelError::NotFound);
            }
        } else if mode.contains(OpenMode::TRUNCATE) {
            files.write_all(path, &[]);
        }
        Ok(Self {
            path: String::from(path),
            cursor: 0,
            mode,
        })
    }

    /// `ReadFile`: reads up to `buf.len()` bytes starting at the current
    /// cursor, advancing it by the amount actually read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, KernelError> {
        if !self.mode.contains(OpenMode::READ) {
            return Err(KernelError::PermissionDenied);
        }
        let files = FILES.lock();
        let contents = files.read_all(&self.path)?;
        let available = contents.len().saturating_sub(self.cursor);
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&contents[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    /// `WriteFile`: overwrites/extends the file starting at the current
    /// cursor, then advances it. Unlike `FileWriteAll` this mutates an
    /// existing file in place rather than atomically replacing it —
    /// matching the original `SYSCALL_WriteFile`'s incremental-write
    /// contract, which the all-or-nothing guarantee only binds on
    /// `FileWriteAll` itself (spec §8).
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, KernelError> {
        if !self.mode.contains(OpenMode::WRITE) {
            return Err(KernelError::PermissionDenied);
        }
        let mut files = FILES.lock();
        let mut contents = files.read_all(&self.path).unwrap_or_default();
        if self.cursor + buf.len() > contents.len() {
            contents.resize(self.cursor + buf.len(), 0);
        }
        contents[self.cursor..self.cursor + buf.len()].copy_from_slice(buf);
        files.write_all(&self.path, &contents);
        self.cursor += buf.len();
        Ok(buf.len())
    }

    pub fn size(&self) -> usize {
        FILES.lock().size(&self.path).unwrap_or(0)
    }

    pub fn tell(&self) -> usize {
        self.cursor
    }

    /// `SetFilePointer`.
    pub fn seek(&mut self, origin: SeekOrigin, offset: i64) -> Result<usize, KernelError> {
        let base = match origin {
            SeekOrigin::Start => 0i64,
            SeekOrigin::Current => self.cursor as i64,
            SeekOrigin::End => self.size() as i64,
        };
        let new_pos = base + offset;
        if new_pos < 0 {
            return Err(KernelError::InvalidArgument);
        }
        self.cursor = new_pos as usize;
        Ok(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_with_create_then_write_then_read_round_trips() {
        let mut f = OpenFile::open("/x", OpenMode::READ | OpenMode::WRITE | OpenMode::CREATE).unwrap();
        assert_eq!(f.write(b"hello").unwrap(), 5);
        f.seek(SeekOrigin::Start, 0).unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(f.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn open_missing_file_without_create_fails() {
        assert!(OpenFile::open("/does-not-exist", OpenMode::READ).is_err());
    }

    #[test]
    fn seek_from_end_then_read_reaches_expected_remainder() {
        let mut f = OpenFile::open("/y", OpenMode::READ | OpenMode::WRITE | OpenMode::CREATE).unwrap();
        f.write(b"0123456789").unwrap();
        f.seek(SeekOrigin::End, -3).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(f.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"789");
    }

    #[test]
    fn write_without_write_mode_is_permission_denied() {
        let mut f = OpenFile::open("/z", OpenMode::READ | OpenMode::CREATE).unwrap();
        assert_eq!(f.write(b"x").unwrap_err(), KernelError::PermissionDenied);
    }
}
