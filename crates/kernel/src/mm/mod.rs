//! Virtual memory and paging: physical frame allocation, the i386 page
//! table format, and per-process address spaces (spec §4.1, §4.2).

pub mod bitmap;
pub mod fault;
pub mod page;
pub mod pagetable;
pub mod region;

use spin::Mutex;

use self::bitmap::FrameBitmap;

/// Process-wide physical frame allocator, serialized by `MUTEX_MEMORY`
/// (spec §5's "the kernel heap and page bitmap are process-wide
/// singletons under MUTEX_MEMORY").
pub static FRAME_BITMAP: Mutex<FrameBitmap> = Mutex::new(FrameBitmap::new());

/// Initializes the physical frame allocator with the usable RAM size
/// discovered from the bootloader memory map.
pub fn init(total_frames: usize) {
    FRAME_BITMAP.lock().init(total_frames);
    crate::info!("[MM] {} frames tracked ({} KiB)", total_frames, total_frames * page::PAGE_SIZE / 1024);
}
