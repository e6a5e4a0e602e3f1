//! Stable syscall numbers (spec §4.8, §6). Grounded verbatim on
//! `original_source/kernel/source/User.h`'s `SYSCALL_*` table; values are
//! part of the user ABI and must never be renumbered.

pub type SyscallNumber = u32;

// Base services: 0x00..0x2E.
pub const GET_VERSION: SyscallNumber = 0x00;
pub const GET_SYSTEM_INFO: SyscallNumber = 0x01;
pub const GET_LAST_ERROR: SyscallNumber = 0x02;
pub const SET_LAST_ERROR: SyscallNumber = 0x03;
pub const GET_SYSTEM_TIME: SyscallNumber = 0x04;
pub const GET_LOCAL_TIME: SyscallNumber = 0x05;
pub const SET_LOCAL_TIME: SyscallNumber = 0x06;
pub const DELETE_OBJECT: SyscallNumber = 0x07;
pub const CREATE_PROCESS: SyscallNumber = 0x08;
pub const KILL_PROCESS: SyscallNumber = 0x09;
pub const CREATE_TASK: SyscallNumber = 0x0A;
pub const KILL_TASK: SyscallNumber = 0x0B;
pub const SUSPEND_TASK: SyscallNumber = 0x0C;
pub const RESUME_TASK: SyscallNumber = 0x0D;
pub const SLEEP: SyscallNumber = 0x0E;
pub const POST_MESSAGE: SyscallNumber = 0x0F;
pub const SEND_MESSAGE: SyscallNumber = 0x10;
pub const PEEK_MESSAGE: SyscallNumber = 0x11;
pub const GET_MESSAGE: SyscallNumber = 0x12;
pub const DISPATCH_MESSAGE: SyscallNumber = 0x13;
pub const CREATE_SEMAPHORE: SyscallNumber = 0x14;
pub const LOCK_SEMAPHORE: SyscallNumber = 0x15;
pub const UNLOCK_SEMAPHORE: SyscallNumber = 0x16;
pub const VIRTUAL_ALLOC: SyscallNumber = 0x17;
pub const VIRTUAL_FREE: SyscallNumber = 0x18;
pub const GET_PROCESS_HEAP: SyscallNumber = 0x19;
pub const HEAP_ALLOC: SyscallNumber = 0x1A;
pub const HEAP_FREE: SyscallNumber = 0x1B;
pub const ENUM_VOLUMES: SyscallNumber = 0x1C;
pub const GET_VOLUME_INFO: SyscallNumber = 0x1D;
pub const OPEN_FILE: SyscallNumber = 0x1E;
pub const READ_FILE: SyscallNumber = 0x1F;
pub const WRITE_FILE: SyscallNumber = 0x20;
pub const GET_FILE_SIZE: SyscallNumber = 0x21;
pub const GET_FILE_POINTER: SyscallNumber = 0x22;
pub const SET_FILE_POINTER: SyscallNumber = 0x23;
pub const FIND_FIRST_FILE: SyscallNumber = 0x24;
pub const FIND_NEXT_FILE: SyscallNumber = 0x25;
pub const CREATE_FILE_MAPPING: SyscallNumber = 0x26;
pub const OPEN_FILE_MAPPING: SyscallNumber = 0x27;
pub const MAP_VIEW_OF_FILE: SyscallNumber = 0x28;
pub const UNMAP_VIEW_OF_FILE: SyscallNumber = 0x29;
pub const CONSOLE_PEEK_KEY: SyscallNumber = 0x2A;
pub const CONSOLE_GET_KEY: SyscallNumber = 0x2B;
pub const CONSOLE_PRINT: SyscallNumber = 0x2C;
pub const CONSOLE_GET_STRING: SyscallNumber = 0x2D;
pub const CONSOLE_GOTO_XY: SyscallNumber = 0x2E;

// Windowing services: 0x40..0x69. The desktop/window manager that would
// back these is outside this core's scope (spec.md's window-system
// surface is a collaborator, not a core subsystem); numbers are kept
// stable for ABI completeness and uniformly dispatch to `ENOSYS`.
pub const CREATE_DESKTOP: SyscallNumber = 0x40;
pub const SHOW_DESKTOP: SyscallNumber = 0x41;
pub const GET_DESKTOP_WINDOW: SyscallNumber = 0x42;
pub const CREATE_WINDOW: SyscallNumber = 0x43;
pub const SHOW_WINDOW: SyscallNumber = 0x44;
pub const HIDE_WINDOW: SyscallNumber = 0x45;
pub const MOVE_WINDOW: SyscallNumber = 0x46;
pub const SIZE_WINDOW: SyscallNumber = 0x47;
pub const SET_WINDOW_FUNC: SyscallNumber = 0x48;
pub const GET_WINDOW_FUNC: SyscallNumber = 0x49;
pub const SET_WINDOW_STYLE: SyscallNumber = 0x4A;
pub const GET_WINDOW_STYLE: SyscallNumber = 0x4B;
pub const SET_WINDOW_PROP: SyscallNumber = 0x4C;
pub const GET_WINDOW_PROP: SyscallNumber = 0x4D;
pub const GET_WINDOW_RECT: SyscallNumber = 0x4E;
pub const INVALIDATE_WINDOW_RECT: SyscallNumber = 0x4F;
pub const GET_WINDOW_GC: SyscallNumber = 0x50;
pub const RELEASE_WINDOW_GC: SyscallNumber = 0x51;
pub const ENUM_WINDOWS: SyscallNumber = 0x52;
pub const DEF_WINDOW_FUNC: SyscallNumber = 0x53;
pub const GET_SYSTEM_BRUSH: SyscallNumber = 0x54;
pub const GET_SYSTEM_PEN: SyscallNumber = 0x55;
pub const CREATE_BRUSH: SyscallNumber = 0x56;
pub const CREATE_PEN: SyscallNumber = 0x57;
pub const SELECT_BRUSH: SyscallNumber = 0x58;
pub const SELECT_PEN: SyscallNumber = 0x59;
pub const SET_PIXEL: SyscallNumber = 0x5A;
pub const GET_PIXEL: SyscallNumber = 0x5B;
pub const LINE: SyscallNumber = 0x5C;
pub const RECTANGLE: SyscallNumber = 0x5D;
pub const CREATE_RECT_REGION: SyscallNumber = 0x5E;
pub const CREATE_POLY_REGION: SyscallNumber = 0x5F;
pub const MOVE_REGION: SyscallNumber = 0x60;
pub const COMBINE_REGION: SyscallNumber = 0x61;
pub const GET_MOUSE_POS: SyscallNumber = 0x62;
pub const SET_MOUSE_POS: SyscallNumber = 0x63;
pub const GET_MOUSE_BUTTONS: SyscallNumber = 0x64;
pub const SHOW_MOUSE: SyscallNumber = 0x65;
pub const HIDE_MOUSE: SyscallNumber = 0x66;
pub const CLIP_MOUSE: SyscallNumber = 0x67;
pub const CAPTURE_MOUSE: SyscallNumber = 0x68;
pub const RELEASE_MOUSE: SyscallNumber = 0x69;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_service_range_matches_spec() {
        assert_eq!(GET_VERSION, 0x00);
        assert_eq!(CONSOLE_GOTO_XY, 0x2E);
    }

    #[test]
    fn windowing_range_matches_spec() {
        assert_eq!(CREATE_DESKTOP, 0x40);
        assert_eq!(RELEASE_MOUSE, 0x69);
    }
}
