//! Message codes and the `Message` struct (spec §3, §6).

use crate::kobj::handle::Handle;
use crate::process::ids::TaskId;

pub type MessageCode = u32;

// Task messages (spec §6).
pub const ETM_NONE: MessageCode = 0;
pub const ETM_QUIT: MessageCode = 1;
pub const ETM_CREATE: MessageCode = 2;
pub const ETM_DELETE: MessageCode = 3;
pub const ETM_PAUSE: MessageCode = 4;
pub const ETM_USER: MessageCode = 0x2000_0000;

// Window messages.
pub const EWM_NONE: MessageCode = 0x4000_0000;
pub const EWM_CREATE: MessageCode = 0x4000_0001;
pub const EWM_DELETE: MessageCode = 0x4000_0002;
pub const EWM_SHOW: MessageCode = 0x4000_0003;
pub const EWM_HIDE: MessageCode = 0x4000_0004;
pub const EWM_MOVE: MessageCode = 0x4000_0005;
pub const EWM_MOVING: MessageCode = 0x4000_0006;
pub const EWM_SIZE: MessageCode = 0x4000_0007;
pub const EWM_SIZING: MessageCode = 0x4000_0008;
pub const EWM_DRAW: MessageCode = 0x4000_0009;
pub const EWM_KEYDOWN: MessageCode = 0x4000_000A;
pub const EWM_KEYUP: MessageCode = 0x4000_000B;
pub const EWM_MOUSEMOVE: MessageCode = 0x4000_000C;
pub const EWM_MOUSEDOWN: MessageCode = 0x4000_000D;
pub const EWM_MOUSEUP: MessageCode = 0x4000_000E;
pub const EWM_COMMAND: MessageCode = 0x4000_000F;
pub const EWM_NOTIFY: MessageCode = 0x4000_0010;
pub const EWM_GOTFOCUS: MessageCode = 0x4000_0011;
pub const EWM_LOSTFOCUS: MessageCode = 0x4000_0012;

pub const EM_USER: MessageCode = 0x6000_0000;

/// Target of a message: the current task, an explicit task, or a window.
#[repr(C, u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    CurrentTask,
    Task(TaskId),
    /// A window handle; resolved to its owning task by `msg::router`
    /// (spec §4.7's "find the owning task through the desktop tree").
    Window(Handle),
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Message {
    pub target: Target,
    pub time_ms: u64,
    pub code: MessageCode,
    pub param1: u32,
    pub param2: u32,
}

impl Message {
    pub fn new(target: Target, time_ms: u64, code: MessageCode, param1: u32, param2: u32) -> Self {
        Self {
            target,
            time_ms,
            code,
            param1,
            param2,
        }
    }

    pub fn is_draw_for(&self, window: Handle) -> bool {
        self.code == EWM_DRAW && matches!(self.target, Target::Window(w) if w == window)
    }
}
