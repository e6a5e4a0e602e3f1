//! Message delivery and focus-aware input routing (spec §4.7).
//!
//! `PostMessage`/`SendMessage`/`PeekMessage`/`GetMessage`/`WaitForMessage`/
//! `DispatchMessage`/`BroadcastProcessMessage` are grounded on
//! `original_source/kernel/source/process/Task-Messaging.c`. The full
//! desktop/window tree (an arena of window nodes, per spec §9's "Design
//! Notes" on breaking the task↔process↔desktop↔window cycle) is outside
//! this core's window-system scope; a window target is resolved through
//! [`WINDOW_OWNERS`], a flat handle-to-task map populated by whatever
//! owns windows, the same reduced-fidelity substitute the rest of this
//! core uses wherever a full window manager would otherwise sit.
//!
//! The public `post_message`/`peek_message`/`get_message`/... entry
//! points lock [`SCHEDULER`] and [`PROCESSES`]; the `_in` functions they
//! delegate to take an explicit `&mut Scheduler`/`&mut ProcessTable` so
//! they can be exercised against throwaway local state in tests, the
//! same way `sched::scheduler`'s own tests never touch its global
//! `SCHEDULER` static.

use alloc::collections::BTreeMap;

use spin::Mutex as SpinMutex;

use crate::kobj::handle::Handle;
use crate::msg::message::{Message, MessageCode, Target, ETM_QUIT};
use crate::process::ids::{ProcessId, TaskId};
use crate::process::table::{ProcessTable, PROCESSES};
use crate::process::task::Status;
use crate::sched::scheduler::{Scheduler, SCHEDULER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    Task(TaskId),
    Process(ProcessId),
    Dropped,
}

/// The subset of focus state `EnqueueInputMessage` consults.
#[derive(Debug, Clone, Copy)]
pub struct FocusState {
    /// The task that owns the desktop's currently focused window, if any.
    pub focused_window_task: Option<TaskId>,
    /// The process that owns the focused window's task.
    pub focused_window_process: Option<ProcessId>,
    /// The process considered "focused" at the desktop level even with
    /// no focused window (e.g. a console-only process).
    pub focused_process: Option<ProcessId>,
    /// The process actually holding input focus right now.
    pub active_process: ProcessId,
}

/// Resolves where an input message should go: the focused window's task
/// if the focused window belongs to the focused process; otherwise the
/// focused process's queue if it has one; otherwise the message is
/// dropped.
pub fn route_input(focus: &FocusState) -> RouteTarget {
    if let (Some(task), Some(owning_process)) = (focus.focused_window_task, focus.focused_window_process) {
        if owning_process == focus.active_process {
            return RouteTarget::Task(task);
        }
    }

    if let Some(process) = focus.focused_process {
        return RouteTarget::Process(process);
    }

    RouteTarget::Dropped
}

/// Window handle -> owning task, populated by whoever creates windows.
/// `post_message`/`send_message` consult this to resolve a
/// [`Target::Window`] the way the original walks the window's process's
/// desktop tree to find its owning task.
static WINDOW_OWNERS: SpinMutex<BTreeMap<Handle, TaskId>> = SpinMutex::new(BTreeMap::new());

pub fn register_window(window: Handle, owner: TaskId) {
    WINDOW_OWNERS.lock().insert(window, owner);
}

pub fn unregister_window(window: Handle) {
    WINDOW_OWNERS.lock().remove(&window);
}

pub fn window_owner(window: Handle) -> Option<TaskId> {
    WINDOW_OWNERS.lock().get(&window).copied()
}

/// A window's synchronous message handler (spec §4.7 `SendMessage`):
/// one entry point returning a result code, the same shape
/// `driver::Driver::commands` gives every device driver.
pub trait WindowProc: Send {
    fn handle(&mut self, code: MessageCode, param1: u32, param2: u32) -> u32;
}

const MAX_WINDOWS: usize = 64;

struct WindowProcEntry {
    window: Handle,
    proc: &'static mut dyn WindowProc,
}

static WINDOW_PROCS: SpinMutex<heapless::Vec<WindowProcEntry, MAX_WINDOWS>> = SpinMutex::new(heapless::Vec::new());

/// Registers `proc` as `window`'s synchronous message handler. Returns
/// `Err(())` if the registry is full.
pub fn register_window_proc(window: Handle, proc: &'static mut dyn WindowProc) -> Result<(), ()> {
    WINDOW_PROCS
        .lock()
        .push(WindowProcEntry { window, proc })
        .map_err(|_| ())
}

/// Posts directly to `id`'s task queue and wakes it if it was waiting.
fn post_to_task_in(sched: &mut Scheduler, id: TaskId, target: Target, now_ms: u64, code: MessageCode, param1: u32, param2: u32) -> bool {
    let posted = match sched.task_mut(id) {
        Some(task) => {
            let msg = Message::new(target, now_ms, code, param1, param2);
            task.messages.post(msg).is_ok()
        }
        None => return false,
    };
    if posted {
        sched.wake(id);
        if let Some(task) = sched.task_mut(id) {
            task.messages.set_waiting(false);
        }
    }
    posted
}

fn post_to_process_in(table: &mut ProcessTable, pid: ProcessId, now_ms: u64, code: MessageCode, param1: u32, param2: u32) -> bool {
    match table.get_mut(pid) {
        Some(process) => {
            let msg = Message::new(Target::CurrentTask, now_ms, code, param1, param2);
            process.messages.post(msg).is_ok()
        }
        None => false,
    }
}

fn post_message_in(sched: &mut Scheduler, target: Target, code: MessageCode, param1: u32, param2: u32) -> bool {
    let now_ms = sched.now_ms();
    match target {
        Target::CurrentTask => match sched.current() {
            Some(id) => post_to_task_in(sched, id, target, now_ms, code, param1, param2),
            None => false,
        },
        Target::Task(id) => post_to_task_in(sched, id, target, now_ms, code, param1, param2),
        Target::Window(window) => match window_owner(window) {
            Some(id) => post_to_task_in(sched, id, target, now_ms, code, param1, param2),
            None => false,
        },
    }
}

/// `PostMessage`: asynchronous, always returns immediately. `NULL` target
/// ([`Target::CurrentTask`]) goes to the caller's own task; an explicit
/// [`Target::Task`] goes straight to that task's queue; a
/// [`Target::Window`] is resolved to its owning task through
/// [`WINDOW_OWNERS`] (falls through to dropping the message if the
/// window is unknown, mirroring the original's "window not found" path).
pub fn post_message(target: Target, code: MessageCode, param1: u32, param2: u32) -> bool {
    post_message_in(&mut SCHEDULER.lock(), target, code, param1, param2)
}

/// `SendMessage`: only meaningful for window targets. Synchronously
/// invokes the window's registered [`WindowProc`] under the window
/// registry's lock and returns its result; `None` if no handler is
/// registered for `window` (there is no send-to-task form: sending to a
/// task with no message-loop concept of "reply" doesn't apply here).
pub fn send_message(window: Handle, code: MessageCode, param1: u32, param2: u32) -> Option<u32> {
    let mut procs = WINDOW_PROCS.lock();
    let entry = procs.iter_mut().find(|e| e.window == window)?;
    Some(entry.proc.handle(code, param1, param2))
}

fn broadcast_process_message_in(table: &mut ProcessTable, now_ms: u64, code: MessageCode, param1: u32, param2: u32) -> bool {
    let ids = table.user_process_ids();
    let mut any = false;
    for pid in ids {
        if post_to_process_in(table, pid, now_ms, code, param1, param2) {
            any = true;
        }
    }
    any
}

/// `BroadcastProcessMessage`: posts to every live user process's queue
/// (the kernel process is excluded). Returns `true` if at least one
/// process accepted it.
pub fn broadcast_process_message(code: MessageCode, param1: u32, param2: u32) -> bool {
    let now_ms = SCHEDULER.lock().now_ms();
    broadcast_process_message_in(&mut PROCESSES.lock(), now_ms, code, param1, param2)
}

fn peek_message_in(sched: &Scheduler, table: &ProcessTable) -> Option<Message> {
    let current = sched.current()?;
    let owner = sched.task(current)?.owner_process;
    if let Some(msg) = table.get(owner).and_then(|p| p.messages.peek().copied()) {
        return Some(msg);
    }
    sched.task(current)?.messages.peek().copied()
}

/// `PeekMessage`: returns the current task's next pending message
/// without removing it. Checks its owning process's queue first, then
/// its own task queue (the same preference order [`get_message`] uses).
pub fn peek_message() -> Option<Message> {
    peek_message_in(&SCHEDULER.lock(), &PROCESSES.lock())
}

fn get_message_in(sched: &mut Scheduler, table: &mut ProcessTable) -> Option<Message> {
    let current = sched.current()?;
    let owner = sched.task(current)?.owner_process;

    if let Some(process) = table.get_mut(owner) {
        if let Some(msg) = process.messages.get() {
            return Some(msg);
        }
    }

    let task = sched.task_mut(current)?;
    let msg = task.messages.get();
    if msg.is_some() {
        task.messages.set_waiting(false);
    }
    msg
}

/// `GetMessage`: removes and returns the current task's next message,
/// preferring its owning process's queue over its own. `None` if both
/// are empty (the caller is expected to call [`wait_for_message`] in
/// that case).
pub fn get_message() -> Option<Message> {
    get_message_in(&mut SCHEDULER.lock(), &mut PROCESSES.lock())
}

fn wait_for_message_in(sched: &mut Scheduler) {
    if let Some(id) = sched.current() {
        if let Some(task) = sched.task_mut(id) {
            task.status = Status::WaitMessage;
            task.messages.set_waiting(true);
        }
    }
}

/// `WaitForMessage`: transitions the current task to `WAITMESSAGE`.
/// [`post_message`]/[`broadcast_process_message`] wake it again once a
/// message arrives, the same way a sleeping task is promoted back to
/// `READY` (spec §4.5's status-transition invariant: only the running
/// task itself ever leaves `RUNNING`, which is exactly the caller here).
pub fn wait_for_message() {
    wait_for_message_in(&mut SCHEDULER.lock());
}

/// `DispatchMessage`: forwards a window-targeted message to its
/// registered [`WindowProc`] (discarding the result — this is the
/// fire-and-forget dispatch step of a message loop, not [`send_message`]
/// itself). Returns `false` iff `msg` is [`ETM_QUIT`], the message-loop
/// exit signal.
pub fn dispatch_message(msg: &Message) -> bool {
    if msg.code == ETM_QUIT {
        return false;
    }
    if let Target::Window(window) = msg.target {
        send_message(window, msg.code, msg.param1, msg.param2);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::message::EWM_DRAW;
    use crate::process::task::Priority;
    use alloc::string::ToString;

    #[test]
    fn routes_to_focused_window_task_when_owned_by_focused_process() {
        let focus = FocusState {
            focused_window_task: Some(TaskId(3)),
            focused_window_process: Some(ProcessId(1)),
            focused_process: Some(ProcessId(1)),
            active_process: ProcessId(1),
        };
        assert_eq!(route_input(&focus), RouteTarget::Task(TaskId(3)));
    }

    #[test]
    fn falls_back_to_focused_process_when_window_owned_elsewhere() {
        let focus = FocusState {
            focused_window_task: Some(TaskId(3)),
            focused_window_process: Some(ProcessId(2)),
            focused_process: Some(ProcessId(1)),
            active_process: ProcessId(1),
        };
        assert_eq!(route_input(&focus), RouteTarget::Process(ProcessId(1)));
    }

    #[test]
    fn drops_when_nothing_is_focused() {
        let focus = FocusState {
            focused_window_task: None,
            focused_window_process: None,
            focused_process: None,
            active_process: ProcessId(1),
        };
        assert_eq!(route_input(&focus), RouteTarget::Dropped);
    }

    #[test]
    fn post_to_current_task_then_get_message_round_trips() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        let current = sched.create_task(ProcessId(2), Priority::Medium, 0, "a");
        sched.tick();
        assert_eq!(sched.current(), Some(current));

        assert!(post_message_in(&mut sched, Target::CurrentTask, EWM_DRAW, 7, 9));
        let got = get_message_in(&mut sched, &mut table).unwrap();
        assert_eq!(got.code, EWM_DRAW);
        assert_eq!((got.param1, got.param2), (7, 9));
        assert!(get_message_in(&mut sched, &mut table).is_none());
    }

    #[test]
    fn process_queue_is_drained_before_task_queue() {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        let (pid, main_task) = table.create_process(&mut sched, "p".to_string(), Priority::Medium, 0);
        sched.tick();
        assert_eq!(sched.current(), Some(main_task));

        post_to_task_in(&mut sched, main_task, Target::CurrentTask, 0, 0x1234, 1, 1);
        post_to_process_in(&mut table, pid, 0, 0x5678, 2, 2);

        let first = get_message_in(&mut sched, &mut table).unwrap();
        assert_eq!(first.code, 0x5678);
        let second = get_message_in(&mut sched, &mut table).unwrap();
        assert_eq!(second.code, 0x1234);
    }

    #[test]
    fn broadcast_reaches_every_user_process_but_not_kernel() {
        let mut table = ProcessTable::new();
        let mut sched = Scheduler::new();
        let (a, _) = table.create_process(&mut sched, "a".to_string(), Priority::Medium, 0);
        let (b, _) = table.create_process(&mut sched, "b".to_string(), Priority::Medium, 0);
        assert!(broadcast_process_message_in(&mut table, 0, 0x9999, 0, 0));
        assert_eq!(table.get_mut(a).unwrap().messages.get().unwrap().code, 0x9999);
        assert_eq!(table.get_mut(b).unwrap().messages.get().unwrap().code, 0x9999);
    }

    #[test]
    fn wait_for_message_parks_the_current_task() {
        let mut sched = Scheduler::new();
        let current = sched.create_task(ProcessId(2), Priority::Medium, 0, "a");
        sched.tick();
        wait_for_message_in(&mut sched);
        assert_eq!(sched.task(current).unwrap().status, Status::WaitMessage);
    }

    #[test]
    fn posting_to_a_waiting_task_wakes_it() {
        let mut sched = Scheduler::new();
        let current = sched.create_task(ProcessId(2), Priority::Medium, 0, "a");
        sched.tick();
        wait_for_message_in(&mut sched);
        assert!(post_message_in(&mut sched, Target::Task(current), EWM_DRAW, 0, 0));
        assert_eq!(sched.task(current).unwrap().status, Status::Ready);
        assert!(!sched.task(current).unwrap().messages.is_waiting());
    }

    #[test]
    fn dispatch_message_returns_false_on_quit() {
        let quit = Message::new(Target::CurrentTask, 0, ETM_QUIT, 0, 0);
        assert!(!dispatch_message(&quit));
    }

    #[test]
    fn window_target_with_no_registered_owner_is_dropped() {
        let mut sched = Scheduler::new();
        let window = Handle(0xF00D);
        assert!(!post_message_in(&mut sched, Target::Window(window), EWM_DRAW, 0, 0));
    }

    #[test]
    fn post_to_window_reaches_its_owning_task() {
        let mut sched = Scheduler::new();
        let owner = sched.create_task(ProcessId(2), Priority::Medium, 0, "owner");

        let window = Handle(0xBEEF);
        register_window(window, owner);
        assert!(post_message_in(&mut sched, Target::Window(window), EWM_DRAW, 1, 2));
        assert_eq!(sched.task_mut(owner).unwrap().messages.get().unwrap().code, EWM_DRAW);
        unregister_window(window);
    }
}
