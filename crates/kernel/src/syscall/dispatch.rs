//! Syscall dispatch (spec §4.8, §6): one entry point, `dispatch`, the
//! same `(Number, Parameter)` shape [`crate::driver::dispatch`] uses for
//! driver calls. `Parameter` is either an inline scalar or a `LINEAR`
//! pointer to a fixed `#[repr(C)]` struct, interpreted according to
//! `number` exactly the way `DriverParameter` is interpreted according
//! to `Function` (see `crate::driver`'s doc comment).
//!
//! Struct parameters embed [`ParamHeader`] as their first field and are
//! validated through [`read_param`], the Rust equivalent of
//! `original_source/kernel/include/Base.h`'s `SAFE_USE_INPUT_POINTER`:
//! non-null, resident in the calling task's address space, and
//! `Header.size` at least as large as the struct being read.
//!
//! Each handler locks [`PROCESSES`] itself to reach the calling task's
//! [`AddressSpace`] for the duration of its pointer reads, then drops
//! the guard before touching anything that needs its own lock — the
//! same discipline [`crate::msg::router`]'s `_in` helpers use to avoid
//! holding two named mutexes at once out of order (spec §5).

use alloc::string::String;
use alloc::vec::Vec;

use alloc::sync::Arc;
use spin::Mutex as SpinMutex;

use crate::fileio::file::{OpenFile, OpenMode, SeekOrigin};
use crate::kobj::handle::Handle;
use crate::kobj::header::ObjectType;
use crate::kobj::HANDLES;
use crate::lib::error::Errno;
use crate::mm::region::{AddressSpace, RegionFlags};
use crate::mm::FRAME_BITMAP;
use crate::msg::message::{Message, MessageCode, Target};
use crate::msg::router;
use crate::process::ids::{ProcessId, TaskId};
use crate::process::table::{ProcessTable, PROCESSES};
use crate::process::task::Priority;
use crate::sched::scheduler::SCHEDULER;
use crate::sync::Semaphore;
use crate::syscall::numbers::*;
use crate::time;

/// A `LINEAR` value: either a pointer to a `#[repr(C)]` parameter struct
/// or an inline scalar, depending on `number` — exactly
/// [`crate::driver::DriverParameter`]'s contract.
pub type SyscallParameter = usize;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ParamHeader {
    pub size: u32,
    pub version: u32,
}

/// Validates and copies a fixed-size parameter struct out of user
/// memory. `T` must start with a [`ParamHeader`] whose `size` is at
/// least `size_of::<T>()` — the `SAFE_USE_INPUT_POINTER` discipline,
/// applied by value instead of by reference since nothing about a
/// syscall parameter is allowed to outlive the call.
///
/// # Safety
/// `parameter` must either be zero (rejected) or a pointer the caller
/// received from user space; this reads `size_of::<T>()` bytes from it
/// without any further hardware-level fault recovery.
unsafe fn read_param<T: Copy>(parameter: SyscallParameter, space: &AddressSpace) -> Result<T, Errno> {
    if parameter == 0 {
        return Err(Errno::EFAULT);
    }
    let linear = parameter as u32;
    if !space.is_valid(linear) {
        return Err(Errno::EFAULT);
    }
    let header = &*(parameter as *const ParamHeader);
    if (header.size as usize) < core::mem::size_of::<T>() {
        return Err(Errno::EINVAL);
    }
    Ok(core::ptr::read(parameter as *const T))
}

/// Copies `len` bytes out of a user-supplied buffer. Only the starting
/// address is residency-checked (spec §9's Open Question on partial
/// mappings — see DESIGN.md); a buffer straddling an unmapped page
/// faults at the hardware level rather than here.
///
/// # Safety
/// `ptr` must be a user-supplied address; this reads `len` bytes from it.
unsafe fn read_user_bytes(ptr: u32, len: u32, space: &AddressSpace) -> Result<Vec<u8>, Errno> {
    if ptr == 0 {
        return Err(Errno::EFAULT);
    }
    if !space.is_valid(ptr) {
        return Err(Errno::EFAULT);
    }
    let slice = core::slice::from_raw_parts(ptr as *const u8, len as usize);
    Ok(slice.to_vec())
}

/// Copies `data` back into a user-supplied buffer.
///
/// # Safety
/// `ptr` must be a user-supplied address with at least `data.len()`
/// writable bytes behind it.
unsafe fn write_user_bytes(ptr: u32, data: &[u8], space: &AddressSpace) -> Result<(), Errno> {
    if ptr == 0 {
        return Err(Errno::EFAULT);
    }
    if !space.is_valid(ptr) {
        return Err(Errno::EFAULT);
    }
    core::ptr::copy_nonoverlapping(data.as_ptr(), ptr as *mut u8, data.len());
    Ok(())
}

fn current_task_and_owner() -> Result<(TaskId, ProcessId), Errno> {
    let sched = SCHEDULER.lock();
    let id = sched.current().ok_or(Errno::ESRCH)?;
    let owner = sched.task(id).ok_or(Errno::ESRCH)?.owner_process;
    Ok((id, owner))
}

fn address_space_of<'a>(table: &'a ProcessTable, owner: ProcessId) -> Result<&'a AddressSpace, Errno> {
    table.get(owner).map(|p| &p.address_space).ok_or(Errno::ESRCH)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CreateProcessParams {
    header: ParamHeader,
    command_line_ptr: u32,
    command_line_len: u32,
    priority: u32,
    entry: u32,
}

fn priority_from_u32(raw: u32) -> Priority {
    match raw {
        0 => Priority::Idle,
        1 => Priority::Low,
        2 => Priority::Medium,
        3 => Priority::High,
        4 => Priority::Higher,
        _ => Priority::Critical,
    }
}

/// `CreateProcess`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`CreateProcessParams`].
unsafe fn sys_create_process(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let (params, command_line) = {
        let table = PROCESSES.lock();
        let space = address_space_of(&table, owner)?;
        let params: CreateProcessParams = read_param(parameter, space)?;
        let command_line = read_user_bytes(params.command_line_ptr, params.command_line_len, space)?;
        (params, command_line)
    };
    let command_line = String::from_utf8(command_line).map_err(|_| Errno::EINVAL)?;

    let mut sched = SCHEDULER.lock();
    let mut table = PROCESSES.lock();
    let (pid, _main_task) = table.create_process(&mut sched, command_line, priority_from_u32(params.priority), params.entry);
    Ok(pid.0 as isize)
}

fn sys_kill_process(parameter: SyscallParameter) -> Result<isize, Errno> {
    let pid = ProcessId(parameter as u32);
    if PROCESSES.lock().kill_process(pid) {
        Ok(0)
    } else {
        Err(Errno::EBUSY)
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CreateTaskParams {
    header: ParamHeader,
    owner_pid: u32,
    priority: u32,
    entry: u32,
}

/// `CreateTask`. New tasks are always named `"user"` — unlike
/// `Process::command_line`, [`crate::process::task::Task::name`] is a
/// `&'static str`, so a name supplied from user memory would need to be
/// leaked for the task's lifetime; not worth it for a diagnostic label.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`CreateTaskParams`].
unsafe fn sys_create_task(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: CreateTaskParams = {
        let table = PROCESSES.lock();
        let space = address_space_of(&table, owner)?;
        read_param(parameter, space)?
    };

    let mut sched = SCHEDULER.lock();
    let mut table = PROCESSES.lock();
    let task = table.create_task(&mut sched, ProcessId(params.owner_pid), priority_from_u32(params.priority), params.entry, "user");
    task.map(|t| t.0 as isize).ok_or(Errno::ESRCH)
}

fn sys_kill_task(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let mut sched = SCHEDULER.lock();
    let mut table = PROCESSES.lock();
    table.kill_task(&mut sched, owner, TaskId(parameter as u32));
    Ok(0)
}

fn sys_suspend_task(parameter: SyscallParameter) -> Result<isize, Errno> {
    SCHEDULER.lock().suspend(TaskId(parameter as u32));
    Ok(0)
}

fn sys_resume_task(parameter: SyscallParameter) -> Result<isize, Errno> {
    SCHEDULER.lock().wake(TaskId(parameter as u32));
    Ok(0)
}

fn sys_sleep(parameter: SyscallParameter) -> Result<isize, Errno> {
    let id = current_task_and_owner()?.0;
    SCHEDULER.lock().sleep_task(id, parameter as u32);
    Ok(0)
}

fn sys_get_last_error() -> Result<isize, Errno> {
    let id = current_task_and_owner()?.0;
    let sched = SCHEDULER.lock();
    Ok(sched.task(id).ok_or(Errno::ESRCH)?.last_error as isize)
}

fn sys_set_last_error(parameter: SyscallParameter) -> Result<isize, Errno> {
    let id = current_task_and_owner()?.0;
    let mut sched = SCHEDULER.lock();
    sched.task_mut(id).ok_or(Errno::ESRCH)?.last_error = parameter as u32;
    Ok(0)
}

fn sys_delete_object(parameter: SyscallParameter) -> Result<isize, Errno> {
    if HANDLES.remove(Handle(parameter as u32)) {
        Ok(0)
    } else {
        Err(Errno::EINVAL)
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct CreateSemaphoreParams {
    header: ParamHeader,
    initial_count: u32,
    max_count: u32,
}

/// `CreateSemaphore`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`CreateSemaphoreParams`].
unsafe fn sys_create_semaphore(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: CreateSemaphoreParams = {
        let table = PROCESSES.lock();
        let space = address_space_of(&table, owner)?;
        read_param(parameter, space)?
    };
    let sem = Arc::new(Semaphore::new(params.initial_count, params.max_count));
    let handle = HANDLES.insert(ObjectType::Semaphore, sem);
    Ok(handle.0 as isize)
}

fn sys_lock_semaphore(parameter: SyscallParameter) -> Result<isize, Errno> {
    let sem = HANDLES.get::<Semaphore>(Handle(parameter as u32)).ok_or(Errno::EINVAL)?;
    sem.lock();
    Ok(0)
}

fn sys_unlock_semaphore(parameter: SyscallParameter) -> Result<isize, Errno> {
    let sem = HANDLES.get::<Semaphore>(Handle(parameter as u32)).ok_or(Errno::EINVAL)?;
    Ok(sem.unlock() as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct VirtualAllocParams {
    header: ParamHeader,
    hint: u32,
    size: u32,
    flags: u32,
}

/// `VirtualAlloc`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`VirtualAllocParams`].
unsafe fn sys_virtual_alloc(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let mut table = PROCESSES.lock();
    let params: VirtualAllocParams = read_param(parameter, address_space_of(&table, owner)?)?;
    let flags = RegionFlags::from_bits_truncate(params.flags);
    let mut frames = FRAME_BITMAP.lock();
    let process = table.get_mut(owner).ok_or(Errno::ESRCH)?;
    let base = process
        .address_space
        .alloc_region(params.hint, params.size, flags, &mut frames)
        .map_err(|_| Errno::ENOMEM)?;
    Ok(base as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct VirtualFreeParams {
    header: ParamHeader,
    base: u32,
    size: u32,
}

/// `VirtualFree`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`VirtualFreeParams`].
unsafe fn sys_virtual_free(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let mut table = PROCESSES.lock();
    let params: VirtualFreeParams = read_param(parameter, address_space_of(&table, owner)?)?;
    let mut frames = FRAME_BITMAP.lock();
    let process = table.get_mut(owner).ok_or(Errno::ESRCH)?;
    process.address_space.free_region(params.base, params.size, &mut frames);
    Ok(0)
}

/// `GetProcessHeap`: EXOS has one process-wide kernel heap rather than a
/// per-process heap object (spec §4.1); this just hands back its base
/// address as the "heap handle" user code is expected to pass straight
/// through to `HeapAlloc`/`HeapFree`, which ignore it.
fn sys_get_process_heap() -> Result<isize, Errno> {
    Ok(crate::heap::HEAP_START as isize)
}

fn sys_heap_alloc(parameter: SyscallParameter) -> Result<isize, Errno> {
    let layout = core::alloc::Layout::from_size_align(parameter, 8).map_err(|_| Errno::EINVAL)?;
    let ptr = unsafe { alloc::alloc::alloc(layout) };
    if ptr.is_null() {
        Err(Errno::ENOMEM)
    } else {
        Ok(ptr as isize)
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct HeapFreeParams {
    header: ParamHeader,
    ptr: u32,
    size: u32,
}

/// `HeapFree`.
///
/// # Safety
/// `parameter` must point at a resident [`HeapFreeParams`] whose `ptr`/`size`
/// name a block this process previously received from `HeapAlloc`.
unsafe fn sys_heap_free(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let params: HeapFreeParams = read_param(parameter, address_space_of(&table, owner)?)?;
    drop(table);
    let layout = core::alloc::Layout::from_size_align(params.size as usize, 8).map_err(|_| Errno::EINVAL)?;
    alloc::alloc::dealloc(params.ptr as *mut u8, layout);
    Ok(0)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct OpenFileParams {
    header: ParamHeader,
    path_ptr: u32,
    path_len: u32,
    mode: u32,
}

/// `OpenFile`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`OpenFileParams`].
unsafe fn sys_open_file(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let (params, path_bytes) = {
        let table = PROCESSES.lock();
        let space = address_space_of(&table, owner)?;
        let params: OpenFileParams = read_param(parameter, space)?;
        let path_bytes = read_user_bytes(params.path_ptr, params.path_len, space)?;
        (params, path_bytes)
    };
    let path = core::str::from_utf8(&path_bytes).map_err(|_| Errno::EINVAL)?;
    let mode = OpenMode::from_bits_truncate(params.mode);
    let file = OpenFile::open(path, mode).map_err(|_| Errno::ENOENT)?;
    let handle = HANDLES.insert(ObjectType::File, Arc::new(SpinMutex::new(file)));
    Ok(handle.0 as isize)
}

fn open_file_handle(handle: u32) -> Result<Arc<SpinMutex<OpenFile>>, Errno> {
    HANDLES.get::<SpinMutex<OpenFile>>(Handle(handle)).ok_or(Errno::EBADF)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct ReadFileParams {
    header: ParamHeader,
    handle: u32,
    buf_ptr: u32,
    buf_len: u32,
}

/// `ReadFile`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`ReadFileParams`]
/// whose `buf_ptr` has at least `buf_len` writable bytes behind it.
unsafe fn sys_read_file(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let space = address_space_of(&table, owner)?;
    let params: ReadFileParams = read_param(parameter, space)?;
    let file = open_file_handle(params.handle)?;
    let mut buf = alloc::vec![0u8; params.buf_len as usize];
    let n = file.lock().read(&mut buf).map_err(|_| Errno::EIO)?;
    write_user_bytes(params.buf_ptr, &buf[..n], space)?;
    Ok(n as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct WriteFileParams {
    header: ParamHeader,
    handle: u32,
    buf_ptr: u32,
    buf_len: u32,
}

/// `WriteFile`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`WriteFileParams`].
unsafe fn sys_write_file(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let space = address_space_of(&table, owner)?;
    let params: WriteFileParams = read_param(parameter, space)?;
    let buf = read_user_bytes(params.buf_ptr, params.buf_len, space)?;
    drop(table);
    let file = open_file_handle(params.handle)?;
    let n = file.lock().write(&buf).map_err(|_| Errno::EIO)?;
    Ok(n as isize)
}

fn sys_get_file_size(parameter: SyscallParameter) -> Result<isize, Errno> {
    Ok(open_file_handle(parameter as u32)?.lock().size() as isize)
}

fn sys_get_file_pointer(parameter: SyscallParameter) -> Result<isize, Errno> {
    Ok(open_file_handle(parameter as u32)?.lock().tell() as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct SetFilePointerParams {
    header: ParamHeader,
    handle: u32,
    origin: u32,
    offset: i32,
}

/// `SetFilePointer`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`SetFilePointerParams`].
unsafe fn sys_set_file_pointer(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let params: SetFilePointerParams = read_param(parameter, address_space_of(&table, owner)?)?;
    drop(table);
    let origin = match params.origin {
        0 => SeekOrigin::Start,
        1 => SeekOrigin::Current,
        _ => SeekOrigin::End,
    };
    let file = open_file_handle(params.handle)?;
    let pos = file.lock().seek(origin, params.offset as i64).map_err(|_| Errno::EINVAL)?;
    Ok(pos as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct ConsolePrintParams {
    header: ParamHeader,
    text_ptr: u32,
    text_len: u32,
}

/// `ConsolePrint`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`ConsolePrintParams`].
unsafe fn sys_console_print(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let space = address_space_of(&table, owner)?;
    let params: ConsolePrintParams = read_param(parameter, space)?;
    let text = read_user_bytes(params.text_ptr, params.text_len, space)?;
    drop(table);
    crate::arch::x86_64::serial::serial_write(&text);
    Ok(text.len() as isize)
}

/// `ConsolePeekKey`: non-blocking, `EAGAIN` if no scancode is queued yet.
fn sys_console_peek_key() -> Result<isize, Errno> {
    crate::hid::layout::next_scancode().map(|b| b as isize).ok_or(Errno::EAGAIN)
}

/// `ConsoleGetKey`: blocks (spin-retry, the same idiom
/// [`crate::sync::mutex::Mutex::lock`] uses for a contended lock) until a
/// scancode is available.
fn sys_console_get_key() -> Result<isize, Errno> {
    loop {
        if let Some(b) = crate::hid::layout::next_scancode() {
            return Ok(b as isize);
        }
        crate::arch::x86_64::cpu::sleep_and_yield(crate::sync::mutex::RETRY_SLEEP_MS);
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct PostMessageParams {
    header: ParamHeader,
    target_kind: u32,
    target_value: u32,
    code: u32,
    param1: u32,
    param2: u32,
}

fn target_from_raw(kind: u32, value: u32) -> Target {
    match kind {
        1 => Target::Task(TaskId(value)),
        2 => Target::Window(Handle(value)),
        _ => Target::CurrentTask,
    }
}

/// `PostMessage`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`PostMessageParams`].
unsafe fn sys_post_message(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: PostMessageParams = {
        let table = PROCESSES.lock();
        read_param(parameter, address_space_of(&table, owner)?)?
    };
    let target = target_from_raw(params.target_kind, params.target_value);
    let code = params.code as MessageCode;
    Ok(router::post_message(target, code, params.param1, params.param2) as isize)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct SendMessageParams {
    header: ParamHeader,
    window: u32,
    code: u32,
    param1: u32,
    param2: u32,
}

/// `SendMessage`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`SendMessageParams`].
unsafe fn sys_send_message(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: SendMessageParams = {
        let table = PROCESSES.lock();
        read_param(parameter, address_space_of(&table, owner)?)?
    };
    router::send_message(Handle(params.window), params.code as MessageCode, params.param1, params.param2)
        .map(|r| r as isize)
        .ok_or(Errno::ENXIO)
}

#[repr(C)]
#[derive(Clone, Copy)]
struct MessageOutParams {
    header: ParamHeader,
    out_ptr: u32,
}

unsafe fn write_message_out(out_ptr: u32, msg: &Message, space: &AddressSpace) -> Result<(), Errno> {
    let bytes = core::slice::from_raw_parts((msg as *const Message) as *const u8, core::mem::size_of::<Message>());
    write_user_bytes(out_ptr, bytes, space)
}

/// `PeekMessage`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`MessageOutParams`]
/// whose `out_ptr` has room for a [`Message`].
unsafe fn sys_peek_message(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: MessageOutParams = {
        let table = PROCESSES.lock();
        read_param(parameter, address_space_of(&table, owner)?)?
    };
    match router::peek_message() {
        Some(msg) => {
            let table = PROCESSES.lock();
            write_message_out(params.out_ptr, &msg, address_space_of(&table, owner)?)?;
            Ok(1)
        }
        None => Ok(0),
    }
}

/// `GetMessage`.
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`MessageOutParams`]
/// whose `out_ptr` has room for a [`Message`].
unsafe fn sys_get_message(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let params: MessageOutParams = {
        let table = PROCESSES.lock();
        read_param(parameter, address_space_of(&table, owner)?)?
    };
    match router::get_message() {
        Some(msg) => {
            let table = PROCESSES.lock();
            write_message_out(params.out_ptr, &msg, address_space_of(&table, owner)?)?;
            Ok(1)
        }
        None => {
            router::wait_for_message();
            Ok(0)
        }
    }
}

/// `DispatchMessage`: `out_ptr` here is read from rather than written to
/// (the caller already has the `Message` it got from `GetMessage` and is
/// handing it back for dispatch).
///
/// # Safety
/// `parameter` must point at a resident, user-supplied [`MessageOutParams`]
/// whose `out_ptr` points at a resident [`Message`].
unsafe fn sys_dispatch_message(parameter: SyscallParameter) -> Result<isize, Errno> {
    let owner = current_task_and_owner()?.1;
    let table = PROCESSES.lock();
    let space = address_space_of(&table, owner)?;
    let params: MessageOutParams = read_param(parameter, space)?;
    let msg: Message = read_param(params.out_ptr as usize, space)?;
    Ok(router::dispatch_message(&msg) as isize)
}

/// Windowing services (0x40..0x69) have no desktop/window manager in this
/// core (spec.md's window-system surface is a collaborator); numbers are
/// reserved but always return `ENOSYS`. Filesystem enumeration, memory-
/// mapped-file services, and the line-editing/cursor console calls are
/// likewise out of scope for the same reason (external collaborators,
/// spec.md's Non-goals).
fn is_out_of_scope(number: SyscallNumber) -> bool {
    (CREATE_DESKTOP..=RELEASE_MOUSE).contains(&number)
        || matches!(
            number,
            ENUM_VOLUMES
                | GET_VOLUME_INFO
                | FIND_FIRST_FILE
                | FIND_NEXT_FILE
                | CREATE_FILE_MAPPING
                | OPEN_FILE_MAPPING
                | MAP_VIEW_OF_FILE
                | UNMAP_VIEW_OF_FILE
                | CONSOLE_GET_STRING
                | CONSOLE_GOTO_XY
        )
}

/// Dispatches a single syscall. `parameter` is interpreted per `number`
/// exactly as `crate::driver::dispatch`'s `DriverParameter` is
/// interpreted per `Function`.
///
/// # Safety
/// `parameter` must be whatever the calling task's trap frame actually
/// supplied; pointer-carrying calls dereference it after validating
/// residency in the current task's address space, but a corrupted trap
/// frame can still hand this function a bogus-but-resident address.
pub unsafe fn dispatch(number: SyscallNumber, parameter: SyscallParameter) -> Result<isize, Errno> {
    if is_out_of_scope(number) {
        return Err(Errno::ENOSYS);
    }

    match number {
        GET_VERSION => Ok(0x0001_0000),
        GET_SYSTEM_INFO => Ok(PROCESSES.lock().len() as isize),
        GET_LAST_ERROR => sys_get_last_error(),
        SET_LAST_ERROR => sys_set_last_error(parameter),
        GET_SYSTEM_TIME => Ok(time::get_uptime_ms() as isize),
        GET_LOCAL_TIME => Ok(time::get_local_time_ms() as isize),
        SET_LOCAL_TIME => {
            time::set_local_time_ms(parameter as i64);
            Ok(0)
        }
        DELETE_OBJECT => sys_delete_object(parameter),
        CREATE_PROCESS => sys_create_process(parameter),
        KILL_PROCESS => sys_kill_process(parameter),
        CREATE_TASK => sys_create_task(parameter),
        KILL_TASK => sys_kill_task(parameter),
        SUSPEND_TASK => sys_suspend_task(parameter),
        RESUME_TASK => sys_resume_task(parameter),
        SLEEP => sys_sleep(parameter),
        POST_MESSAGE => sys_post_message(parameter),
        SEND_MESSAGE => sys_send_message(parameter),
        PEEK_MESSAGE => sys_peek_message(parameter),
        GET_MESSAGE => sys_get_message(parameter),
        DISPATCH_MESSAGE => sys_dispatch_message(parameter),
        CREATE_SEMAPHORE => sys_create_semaphore(parameter),
        LOCK_SEMAPHORE => sys_lock_semaphore(parameter),
        UNLOCK_SEMAPHORE => sys_unlock_semaphore(parameter),
        VIRTUAL_ALLOC => sys_virtual_alloc(parameter),
        VIRTUAL_FREE => sys_virtual_free(parameter),
        GET_PROCESS_HEAP => sys_get_process_heap(),
        HEAP_ALLOC => sys_heap_alloc(parameter),
        HEAP_FREE => sys_heap_free(parameter),
        OPEN_FILE => sys_open_file(parameter),
        READ_FILE => sys_read_file(parameter),
        WRITE_FILE => sys_write_file(parameter),
        GET_FILE_SIZE => sys_get_file_size(parameter),
        GET_FILE_POINTER => sys_get_file_pointer(parameter),
        SET_FILE_POINTER => sys_set_file_pointer(parameter),
        CONSOLE_PRINT => sys_console_print(parameter),
        CONSOLE_PEEK_KEY => sys_console_peek_key(),
        CONSOLE_GET_KEY => sys_console_get_key(),
        _ => Err(Errno::ENOSYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_process_rejects_unknown_pid() {
        assert_eq!(sys_kill_process(999).unwrap_err(), Errno::EBUSY);
    }

    #[test]
    fn windowing_range_is_out_of_scope() {
        assert!(is_out_of_scope(CREATE_WINDOW));
        assert!(is_out_of_scope(GET_MOUSE_POS));
        assert!(!is_out_of_scope(SLEEP));
    }

    #[test]
    fn console_peek_key_is_eagain_when_nothing_queued() {
        assert_eq!(sys_console_peek_key().unwrap_err(), Errno::EAGAIN);
    }

    #[test]
    fn delete_object_rejects_unknown_handle() {
        assert_eq!(sys_delete_object(0xffff_ffff).unwrap_err(), Errno::EINVAL);
    }

    #[test]
    fn lock_semaphore_rejects_unknown_handle() {
        assert_eq!(sys_lock_semaphore(0xffff_ffff).unwrap_err(), Errno::EINVAL);
    }

    #[test]
    fn get_file_size_rejects_unknown_handle() {
        assert_eq!(sys_get_file_size(0xffff_ffff).unwrap_err(), Errno::EBADF);
    }

    #[test]
    fn get_process_heap_returns_the_heap_base() {
        assert_eq!(sys_get_process_heap().unwrap(), crate::heap::HEAP_START as isize);
    }
}
