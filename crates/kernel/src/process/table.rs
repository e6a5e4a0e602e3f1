//! Process table: the process-wide registry of live [`Process`]es, and
//! the `CreateProcess`/`KillProcess`/`CreateTask`/`KillTask` operations
//! that tie a process's bookkeeping to the scheduler's task table and the
//! kernel object/handle model (spec §3, §4.5, §4.8's syscall surface).
//!
//! Processes strongly own their tasks; tasks only carry a non-owning
//! [`ProcessId`] back-reference (spec §9's cyclic-graph note). The
//! process table itself is a process-wide singleton serialized by
//! `MUTEX_PROCESS`, the same way [`crate::sched::scheduler::SCHEDULER`]
//! is serialized by `MUTEX_SCHEDULE` — both are plain `spin::Mutex`es
//! here since EXOS runs on a single logical CPU (spec §5), with the
//! named `sync::mutex::Mutex` reserved for task-visible, owner-tracked
//! locking.
//!
//! `create_process`/`create_task`/`kill_task` take an explicit
//! `&mut Scheduler` rather than locking [`crate::sched::scheduler::SCHEDULER`]
//! themselves, so callers (and this module's own tests) can drive a
//! throwaway local `Scheduler` instead of the shared global one — the
//! same reason `sched::scheduler`'s tests never touch its own static.

use alloc::collections::BTreeMap;
use alloc::string::String;

use spin::Mutex as SpinMutex;

use crate::kobj::header::{ObjHeader, ObjectType};
use crate::process::ids::{ProcessId, TaskId};
use crate::process::process::Process;
use crate::process::task::Priority;
use crate::sched::scheduler::Scheduler;

struct ProcessEntry {
    header: ObjHeader,
    process: Process,
}

pub struct ProcessTable {
    processes: BTreeMap<ProcessId, ProcessEntry>,
    next_id: u32,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            processes: BTreeMap::new(),
            next_id: 2, // 1 is reserved for ProcessId::KERNEL
        }
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(&id).map(|e| &e.process)
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut Process> {
        self.processes.get_mut(&id).map(|e| &mut e.process)
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.processes.contains_key(&id)
    }

    pub fn header(&self, id: ProcessId) -> Option<&ObjHeader> {
        self.processes.get(&id).map(|e| &e.header)
    }

    /// `CreateProcess`: allocates a fresh `ProcessId`, creates the
    /// backing kernel object (`References = 1`, owner is itself — a
    /// process owns itself, there is no creator process for the very
    /// first user process), and creates its main task at `priority` on
    /// `sched`. Returns the new process and its main task.
    pub fn create_process(&mut self, sched: &mut Scheduler, command_line: String, priority: Priority, entry: u32) -> (ProcessId, TaskId) {
        let id = ProcessId(self.next_id);
        self.next_id += 1;

        let header = ObjHeader::new(ObjectType::Process, id);
        let process = Process::new(id, command_line);
        self.processes.insert(id, ProcessEntry { header, process });

        let main_task = sched.create_task(id, priority, entry, "main");
        self.processes.get_mut(&id).unwrap().process.add_task(main_task);

        (id, main_task)
    }

    /// `CreateTask`: adds another task to an already-live process.
    pub fn create_task(&mut self, sched: &mut Scheduler, owner: ProcessId, priority: Priority, entry: u32, name: &'static str) -> Option<TaskId> {
        if !self.processes.contains_key(&owner) {
            return None;
        }
        let task = sched.create_task(owner, priority, entry, name);
        self.processes.get_mut(&owner).unwrap().process.add_task(task);
        Some(task)
    }

    /// `KillTask`: marks the task `DEAD` in the scheduler (actual
    /// teardown happens on the next idle-task scheduling pass, spec
    /// §4.5) and detaches it from its owning process's task list. If
    /// this was the process's last task, the process itself becomes
    /// eligible for `KillProcess`/teardown (spec §3: "destroyed when its
    /// reference count reaches zero and its last task exits").
    pub fn kill_task(&mut self, sched: &mut Scheduler, owner: ProcessId, task: TaskId) {
        sched.kill(task);
        if let Some(entry) = self.processes.get_mut(&owner) {
            entry.process.remove_task(task);
        }
    }

    /// `KillProcess`: only valid once every task has exited (spec §3).
    /// Returns `false` without tearing anything down otherwise.
    pub fn kill_process(&mut self, id: ProcessId) -> bool {
        match self.processes.get(&id) {
            Some(entry) if entry.process.is_empty() => {
                self.processes.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Every live, non-kernel process handle the way `BroadcastProcessMessage`
    /// (spec §4.7) needs to enumerate them: "posts to every user process's
    /// queue (kernel process excluded)".
    pub fn user_process_ids(&self) -> alloc::vec::Vec<ProcessId> {
        self.processes
            .keys()
            .copied()
            .filter(|id| *id != ProcessId::KERNEL)
            .collect()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

pub static PROCESSES: SpinMutex<ProcessTable> = SpinMutex::new(ProcessTable::new());

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn create_process_creates_a_main_task() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        let (pid, main_task) = table.create_process(&mut sched, "init".to_string(), Priority::Medium, 0x1000);
        let process = table.get(pid).unwrap();
        assert_eq!(process.tasks, alloc::vec![main_task]);
    }

    #[test]
    fn process_is_killable_only_after_last_task_exits() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        let (pid, main_task) = table.create_process(&mut sched, "a".to_string(), Priority::Medium, 0);
        assert!(!table.kill_process(pid));
        table.kill_task(&mut sched, pid, main_task);
        assert!(table.kill_process(pid));
        assert!(!table.contains(pid));
    }

    #[test]
    fn broadcast_target_list_excludes_kernel_process() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        table.create_process(&mut sched, "a".to_string(), Priority::Medium, 0);
        table.create_process(&mut sched, "b".to_string(), Priority::Medium, 0);
        let ids = table.user_process_ids();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&ProcessId::KERNEL));
    }

    #[test]
    fn create_task_attaches_to_an_existing_process() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        let (pid, main_task) = table.create_process(&mut sched, "a".to_string(), Priority::Medium, 0);
        let second = table.create_task(&mut sched, pid, Priority::High, 0, "worker").unwrap();
        assert_eq!(table.get(pid).unwrap().tasks, alloc::vec![main_task, second]);
    }

    #[test]
    fn create_task_rejects_unknown_process() {
        let mut sched = Scheduler::new();
        let mut table = ProcessTable::new();
        assert!(table.create_task(&mut sched, ProcessId(99), Priority::Medium, 0, "x").is_none());
    }
}
