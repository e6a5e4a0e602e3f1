//! A process: an address space, a heap region, a file/handle table, a
//! desktop association, a message queue, and the list of tasks it owns
//! (spec §3). Tasks are strongly owned; each task only carries a
//! non-owning [`ProcessId`] back-reference (spec §9's cyclic-graph note).

use alloc::vec::Vec;

use crate::kobj::handle::Handle;
use crate::mm::region::AddressSpace;
use crate::msg::queue::MessageQueue;
use crate::process::ids::{ProcessId, TaskId};

pub struct Process {
    pub id: ProcessId,
    pub address_space: AddressSpace,
    pub tasks: Vec<TaskId>,
    pub desktop: Option<Handle>,
    pub messages: MessageQueue,
    pub command_line: alloc::string::String,
}

impl Process {
    pub fn new(id: ProcessId, command_line: alloc::string::String) -> Self {
        Self {
            id,
            address_space: AddressSpace::new(),
            tasks: Vec::new(),
            desktop: None,
            messages: MessageQueue::new(),
            command_line,
        }
    }

    pub fn add_task(&mut self, task: TaskId) {
        self.tasks.push(task);
    }

    pub fn remove_task(&mut self, task: TaskId) {
        self.tasks.retain(|&t| t != task);
    }

    /// A process is eligible for teardown once its task list is empty —
    /// "destroyed when its reference count reaches zero and its last
    /// task exits" (spec §3).
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn process_becomes_empty_after_last_task_removed() {
        let mut p = Process::new(ProcessId(2), String::from("init"));
        p.add_task(TaskId(10));
        p.add_task(TaskId(11));
        assert!(!p.is_empty());
        p.remove_task(TaskId(10));
        assert!(!p.is_empty());
        p.remove_task(TaskId(11));
        assert!(p.is_empty());
    }
}
