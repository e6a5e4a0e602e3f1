//! Process/task identity types, kept separate from [`super::task`] and
//! [`super::process`] so low-level modules (`sync`, `kobj`) can reference
//! "which task/process" without depending on the full `Task`/`Process`
//! definitions.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl TaskId {
    pub const NONE: TaskId = TaskId(0);
}

impl ProcessId {
    pub const NONE: ProcessId = ProcessId(0);
    pub const KERNEL: ProcessId = ProcessId(1);
}
