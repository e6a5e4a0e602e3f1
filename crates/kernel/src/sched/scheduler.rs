//! Preemptive priority-tiered round-robin scheduler (spec §4.5).
//!
//! The five-tick algorithm from spec §4.5 is implemented as [`Scheduler::tick`]:
//! promote due sleepers, pick the next task (`CRITICAL` FIFO first, else
//! round-robin within the highest non-empty regular tier), or fall back
//! to the idle task. Status transitions out of `RUNNING` only ever
//! happen from the running task itself (never from a waker), matching
//! spec §4.5's ordering guarantee.

use alloc::collections::BTreeMap;

use spin::Mutex as SpinMutex;

use crate::process::ids::{ProcessId, TaskId};
use crate::process::task::{Priority, Status, Task, TIER_COUNT};
use crate::util::list::FifoList;

pub struct Scheduler {
    tasks: BTreeMap<TaskId, Task>,
    ready: [FifoList<TaskId>; TIER_COUNT],
    current: Option<TaskId>,
    now_ms: u64,
    freeze_depth: u32,
    next_id: u32,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            ready: [
                FifoList::new(),
                FifoList::new(),
                FifoList::new(),
                FifoList::new(),
                FifoList::new(),
                FifoList::new(),
            ],
            current: None,
            now_ms: 0,
            freeze_depth: 0,
            next_id: 1,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn create_task(&mut self, owner_process: ProcessId, priority: Priority, entry: u32, name: &'static str) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let task = Task::new(id, owner_process, priority, entry, name);
        self.ready[priority.tier_index()].push_back(id);
        self.tasks.insert(id, task);
        if self.current.is_none() {
            self.current = Some(id);
        }
        id
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    pub fn freeze(&mut self) {
        self.freeze_depth += 1;
    }

    pub fn unfreeze(&mut self) {
        self.freeze_depth = self.freeze_depth.saturating_sub(1);
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze_depth > 0
    }

    /// Moves `now` forward and promotes any `SLEEPING` task whose
    /// `WakeUpTime <= now` to `READY` (spec §4.5 step 2, and the Sleep
    /// Wakeup testable property in spec §8).
    pub fn advance_clock(&mut self, delta_ms: u32) {
        self.now_ms += delta_ms as u64;
        let now = self.now_ms;
        let mut woken = alloc::vec::Vec::new();
        for (id, task) in self.tasks.iter_mut() {
            if task.is_ready_at(now) {
                task.status = Status::Ready;
                woken.push(*id);
            }
        }
        for id in woken {
            let tier = self.tasks[&id].priority.tier_index();
            self.ready[tier].push_back(id);
        }
    }

    /// Flips a `WAITMESSAGE`/`WAITOBJECT`/`SLEEPING` task to `READY`
    /// immediately (a post or signal), never touching a `RUNNING` task.
    pub fn wake(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get_mut(&id) {
            if matches!(task.status, Status::Running | Status::Dead) {
                return;
            }
            task.status = Status::Ready;
            let tier = task.priority.tier_index();
            self.ready[tier].push_back(id);
        }
    }

    pub fn sleep_task(&mut self, id: TaskId, duration_ms: u32) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.status = Status::Sleeping;
            task.wake_up_time = self.now_ms + duration_ms as u64;
        }
    }

    /// `SuspendTask`: parks a task indefinitely. Modeled as `Sleeping`
    /// with a `WakeUpTime` that never elapses under [`Self::advance_clock`];
    /// `ResumeTask` is exactly [`Self::wake`], the same transition any
    /// other `Sleeping` task uses to rejoin `READY`. A `RUNNING` task may
    /// only suspend itself (spec §4.5's "only the running task itself
    /// ever leaves RUNNING"); suspending some other running task is a
    /// no-op.
    pub fn suspend(&mut self, id: TaskId) {
        if self.current == Some(id) {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = Status::Sleeping;
                task.wake_up_time = u64::MAX;
            }
            return;
        }
        if let Some(task) = self.tasks.get_mut(&id) {
            if task.status != Status::Running {
                task.status = Status::Sleeping;
                task.wake_up_time = u64::MAX;
            }
        }
    }

    pub fn kill(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.status = Status::Dead;
        }
    }

    /// Picks the next task to run: any `CRITICAL`-tier ready task first
    /// (FIFO within the tier), else the highest non-empty regular tier,
    /// round-robin. Returns `None` only if nothing is ready (run idle).
    fn pick_next(&mut self) -> Option<TaskId> {
        let critical = Priority::Critical.tier_index();
        if let Some(id) = self.ready[critical].pop_front() {
            return Some(id);
        }
        for tier in (0..critical).rev() {
            if let Some(id) = self.ready[tier].pop_front() {
                return Some(id);
            }
        }
        None
    }

    /// Runs one scheduling pass: promotes sleepers, then dispatches the
    /// next task. The outgoing `RUNNING` task (if still alive) is
    /// re-queued as `READY` at the tail of its tier, preserving FIFO
    /// order within a tier (spec §4.5's ordering guarantee).
    pub fn tick(&mut self) -> Option<TaskId> {
        if self.is_frozen() {
            return self.current;
        }

        if let Some(outgoing) = self.current.take() {
            if let Some(task) = self.tasks.get_mut(&outgoing) {
                match task.status {
                    Status::Running => {
                        task.status = Status::Ready;
                        let tier = task.priority.tier_index();
                        self.ready[tier].push_back(outgoing);
                    }
                    Status::Dead => {
                        self.tasks.remove(&outgoing);
                    }
                    _ => {}
                }
            }
        }

        let next = self.pick_next();
        if let Some(id) = next {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = Status::Running;
            }
        }
        self.current = next;
        next
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

pub static SCHEDULER: SpinMutex<Scheduler> = SpinMutex::new(Scheduler::new());

pub fn current_task_id() -> Option<TaskId> {
    SCHEDULER.lock().current()
}

/// Called by contended-mutex retry loops (spec §4.4) and other
/// voluntary-yield points. In the absence of real concurrent hardware
/// threads this advances the virtual clock and lets any now-ready
/// higher-priority task be picked up on the next real `tick()`.
pub fn sleep_current(ms: u32) {
    SCHEDULER.lock().advance_clock(ms);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_task_preempts_lower_tiers() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        s.tick(); // a becomes RUNNING
        let b = s.create_task(ProcessId(1), Priority::Critical, 0, "b");
        let next = s.tick();
        assert_eq!(next, Some(b));
        assert_eq!(s.task(a).unwrap().status, Status::Ready);
    }

    #[test]
    fn suspend_then_resume_round_trips_through_sleeping() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        s.tick();
        s.suspend(a);
        assert_eq!(s.task(a).unwrap().status, Status::Sleeping);
        s.advance_clock(1_000_000);
        assert_eq!(s.task(a).unwrap().status, Status::Sleeping, "suspended task must not wake on its own");
        s.wake(a);
        assert_eq!(s.task(a).unwrap().status, Status::Ready);
    }

    #[test]
    fn sleep_wakeup_promotes_at_or_after_deadline() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        s.tick();
        s.sleep_task(a, 1000);
        s.advance_clock(999);
        assert_eq!(s.task(a).unwrap().status, Status::Sleeping);
        s.advance_clock(1);
        assert_eq!(s.task(a).unwrap().status, Status::Ready);
    }

    #[test]
    fn round_robin_within_tier_is_fifo() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        let b = s.create_task(ProcessId(1), Priority::Medium, 0, "b");
        assert_eq!(s.tick(), Some(a));
        assert_eq!(s.tick(), Some(b));
        assert_eq!(s.tick(), Some(a));
    }

    #[test]
    fn wake_never_touches_a_running_task() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        s.tick();
        assert_eq!(s.task(a).unwrap().status, Status::Running);
        s.wake(a);
        assert_eq!(s.task(a).unwrap().status, Status::Running);
    }

    #[test]
    fn freeze_scheduler_keeps_current_task_running() {
        let mut s = Scheduler::new();
        let a = s.create_task(ProcessId(1), Priority::Medium, 0, "a");
        s.tick();
        s.create_task(ProcessId(1), Priority::Critical, 0, "b");
        s.freeze();
        assert_eq!(s.tick(), Some(a));
        s.unfreeze();
        assert_ne!(s.tick(), Some(a));
    }
}
