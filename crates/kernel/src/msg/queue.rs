//! Per-task/per-process message queue (spec §3, §4.7). Grounded on
//! `original_source/kernel/source/process/Task-Messaging.c` for the
//! `EWM_DRAW` coalescing algorithm: a linear scan for an existing
//! `EWM_DRAW` entry addressed to the same window, updated in place
//! rather than appended, so redraws never pile up.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::kobj::handle::Handle;
use crate::msg::message::{Message, MessageCode, Target, EWM_DRAW, ETM_QUIT};
use crate::util::list::FifoList;

/// Spec §3: capacity bounded to 256.
pub const CAPACITY: usize = 256;

pub struct MessageQueue {
    messages: FifoList<Message>,
    /// Set only while the owning task is in `WAITMESSAGE` (spec §3).
    waiting: AtomicBool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostError {
    QueueFull,
}

impl MessageQueue {
    pub const fn new() -> Self {
        Self {
            messages: FifoList::new(),
            waiting: AtomicBool::new(false),
        }
    }

    pub fn set_waiting(&self, value: bool) {
        self.waiting.store(value, Ordering::Release);
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Enqueues `msg`. Coalesces `EWM_DRAW` for the same window into the
    /// existing pending entry rather than appending a second one.
    /// Returns `Err(QueueFull)` (drop-newest policy, spec §4.7) if the
    /// queue is at capacity and no coalescing target was found.
    pub fn post(&mut self, msg: Message) -> Result<(), PostError> {
        if msg.code == EWM_DRAW {
            if let Target::Window(window) = msg.target {
                if let Some(existing) = self.messages.find_mut(|m| m.is_draw_for(window)) {
                    existing.param1 = msg.param1;
                    existing.param2 = msg.param2;
                    existing.time_ms = msg.time_ms;
                    return Ok(());
                }
            }
        }

        if self.messages.len() >= CAPACITY {
            crate::warn!("[MSG] queue full, dropping newest message (code {:#x})", msg.code);
            return Err(PostError::QueueFull);
        }

        self.messages.push_back(msg);
        Ok(())
    }

    /// `PeekMessage`: does not remove.
    pub fn peek(&self) -> Option<&Message> {
        self.messages.iter().next()
    }

    /// `GetMessage`: removes and returns the next message, or `None` if
    /// the queue is empty (the caller blocks in `WAITMESSAGE` in that
    /// case — this function itself never blocks).
    pub fn get(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn has_quit(&self) -> bool {
        self.messages.iter().any(|m| m.code == ETM_QUIT)
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(target: Target, code: MessageCode, p1: u32, p2: u32) -> Message {
        Message::new(target, 0, code, p1, p2)
    }

    #[test]
    fn fifo_order_for_distinct_messages() {
        let mut q = MessageQueue::new();
        q.post(msg(Target::CurrentTask, 10, 1, 1)).unwrap();
        q.post(msg(Target::CurrentTask, 11, 2, 2)).unwrap();
        assert_eq!(q.get().unwrap().code, 10);
        assert_eq!(q.get().unwrap().code, 11);
    }

    #[test]
    fn ewm_draw_coalesces_into_one_pending_entry() {
        let w = Handle(5);
        let mut q = MessageQueue::new();
        q.post(msg(Target::Window(w), EWM_DRAW, 1, 1)).unwrap();
        q.post(msg(Target::Window(w), EWM_DRAW, 2, 2)).unwrap();
        q.post(msg(Target::Window(w), 0x4000_000A, 0x41, b'A' as u32)).unwrap();

        assert_eq!(q.len(), 2);
        let first = q.get().unwrap();
        assert_eq!(first.code, EWM_DRAW);
        assert_eq!((first.param1, first.param2), (2, 2));
        let second = q.get().unwrap();
        assert_eq!(second.code, 0x4000_000A);
    }

    #[test]
    fn queue_full_drops_newest_and_warns() {
        let mut q = MessageQueue::new();
        for i in 0..CAPACITY {
            q.post(msg(Target::CurrentTask, 99, i as u32, 0)).unwrap();
        }
        assert_eq!(q.post(msg(Target::CurrentTask, 99, 12345, 0)), Err(PostError::QueueFull));
        assert_eq!(q.len(), CAPACITY);
    }
}
