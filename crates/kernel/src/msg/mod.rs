//! Task messaging: message codes, per-task/per-process queues, and
//! focus-aware input routing (spec §4.7).

pub mod message;
pub mod queue;
pub mod router;
