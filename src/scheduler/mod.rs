//! Single-threaded cooperative scheduler: timer queue, socket handler
//! registry, cross-thread trigger table, and the event-loop step that ties
//! them together.
//!
//! Grounded in `BasicUsageEnvironment/{DelayQueue,BasicTaskScheduler0,
//! BasicTaskScheduler}.cpp` from the original live555 implementation.

pub mod delay_queue;
pub mod event_loop;
pub mod handler_set;
pub mod trigger;

pub use delay_queue::{TaskToken, TimerQueue};
pub use event_loop::EventLoop;
pub use handler_set::{HandlerSet, HandlerToken, IoCondition};
pub use trigger::{TriggerId, TriggerTable};
