//! Single-threaded cooperative event loop.
//!
//! Grounded directly on `BasicTaskScheduler::SingleStep`: wait in `select()`
//! for either readiness on a registered socket or the next timer deadline
//! (whichever is sooner), then dispatch **exactly one** socket handler, then
//! **exactly one** trigger, then let the timer queue fire **at most one**
//! due entry — in that order, every step.

use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, RtspError};
use crate::scheduler::delay_queue::TimerQueue;
use crate::scheduler::handler_set::HandlerSet;
use crate::scheduler::trigger::TriggerTable;
use crate::time::DelayInterval;

/// The longest a single `select()` wait is allowed to block, regardless of
/// how far away the next timer is — mirrors `SingleStep`'s clamp of
/// `tv_sec` to keep the loop responsive to newly-registered handlers.
const MAX_SELECT_SECONDS: i64 = 1;

pub struct EventLoop {
    pub handlers: HandlerSet,
    pub timers: TimerQueue,
    pub triggers: TriggerTable,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop {
            handlers: HandlerSet::new(),
            timers: TimerQueue::new(),
            triggers: TriggerTable::new(),
        }
    }

    /// Runs `single_step` until `stop_flag` is set, exactly as the
    /// original's `doEventLoop(watchVariable)` repeats `SingleStep` until
    /// its watch variable becomes nonzero.
    pub fn run(&mut self, stop_flag: &Arc<AtomicBool>) -> Result<()> {
        while !stop_flag.load(Ordering::Acquire) {
            self.single_step(None)?;
        }
        Ok(())
    }

    /// One iteration: wait for readiness or the next deadline, then
    /// dispatch at most one handler, one trigger, and one timer.
    ///
    /// `max_wait` further bounds the wait (used by tests to avoid hanging
    /// forever on an empty handler set); `None` means "let the timer queue
    /// and the 1-second clamp decide".
    pub fn single_step(&mut self, max_wait: Option<DelayInterval>) -> Result<()> {
        let mut wait = self.timers.time_until_next();
        if wait.seconds() > MAX_SELECT_SECONDS || wait == DelayInterval::ETERNITY {
            wait = DelayInterval::from_micros(MAX_SELECT_SECONDS * 1_000_000);
        }
        if let Some(cap) = max_wait
            && wait > cap
        {
            wait = cap;
        }
        if self.triggers.has_pending() {
            wait = DelayInterval::ZERO;
        }

        let ready = self.wait_for_readiness(wait)?;
        self.handlers.dispatch_one_ready(&ready);
        self.triggers.dispatch_one_pending();
        self.timers.handle_alarm();
        Ok(())
    }

    fn wait_for_readiness(&self, wait: DelayInterval) -> Result<Vec<RawFd>> {
        if self.handlers.is_empty() {
            if !wait.is_zero_or_negative() {
                std::thread::sleep(std::time::Duration::from_micros(
                    wait.as_micros().max(0) as u64
                ));
            }
            return Ok(Vec::new());
        }

        let mut read_set = MaybeUninit::<libc::fd_set>::uninit();
        let max_fd = unsafe {
            libc::FD_ZERO(read_set.as_mut_ptr());
            let mut max_fd: RawFd = 0;
            for (fd, _cond) in self.handlers.iter_fds() {
                libc::FD_SET(fd, read_set.as_mut_ptr());
                max_fd = max_fd.max(fd);
            }
            max_fd
        };
        let mut read_set = unsafe { read_set.assume_init() };

        let mut timeout = libc::timeval {
            tv_sec: wait.seconds() as libc::time_t,
            tv_usec: wait.microseconds() as libc::suseconds_t,
        };

        let ready_count = unsafe {
            libc::select(
                max_fd + 1,
                &mut read_set,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut timeout,
            )
        };

        if ready_count < 0 {
            let err = std::io::Error::last_os_error();
            return match err.kind() {
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::WouldBlock => Ok(Vec::new()),
                _ => Err(RtspError::Fatal(format!("select() failed: {err}"))),
            };
        }

        let mut ready = Vec::new();
        if ready_count > 0 {
            for (fd, _cond) in self.handlers.iter_fds() {
                if unsafe { libc::FD_ISSET(fd, &read_set) } {
                    ready.push(fd);
                }
            }
        }
        Ok(ready)
    }
}
