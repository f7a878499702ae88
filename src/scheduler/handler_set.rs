//! Socket handler registry.
//!
//! Grounded on `BasicUsageEnvironment/BasicTaskScheduler0.cpp`'s
//! `HandlerSet`/`HandlerDescriptor`/`HandlerIterator`: there, handlers live
//! in an intrusive circular doubly-linked list so the round-robin iterator
//! can resume from an arbitrary point. Per the design note in spec §9, that
//! becomes a token-indexed arena here — insertion order is preserved in a
//! `Vec`, and "resume just past token N" is a linear scan, which is fine at
//! the handler-set sizes this scheduler is meant for.

use std::os::fd::RawFd;

/// Which readiness condition a handler is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCondition {
    Readable,
    Writable,
    Exception,
}

pub type HandlerToken = u64;

struct HandlerDescriptor {
    token: HandlerToken,
    fd: RawFd,
    condition: IoCondition,
    callback: Box<dyn FnMut(RawFd)>,
}

/// The set of registered socket handlers, plus round-robin dispatch state.
#[derive(Default)]
pub struct HandlerSet {
    handlers: Vec<HandlerDescriptor>,
    next_token: HandlerToken,
    last_handled: Option<HandlerToken>,
}

impl HandlerSet {
    pub fn new() -> Self {
        HandlerSet {
            handlers: Vec::new(),
            next_token: 0,
            last_handled: None,
        }
    }

    pub fn register(
        &mut self,
        fd: RawFd,
        condition: IoCondition,
        callback: Box<dyn FnMut(RawFd)>,
    ) -> HandlerToken {
        let token = self.next_token;
        self.next_token += 1;
        self.handlers.push(HandlerDescriptor {
            token,
            fd,
            condition,
            callback,
        });
        token
    }

    pub fn unregister(&mut self, token: HandlerToken) {
        self.handlers.retain(|h| h.token != token);
        if self.last_handled == Some(token) {
            self.last_handled = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter_fds(&self) -> impl Iterator<Item = (RawFd, IoCondition)> + '_ {
        self.handlers.iter().map(|h| (h.fd, h.condition))
    }

    /// Dispatches at most one handler among those whose fd is in
    /// `ready_fds`, resuming round-robin just past the handler last
    /// invoked. Mirrors `SingleStep`'s socket-handler loop: the resume
    /// point is committed *before* the callback runs, since the callback
    /// may itself recursively drive the event loop.
    pub fn dispatch_one_ready(&mut self, ready_fds: &[RawFd]) -> bool {
        if self.handlers.is_empty() {
            return false;
        }
        let start = match self.last_handled {
            Some(tok) => self
                .handlers
                .iter()
                .position(|h| h.token == tok)
                .map(|i| (i + 1) % self.handlers.len())
                .unwrap_or(0),
            None => 0,
        };
        for offset in 0..self.handlers.len() {
            let idx = (start + offset) % self.handlers.len();
            let matches = ready_fds.contains(&self.handlers[idx].fd);
            if matches {
                let token = self.handlers[idx].token;
                let fd = self.handlers[idx].fd;
                self.last_handled = Some(token);
                (self.handlers[idx].callback)(fd);
                return true;
            }
        }
        self.last_handled = None;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn dispatches_round_robin_across_ready_handlers() {
        let mut set = HandlerSet::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for fd in [3, 4, 5] {
            let o = order.clone();
            set.register(
                fd,
                IoCondition::Readable,
                Box::new(move |f| o.borrow_mut().push(f)),
            );
        }
        let ready = vec![3, 4, 5];
        set.dispatch_one_ready(&ready);
        set.dispatch_one_ready(&ready);
        set.dispatch_one_ready(&ready);
        assert_eq!(*order.borrow(), vec![3, 4, 5]);
    }

    #[test]
    fn skips_non_ready_handlers() {
        let mut set = HandlerSet::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for fd in [3, 4, 5] {
            let o = order.clone();
            set.register(
                fd,
                IoCondition::Readable,
                Box::new(move |f| o.borrow_mut().push(f)),
            );
        }
        assert!(set.dispatch_one_ready(&[5]));
        assert_eq!(*order.borrow(), vec![5]);
        assert!(!set.dispatch_one_ready(&[]));
    }

    #[test]
    fn unregister_removes_handler_and_clears_resume_point() {
        let mut set = HandlerSet::new();
        let tok = set.register(3, IoCondition::Readable, Box::new(|_| {}));
        set.unregister(tok);
        assert!(set.is_empty());
    }
}
