//! Cross-thread event triggers.
//!
//! Grounded on `BasicUsageEnvironment0.cpp`'s `createEventTrigger`/
//! `deleteEventTrigger`/`triggerEvent`: triggers are identified by a single
//! set bit in a fixed-width mask, handed out round-robin from a rotating
//! starting point, and `fire` (the original's `triggerEvent`) is the one
//! function this scheduler allows to be called from another thread. It
//! records the per-trigger payload *before* publishing the bit, and
//! publishes the bit with a single atomic OR — same ordering the original
//! calls out explicitly as reducing race risk, here made safe by Rust's
//! atomics instead of by convention.

use std::sync::atomic::{AtomicU64, Ordering};

pub type TriggerId = u32;

const SLOT_COUNT: u32 = u64::BITS;

struct TriggerSlot {
    callback: Option<Box<dyn FnMut(u64)>>,
}

/// Table of up to 64 event triggers a scheduler step can dispatch.
pub struct TriggerTable {
    slots: Vec<TriggerSlot>,
    pending_mask: AtomicU64,
    client_data: Vec<AtomicU64>,
    last_used: u32,
    last_used_mask: u64,
}

impl Default for TriggerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TriggerTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(SLOT_COUNT as usize);
        let mut client_data = Vec::with_capacity(SLOT_COUNT as usize);
        for _ in 0..SLOT_COUNT {
            slots.push(TriggerSlot { callback: None });
            client_data.push(AtomicU64::new(0));
        }
        TriggerTable {
            slots,
            pending_mask: AtomicU64::new(0),
            client_data,
            last_used: SLOT_COUNT - 1,
            last_used_mask: 1,
        }
    }

    /// Allocates a vacant slot, scanning round-robin from just past the
    /// last one handed out. Returns `None` once all 64 slots are taken —
    /// the generalization path noted in spec §9 is to widen this to a
    /// `Vec<AtomicU64>` of masks instead of a single word.
    pub fn create_trigger(&mut self, callback: Box<dyn FnMut(u64)>) -> Option<TriggerId> {
        for _ in 0..SLOT_COUNT {
            self.last_used = (self.last_used + 1) % SLOT_COUNT;
            self.last_used_mask = if self.last_used_mask == 1 << (SLOT_COUNT - 1) {
                1
            } else {
                self.last_used_mask << 1
            };
            if self.slots[self.last_used as usize].callback.is_none() {
                self.slots[self.last_used as usize].callback = Some(callback);
                return Some(self.last_used);
            }
        }
        None
    }

    pub fn delete_trigger(&mut self, id: TriggerId) {
        if let Some(slot) = self.slots.get_mut(id as usize) {
            slot.callback = None;
        }
        self.pending_mask
            .fetch_and(!(1u64 << id), Ordering::AcqRel);
    }

    /// The one function safe to call from another thread. Records
    /// `client_data` for the matching slot first, then ORs the bit into
    /// `pending_mask` last.
    pub fn fire(&self, id: TriggerId, client_data: u64) {
        if (id as usize) >= self.slots.len() {
            return;
        }
        self.client_data[id as usize].store(client_data, Ordering::Release);
        self.pending_mask.fetch_or(1u64 << id, Ordering::AcqRel);
    }

    pub fn has_pending(&self) -> bool {
        self.pending_mask.load(Ordering::Acquire) != 0
    }

    /// Dispatches at most one pending trigger, clearing its bit before
    /// invoking the callback. Fast path: if every allocated slot is
    /// currently pending, skip the scan and go straight to `last_used`.
    pub fn dispatch_one_pending(&mut self) -> bool {
        let mask = self.pending_mask.load(Ordering::Acquire);
        if mask == 0 {
            return false;
        }
        let id = if mask == self.last_used_mask {
            self.last_used
        } else {
            let mut id = self.last_used;
            loop {
                id = (id + 1) % SLOT_COUNT;
                if mask & (1 << id) != 0 {
                    break;
                }
            }
            id
        };
        self.pending_mask.fetch_and(!(1u64 << id), Ordering::AcqRel);
        let data = self.client_data[id as usize].load(Ordering::Acquire);
        if let Some(cb) = self.slots[id as usize].callback.as_mut() {
            cb(data);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn fire_sets_pending_and_dispatch_clears_it() {
        let mut table = TriggerTable::new();
        let seen = Rc::new(RefCell::new(None));
        let seen2 = seen.clone();
        let id = table
            .create_trigger(Box::new(move |data| *seen2.borrow_mut() = Some(data)))
            .unwrap();
        assert!(!table.has_pending());
        table.fire(id, 42);
        assert!(table.has_pending());
        assert!(table.dispatch_one_pending());
        assert_eq!(*seen.borrow(), Some(42));
        assert!(!table.has_pending());
    }

    #[test]
    fn table_exhausts_after_64_triggers() {
        let mut table = TriggerTable::new();
        let mut ids = Vec::new();
        for _ in 0..64 {
            ids.push(table.create_trigger(Box::new(|_| {})).unwrap());
        }
        assert!(table.create_trigger(Box::new(|_| {})).is_none());
        table.delete_trigger(ids[0]);
        assert!(table.create_trigger(Box::new(|_| {})).is_some());
    }

    #[test]
    fn dispatch_one_pending_handles_only_one_bit_at_a_time() {
        let mut table = TriggerTable::new();
        let count = Rc::new(RefCell::new(0));
        let mut ids = Vec::new();
        for _ in 0..3 {
            let c = count.clone();
            ids.push(
                table
                    .create_trigger(Box::new(move |_| *c.borrow_mut() += 1))
                    .unwrap(),
            );
        }
        for id in &ids {
            table.fire(*id, 0);
        }
        table.dispatch_one_pending();
        assert_eq!(*count.borrow(), 1);
    }
}
