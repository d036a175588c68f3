#![forbid(unsafe_code)]

//! Ordered subscriber registry shared by [`Observable`] and [`Emitter`].
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. Publishing from inside a callback never recurses: the value is queued
//!    and delivered once the in-flight value has reached every subscriber.
//! 3. A subscriber only ever sees values published after it registered
//!    (sequence numbers guard late joiners against stale queued values).
//! 4. A cancelled subscriber is skipped even if it was cancelled by an earlier
//!    subscriber of the same emission.
//!
//! [`Observable`]: super::Observable
//! [`Emitter`]: super::Emitter

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

struct Slot<T> {
    active: Rc<Cell<bool>>,
    /// Sequence number of the last value published before registration.
    after: u64,
    callback: Box<dyn Fn(&T)>,
}

pub(crate) struct Subscribers<T> {
    slots: RefCell<Vec<Weak<Slot<T>>>>,
    pending: RefCell<VecDeque<(u64, T)>>,
    seq: Cell<u64>,
    delivering: Cell<bool>,
}

/// Resets the delivering flag even when a callback unwinds.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T: 'static> Subscribers<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            seq: Cell::new(0),
            delivering: Cell::new(false),
        }
    }

    /// Register `callback`. When `replay` is given, the callback is invoked
    /// with it once, synchronously, before this returns.
    pub(crate) fn add(&self, callback: Box<dyn Fn(&T)>, replay: Option<&T>) -> Subscription {
        let active = Rc::new(Cell::new(true));
        let slot = Rc::new(Slot {
            active: Rc::clone(&active),
            after: self.seq.get(),
            callback,
        });
        self.slots.borrow_mut().push(Rc::downgrade(&slot));
        if let Some(value) = replay {
            (slot.callback)(value);
        }
        Subscription::new(slot, active)
    }

    /// Queue `value` for every live subscriber and deliver unless a delivery
    /// loop is already running further up the stack.
    pub(crate) fn publish(&self, value: T) {
        let seq = self.seq.get() + 1;
        self.seq.set(seq);
        self.pending.borrow_mut().push_back((seq, value));
        if self.delivering.replace(true) {
            return;
        }
        let _guard = DeliveryGuard(&self.delivering);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some((seq, value)) = next else { break };
            for slot in self.live() {
                if slot.active.get() && slot.after < seq {
                    (slot.callback)(&value);
                }
            }
        }
    }

    /// Number of subscribers that have not been cancelled or dropped.
    pub(crate) fn len(&self) -> usize {
        self.slots
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|slot| slot.active.get())
            .count()
    }

    /// Deactivate every subscriber and forget them.
    pub(crate) fn clear(&self) {
        let slots = std::mem::take(&mut *self.slots.borrow_mut());
        for slot in slots.iter().filter_map(Weak::upgrade) {
            slot.active.set(false);
        }
        self.pending.borrow_mut().clear();
    }

    fn live(&self) -> Vec<Rc<Slot<T>>> {
        let mut slots = self.slots.borrow_mut();
        slots.retain(|weak| weak.upgrade().is_some_and(|slot| slot.active.get()));
        slots.iter().filter_map(Weak::upgrade).collect()
    }
}

/// RAII handle for a registered callback.
///
/// Dropping the subscription (or calling [`cancel`](Self::cancel)) detaches
/// the callback before the next notification cycle. Cancelling is idempotent.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    guard: RefCell<Option<Rc<dyn Any>>>,
    active: Rc<Cell<bool>>,
}

impl Subscription {
    fn new(guard: Rc<dyn Any>, active: Rc<Cell<bool>>) -> Self {
        Self {
            guard: RefCell::new(Some(guard)),
            active,
        }
    }

    /// A subscription that is already cancelled. Returned by disposed sources.
    pub fn inert() -> Self {
        Self {
            guard: RefCell::new(None),
            active: Rc::new(Cell::new(false)),
        }
    }

    /// Detach the callback. Safe to call any number of times.
    pub fn cancel(&self) {
        self.active.set(false);
        self.guard.borrow_mut().take();
    }

    /// Whether the callback is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.active.get())
            .finish()
    }
}
