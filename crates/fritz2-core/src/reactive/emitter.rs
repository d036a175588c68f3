#![forbid(unsafe_code)]

//! Non-replaying event streams.
//!
//! An [`Emitter<E>`] is the push stream UI adapters feed clicks and input
//! changes into, and what emitting handlers publish their side outputs on.
//! Unlike [`Observable`](super::Observable) it holds no current value, so late
//! subscribers only see events emitted after they subscribed.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use super::source::Source;
use super::subscribers::{Subscribers, Subscription};

struct EmitterInner<E> {
    subscribers: Subscribers<E>,
    emitted: Cell<u64>,
    closed: Cell<bool>,
}

/// A shared, non-replaying event stream.
pub struct Emitter<E> {
    inner: Rc<EmitterInner<E>>,
}

impl<E> Clone for Emitter<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("emitted", &self.inner.emitted.get())
            .field("closed", &self.inner.closed.get())
            .finish()
    }
}

impl<E: 'static> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> Emitter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                subscribers: Subscribers::new(),
                emitted: Cell::new(0),
                closed: Cell::new(false),
            }),
        }
    }

    /// Push an event to every current subscriber. Returns `false` when the
    /// emitter has been closed and the event was dropped.
    pub fn emit(&self, event: E) -> bool {
        if self.inner.closed.get() {
            return false;
        }
        self.inner.emitted.set(self.inner.emitted.get() + 1);
        self.inner.subscribers.publish(event);
        true
    }

    /// Subscribe to future events.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        if self.inner.closed.get() {
            return Subscription::inert();
        }
        self.inner.subscribers.add(Box::new(callback), None)
    }

    /// Total number of events accepted by [`emit`](Self::emit).
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.inner.emitted.get()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Cancel every subscription and reject further events.
    pub fn close(&self) {
        if !self.inner.closed.replace(true) {
            self.inner.subscribers.clear();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

impl<E: 'static> Source<E> for Emitter<E> {
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&E)>) -> Subscription {
        self.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn late_subscriber_sees_only_new_events() {
        let clicks = Emitter::new();
        clicks.emit(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = clicks.subscribe(move |e| l.borrow_mut().push(*e));
        clicks.emit(2);
        assert_eq!(*log.borrow(), vec![2]);
        assert_eq!(clicks.emitted(), 2);
    }

    #[test]
    fn equal_events_are_all_delivered() {
        let clicks = Emitter::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = clicks.subscribe(move |_: &()| c.set(c.get() + 1));
        clicks.emit(());
        clicks.emit(());
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn close_rejects_events() {
        let clicks = Emitter::new();
        let sub = clicks.subscribe(|_: &u8| {});
        clicks.close();
        assert!(!sub.is_active());
        assert!(!clicks.emit(1));
        assert!(!clicks.subscribe(|_| {}).is_active());
    }
}
