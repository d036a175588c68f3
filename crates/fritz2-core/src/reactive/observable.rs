#![forbid(unsafe_code)]

//! Single-slot reactive values.
//!
//! [`Observable<T>`] owns the current value; [`Flow<T>`] is a read-only handle
//! onto the same slot (what stores hand out so that nobody bypasses their
//! update queue).
//!
//! # Invariants
//!
//! 1. Subscribing delivers the current value immediately, then every later
//!    value in emission order.
//! 2. `set` with a value equal to the current one (under the comparison
//!    policy) is a no-op: no version bump, no notification.
//! 3. Version increments exactly once per accepted change.
//! 4. `set` from inside a subscriber callback is applied immediately but its
//!    notification is queued behind the emission in flight.
//!
//! # Failure Modes
//!
//! - Re-entrant `with()` that calls `set()` on the same observable panics
//!   (RefCell double borrow); use `get()` inside callbacks instead.
//! - Subscribing to a disposed observable replays the current value and
//!   returns an inert [`Subscription`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::source::Source;
use super::subscribers::{Subscribers, Subscription};

type EqFn<T> = Box<dyn Fn(&T, &T) -> bool>;

struct ObservableInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    eq: EqFn<T>,
    subscribers: Subscribers<T>,
    disposed: Cell<bool>,
    /// Upstream subscriptions of derived observables.
    upstream: RefCell<Vec<Subscription>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates another handle to the **same** slot.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable that suppresses updates equal under `PartialEq`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_eq(value, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Create an observable with a custom comparison policy. `eq` returning
    /// `true` means "same value, do not notify".
    #[must_use]
    pub fn with_eq(value: T, eq: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                eq: Box::new(eq),
                subscribers: Subscribers::new(),
                disposed: Cell::new(false),
                upstream: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create an observable that notifies on every `set`, equal or not.
    #[must_use]
    pub fn always_notify(value: T) -> Self {
        Self::with_eq(value, |_, _| false)
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Returns whether the value was accepted as a change.
    pub fn set(&self, value: T) -> bool {
        if (self.inner.eq)(&self.inner.value.borrow(), &value) {
            return false;
        }
        *self.inner.value.borrow_mut() = value.clone();
        self.inner.version.set(self.inner.version.get() + 1);
        if !self.inner.disposed.get() {
            self.inner.subscribers.publish(value);
        }
        true
    }

    /// Apply `f` to a clone of the current value and `set` the result.
    pub fn update(&self, f: impl FnOnce(T) -> T) -> bool {
        self.set(f(self.get()))
    }

    /// Subscribe to changes. The callback runs immediately with the current
    /// value, then after every accepted change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let current = self.get();
        if self.inner.disposed.get() {
            callback(&current);
            return Subscription::inert();
        }
        self.inner.subscribers.add(Box::new(callback), Some(&current))
    }

    /// Version counter, bumped once per accepted change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Read-only handle onto this observable.
    #[must_use]
    pub fn flow(&self) -> Flow<T> {
        Flow {
            source: self.clone(),
        }
    }

    /// Derive a deduplicated read-only view. The derived flow keeps its
    /// upstream subscription alive for as long as any handle to it exists.
    pub fn map<U: Clone + PartialEq + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Flow<U> {
        let derived = Observable::new(self.with(&f));
        let weak = Rc::downgrade(&derived.inner);
        let upstream = self.subscribe(move |value| {
            if let Some(inner) = weak.upgrade() {
                Observable { inner }.set(f(value));
            }
        });
        derived.inner.upstream.borrow_mut().push(upstream);
        derived.flow()
    }

    /// Cancel every subscription (including upstream links of derived
    /// observables). The value stays readable.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        self.inner.subscribers.clear();
        for sub in self.inner.upstream.borrow_mut().drain(..) {
            sub.cancel();
        }
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Whether both handles point at the same slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Source<T> for Observable<T> {
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.subscribe(callback)
    }
}

/// Read-only view of an [`Observable`].
pub struct Flow<T> {
    source: Observable<T>,
}

impl<T> Clone for Flow<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Flow<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Flow").field(&self.source).finish()
    }
}

impl<T: Clone + 'static> Flow<T> {
    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    /// Borrow the current value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    /// See [`Observable::subscribe`].
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }

    /// See [`Observable::map`].
    pub fn map<U: Clone + PartialEq + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> Flow<U> {
        self.source.map(f)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.source.subscriber_count()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.source.is_disposed()
    }
}

impl<T: Clone + 'static> Source<T> for Flow<T> {
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        self.source.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>(obs: &Observable<T>) -> (Rc<RefCell<Vec<T>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let sub = obs.subscribe(move |v| l.borrow_mut().push(v.clone()));
        (log, sub)
    }

    #[test]
    fn replays_current_value_on_subscribe() {
        let obs = Observable::new(5);
        let (log, _sub) = recorder(&obs);
        assert_eq!(*log.borrow(), vec![5]);
        obs.set(6);
        assert_eq!(*log.borrow(), vec![5, 6]);
    }

    #[test]
    fn equal_value_is_a_noop() {
        let obs = Observable::new(1);
        let (log, _sub) = recorder(&obs);
        assert!(!obs.set(1));
        assert_eq!(obs.version(), 0);
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn always_notify_ignores_equality() {
        let obs = Observable::always_notify(1);
        let (log, _sub) = recorder(&obs);
        assert!(obs.set(1));
        assert_eq!(*log.borrow(), vec![1, 1]);
    }

    #[test]
    fn version_increments_once_per_change() {
        let obs = Observable::new(0);
        obs.set(1);
        obs.set(1);
        obs.set(2);
        assert_eq!(obs.version(), 2);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let obs = Observable::new(0);
        let (log, sub) = recorder(&obs);
        drop(sub);
        obs.set(9);
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn cancelling_one_subscriber_leaves_siblings() {
        let obs = Observable::new(0);
        let (a, sub_a) = recorder(&obs);
        let (b, _sub_b) = recorder(&obs);
        sub_a.cancel();
        obs.set(3);
        assert_eq!(*a.borrow(), vec![0]);
        assert_eq!(*b.borrow(), vec![0, 3]);
    }

    #[test]
    fn reentrant_set_is_queued_not_recursive() {
        let obs = Observable::new(0);
        let trail = Rc::new(RefCell::new(Vec::new()));

        let o = obs.clone();
        let t = Rc::clone(&trail);
        let _bump = obs.subscribe(move |v| {
            t.borrow_mut().push(("first", *v));
            if *v > 0 && *v < 3 {
                o.set(v + 1);
            }
        });
        let t = Rc::clone(&trail);
        let _watch = obs.subscribe(move |v| t.borrow_mut().push(("second", *v)));

        trail.borrow_mut().clear();
        obs.set(1);
        assert_eq!(
            *trail.borrow(),
            vec![
                ("first", 1),
                ("second", 1),
                ("first", 2),
                ("second", 2),
                ("first", 3),
                ("second", 3),
            ]
        );
        assert_eq!(obs.get(), 3);
    }

    #[test]
    fn late_subscriber_never_sees_older_queued_value() {
        let obs = Observable::new(0);
        let late_log: Rc<RefCell<Vec<i32>>> = Rc::new(RefCell::new(Vec::new()));
        let late_sub: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let o = obs.clone();
        let log = Rc::clone(&late_log);
        let holder = Rc::clone(&late_sub);
        let _driver = obs.subscribe(move |v| {
            if *v == 1 {
                o.set(2);
                o.set(3);
                let l = Rc::clone(&log);
                *holder.borrow_mut() = Some(o.subscribe(move |v| l.borrow_mut().push(*v)));
            }
        });

        obs.set(1);
        assert_eq!(*late_log.borrow(), vec![3]);
    }

    #[test]
    fn map_is_deduplicated() {
        let obs = Observable::new(10);
        let parity = obs.map(|v| v % 2);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let _sub = parity.subscribe(move |v| l.borrow_mut().push(*v));

        obs.set(12);
        obs.set(13);
        obs.set(15);
        assert_eq!(*log.borrow(), vec![0, 1]);
    }

    #[test]
    fn derived_flow_releases_upstream_on_drop() {
        let obs = Observable::new(1);
        let doubled = obs.map(|v| v * 2);
        assert_eq!(obs.subscriber_count(), 1);
        drop(doubled);
        obs.set(2);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn dispose_cancels_subscribers() {
        let obs = Observable::new(0);
        let (log, sub) = recorder(&obs);
        obs.dispose();
        obs.set(4);
        assert!(!sub.is_active());
        assert_eq!(*log.borrow(), vec![0]);
        assert_eq!(obs.get(), 4);

        let (late, late_sub) = recorder(&obs);
        assert_eq!(*late.borrow(), vec![4]);
        assert!(!late_sub.is_active());
    }

    #[test]
    fn custom_policy_controls_dedup() {
        let obs = Observable::with_eq(String::from("a"), |a, b| a.eq_ignore_ascii_case(b));
        assert!(!obs.set("A".into()));
        assert!(obs.set("b".into()));
    }

    #[test]
    fn debug_reports_value_and_live_subscribers() {
        let obs = Observable::new(3);
        let _sub = obs.subscribe(|_| {});
        let text = format!("{obs:?}");
        assert!(text.contains("value: 3"), "{text}");
        assert!(text.contains("subscribers: 1"), "{text}");
        assert!(format!("{:?}", obs.flow()).starts_with("Flow(Observable"));
    }

    #[test]
    fn flow_is_read_only_view() {
        let obs = Observable::new(1);
        let flow = obs.flow();
        obs.set(2);
        assert_eq!(flow.get(), 2);
        assert_eq!(flow.version(), 1);
    }
}
