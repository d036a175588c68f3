#![forbid(unsafe_code)]

//! Patch batches derived from a stream of list versions.
//!
//! [`PatchStream`] is the patch feed for adapters that manage their own
//! children (a native widget list, a remote mirror, a log). In-process list
//! mounts do not consume it: `bind_list` diffs against the ids it actually
//! mounted, so it can recover from a refused operation, which a fixed feed of
//! precomputed batches cannot.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use super::{ListDiffer, Patch, diff_keyed};
use crate::reactive::{Emitter, Source, Subscription};

struct StreamInner<T, K> {
    differ: RefCell<ListDiffer<T, K>>,
    latest: RefCell<Vec<T>>,
    batches: Emitter<Vec<Patch<T, K>>>,
    rejected: Cell<u64>,
    upstream: RefCell<Option<Subscription>>,
}

/// Turns every upstream list emission into one patch batch.
///
/// Subscribing replays the current list as a pure insert batch, so a late
/// subscriber that applies batches to an empty mirror ends up in sync. Lists
/// with duplicate ids are logged and skipped; the next valid list is diffed
/// against the last good one.
pub struct PatchStream<T, K> {
    inner: Rc<StreamInner<T, K>>,
}

impl<T, K> Clone for PatchStream<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, K> PatchStream<T, K>
where
    T: Clone + 'static,
    K: Hash + Eq + Clone + Debug + 'static,
{
    pub fn new(source: &impl Source<Vec<T>>, id: impl Fn(&T) -> K + 'static) -> Self {
        let inner = Rc::new(StreamInner {
            differ: RefCell::new(ListDiffer::new(id)),
            latest: RefCell::new(Vec::new()),
            batches: Emitter::new(),
            rejected: Cell::new(0),
            upstream: RefCell::new(None),
        });
        let weak = Rc::downgrade(&inner);
        let upstream = source.subscribe_boxed(Box::new(move |items: &Vec<T>| {
            let Some(inner) = weak.upgrade() else { return };
            let result = inner.differ.borrow_mut().next(items);
            match result {
                Ok(batch) => {
                    *inner.latest.borrow_mut() = items.clone();
                    inner.batches.emit(batch);
                }
                Err(err) => {
                    inner.rejected.set(inner.rejected.get() + 1);
                    tracing::warn!(error = %err, "patch stream skipped list version");
                }
            }
        }));
        *inner.upstream.borrow_mut() = Some(upstream);
        Self { inner }
    }

    /// Subscribe to future batches after receiving the replay batch.
    pub fn subscribe(&self, callback: impl Fn(&Vec<Patch<T, K>>) + 'static) -> Subscription {
        let replay = {
            let differ = self.inner.differ.borrow();
            let latest = self.inner.latest.borrow();
            let empty: &[K] = &[];
            diff_keyed(empty, latest.as_slice(), |item| differ.key_of(item))
        };
        match replay {
            Ok(batch) => callback(&batch),
            Err(err) => tracing::warn!(error = %err, "patch stream replay failed"),
        }
        self.inner.batches.subscribe(callback)
    }

    /// Key sequence of the last accepted list.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.differ.borrow().keys().to_vec()
    }

    /// Number of upstream versions rejected for duplicate ids.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.inner.rejected.get()
    }

    /// Detach from the upstream source and drop all subscribers.
    pub fn close(&self) {
        if let Some(sub) = self.inner.upstream.borrow_mut().take() {
            sub.cancel();
        }
        self.inner.batches.close();
    }
}

impl<T, K> Source<Vec<Patch<T, K>>> for PatchStream<T, K>
where
    T: Clone + 'static,
    K: Hash + Eq + Clone + Debug + 'static,
{
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&Vec<Patch<T, K>>)>) -> Subscription {
        self.subscribe(callback)
    }
}
