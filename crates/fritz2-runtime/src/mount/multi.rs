#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use fritz2_core::{Flow, Observable, Patch, Source, Subscription, diff_keyed};

use super::{Disposable, MountOptions, MountScope, MountState, check_attach};
use crate::config::RenderErrorPolicy;
use crate::error::{MountError, RenderError};
use crate::target::ChildTarget;

type Render<T, C> = Box<dyn Fn(&Flow<T>, &mut MountScope) -> Result<C, RenderError>>;

struct Entry<T, K> {
    key: K,
    value: Observable<T>,
    scope: MountScope,
}

impl<T: Clone + 'static, K> Entry<T, K> {
    fn release(self) {
        self.value.dispose();
        drop(self.scope);
    }
}

struct MultiCore<T, K, G: ChildTarget> {
    state: Cell<MountState>,
    target: RefCell<G>,
    id: Box<dyn Fn(&T) -> K>,
    render: Render<T, G::Child>,
    options: MountOptions,
    entries: RefCell<Vec<Entry<T, K>>>,
    pending: RefCell<VecDeque<Vec<T>>>,
    rendering: Cell<bool>,
    batches: Cell<u64>,
    errors: Cell<u64>,
    upstream: RefCell<Option<Subscription>>,
}

/// Mirrors a keyed list as the children of a target.
///
/// Each emission is diffed against the ids currently mounted, so a failed
/// insert is retried by the next emission instead of leaving the mirror out
/// of sync for good. Every mounted id owns an item [`Observable`]; renderers
/// receive its flow and see value changes for that id without any
/// structural patch.
pub struct MultiMount<T, K, G: ChildTarget> {
    core: Rc<MultiCore<T, K, G>>,
}

impl<T, K, G: ChildTarget> Clone for MultiMount<T, K, G> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T, K: fmt::Debug, G: ChildTarget> fmt::Debug for MultiMount<T, K, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.core.entries.borrow();
        let keys: Vec<&K> = entries.iter().map(|e| &e.key).collect();
        f.debug_struct("MultiMount")
            .field("state", &self.core.state.get())
            .field("keys", &keys)
            .field("errors", &self.core.errors.get())
            .finish()
    }
}

impl<T, K, G> MultiMount<T, K, G>
where
    T: Clone + PartialEq + 'static,
    K: Hash + Eq + Clone + fmt::Debug + 'static,
    G: ChildTarget + 'static,
{
    /// An unbound mount; nothing renders until [`attach`](Self::attach).
    pub fn new(
        id: impl Fn(&T) -> K + 'static,
        target: G,
        options: MountOptions,
        render: impl Fn(&Flow<T>, &mut MountScope) -> Result<G::Child, RenderError> + 'static,
    ) -> Self {
        Self {
            core: Rc::new(MultiCore {
                state: Cell::new(MountState::Unbound),
                target: RefCell::new(target),
                id: Box::new(id),
                render: Box::new(render),
                options,
                entries: RefCell::new(Vec::new()),
                pending: RefCell::new(VecDeque::new()),
                rendering: Cell::new(false),
                batches: Cell::new(0),
                errors: Cell::new(0),
                upstream: RefCell::new(None),
            }),
        }
    }

    /// Subscribe to `source`, mounting its current list immediately.
    pub fn attach(&self, source: &impl Source<Vec<T>>) -> Result<(), MountError> {
        check_attach(self.core.state.get())?;
        self.bind_to(source);
        Ok(())
    }

    pub(crate) fn bind_to(&self, source: &impl Source<Vec<T>>) {
        self.core.state.set(MountState::Bound);
        let weak = Rc::downgrade(&self.core);
        let sub = source.subscribe_boxed(Box::new(move |items: &Vec<T>| {
            if let Some(core) = weak.upgrade() {
                core.push(items.clone());
            }
        }));
        if self.core.state.get() == MountState::Disposed {
            sub.cancel();
        } else {
            *self.core.upstream.borrow_mut() = Some(sub);
        }
    }

    #[must_use]
    pub fn state(&self) -> MountState {
        self.core.state.get()
    }

    /// Ids currently mounted, in child order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.core.entries.borrow().iter().map(|e| e.key.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flow of the mounted item with id `key`.
    #[must_use]
    pub fn item(&self, key: &K) -> Option<Flow<T>> {
        self.core
            .entries
            .borrow()
            .iter()
            .find(|e| e.key == *key)
            .map(|e| e.value.flow())
    }

    /// Upstream emissions applied so far.
    #[must_use]
    pub fn batch_count(&self) -> u64 {
        self.core.batches.get()
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.core.errors.get()
    }

    pub fn with_target<R>(&self, f: impl FnOnce(&G) -> R) -> R {
        f(&*self.core.target.borrow())
    }

    /// Remove every mounted child, release the items and stop listening.
    pub fn dispose(&self) -> Result<(), MountError> {
        if self.core.state.replace(MountState::Disposed) == MountState::Disposed {
            return Err(MountError::Disposed);
        }
        if let Some(sub) = self.core.upstream.borrow_mut().take() {
            sub.cancel();
        }
        self.core.pending.borrow_mut().clear();
        let removed = self.core.clear_children();
        tracing::debug!(removed, "list mount disposed");
        Ok(())
    }
}

impl<T, K, G> MultiCore<T, K, G>
where
    T: Clone + PartialEq + 'static,
    K: Hash + Eq + Clone + fmt::Debug + 'static,
    G: ChildTarget + 'static,
{
    fn push(&self, items: Vec<T>) {
        if self.state.get() == MountState::Disposed {
            return;
        }
        self.pending.borrow_mut().push_back(items);
        if self.rendering.replace(true) {
            return;
        }
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(items) = next else { break };
            if self.state.get() == MountState::Disposed {
                self.pending.borrow_mut().clear();
                break;
            }
            self.apply(&items);
        }
        self.rendering.set(false);
    }

    /// Bring the children in line with `items`.
    ///
    /// A failed patch invalidates the indices of every later patch in its
    /// batch, so the rest of the batch is dropped and the remaining work is
    /// re-diffed against the ids actually mounted. Ids whose insert failed are
    /// left out until the next emission; refused deletes and moves are
    /// retried. Each round either finishes or records a failure, and the
    /// number of rounds is bounded by the size of both lists.
    fn apply(&self, items: &[T]) {
        let _span = tracing::debug_span!("mount.render", mount = "list", items = items.len()).entered();
        let mut skipped: AHashSet<K> = AHashSet::new();
        let mut rounds = items.len() + self.entries.borrow().len() + 1;
        loop {
            let filtered: Vec<T>;
            let wanted: &[T] = if skipped.is_empty() {
                items
            } else {
                filtered = items
                    .iter()
                    .filter(|item| !skipped.contains(&(self.id)(*item)))
                    .cloned()
                    .collect();
                &filtered
            };
            let mounted: Vec<K> = self.entries.borrow().iter().map(|e| e.key.clone()).collect();
            let batch = match diff_keyed(&mounted, wanted, &self.id) {
                Ok(batch) => batch,
                Err(err) => {
                    self.fail(RenderError::from(err));
                    return;
                }
            };
            tracing::trace!(patches = batch.len(), "applying list batch");
            let Err((err, failed_insert)) = self.apply_patches(batch) else {
                break;
            };
            self.fail(err);
            if self.options.effective_policy() == RenderErrorPolicy::ClearAndContinue {
                return;
            }
            rounds -= 1;
            if rounds == 0 {
                tracing::warn!(mounted = self.entries.borrow().len(), "list mount gave up reconciling");
                break;
            }
            if let Some(key) = failed_insert {
                skipped.insert(key);
            }
        }
        self.batches.set(self.batches.get() + 1);
        self.refresh_values(items);
    }

    /// Apply `batch` in order, stopping at the first failure. The error
    /// carries the id of a failed insert.
    fn apply_patches(&self, batch: Vec<Patch<T, K>>) -> Result<(), (RenderError, Option<K>)> {
        for patch in batch {
            let insert = match &patch {
                Patch::Insert { id, .. } => Some(id.clone()),
                _ => None,
            };
            self.apply_patch(patch).map_err(|err| (err, insert))?;
        }
        Ok(())
    }

    fn apply_patch(&self, patch: Patch<T, K>) -> Result<(), RenderError> {
        match patch {
            Patch::Insert { id, index, item } => {
                let value = Observable::new(item);
                let mut scope = MountScope::new();
                let child = (self.render)(&value.flow(), &mut scope)?;
                self.target.borrow_mut().insert_child(index, child)?;
                self.entries.borrow_mut().insert(
                    index,
                    Entry {
                        key: id,
                        value,
                        scope,
                    },
                );
            }
            Patch::Delete { id, .. } => {
                let Some(at) = self.position(&id) else {
                    return Ok(());
                };
                self.target.borrow_mut().remove_child(at)?;
                let entry = self.entries.borrow_mut().remove(at);
                entry.release();
            }
            Patch::Move { id, to, .. } => {
                let Some(from) = self.position(&id) else {
                    return Ok(());
                };
                if from != to {
                    self.target.borrow_mut().move_child(from, to)?;
                    let mut entries = self.entries.borrow_mut();
                    let entry = entries.remove(from);
                    entries.insert(to, entry);
                }
            }
        }
        Ok(())
    }

    /// Push the latest value of every surviving id into its item observable.
    fn refresh_values(&self, items: &[T]) {
        let latest: AHashMap<K, &T> = items.iter().map(|item| ((self.id)(item), item)).collect();
        let updates: Vec<(Observable<T>, T)> = self
            .entries
            .borrow()
            .iter()
            .filter_map(|e| latest.get(&e.key).map(|item| (e.value.clone(), (*item).clone())))
            .collect();
        for (value, item) in updates {
            value.set(item);
        }
    }

    fn position(&self, key: &K) -> Option<usize> {
        self.entries.borrow().iter().position(|e| e.key == *key)
    }

    fn fail(&self, err: RenderError) {
        self.errors.set(self.errors.get() + 1);
        self.options.report("list", &err);
        if self.options.effective_policy() == RenderErrorPolicy::ClearAndContinue {
            self.clear_children();
        }
    }

    /// Remove every child, last first. Returns how many were removed.
    fn clear_children(&self) -> usize {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        let count = entries.len();
        for (index, entry) in entries.into_iter().enumerate().rev() {
            if let Err(err) = self.target.borrow_mut().remove_child(index) {
                tracing::warn!(index, error = %err, "target refused child removal");
            }
            entry.release();
        }
        count
    }
}

impl<T, K, G> Disposable for MultiMount<T, K, G>
where
    T: Clone + PartialEq + 'static,
    K: Hash + Eq + Clone + fmt::Debug + 'static,
    G: ChildTarget + 'static,
{
    fn dispose(&self) -> Result<(), MountError> {
        MultiMount::dispose(self)
    }

    fn is_disposed(&self) -> bool {
        self.state() == MountState::Disposed
    }
}
