#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use fritz2_core::{Flow, Observable};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::{AbortHandle, Abortable};
use futures::StreamExt;
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::Instrument;

use super::{Job, Store};
use crate::config::{RuntimeConfig, StoreErrorPolicy};
use crate::error::{HandlerError, StoreError};

static STORE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_store_id() -> Rc<str> {
    Rc::from(format!("store-{}", STORE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)))
}

type ErrorHandler<T> = Rc<dyn Fn(&HandlerError, &T) -> T>;

struct RootInner<T> {
    id: Rc<str>,
    data: Observable<T>,
    queue: RefCell<Option<UnboundedSender<Job<T>>>>,
    worker: RefCell<Option<AbortHandle>>,
    on_error: RefCell<Option<ErrorHandler<T>>>,
    config: Option<Flow<RuntimeConfig>>,
    applied: Cell<u64>,
    failed: Cell<u64>,
}

/// A store that owns its state and drains its own update queue.
///
/// Cloning yields another handle to the same store.
pub struct RootStore<T> {
    inner: Rc<RootInner<T>>,
}

impl<T> Clone for RootStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for RootStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootStore")
            .field("id", &self.inner.id)
            .field("data", &self.inner.data)
            .field("disposed", &self.inner.queue.borrow().is_none())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> RootStore<T> {
    /// Create a store and spawn its queue worker on `spawner`.
    ///
    /// The id defaults to `store-N`.
    pub fn new(initial: T, spawner: &impl LocalSpawn) -> Result<Self, StoreError> {
        Self::spawn(next_store_id(), initial, spawner, None)
    }

    pub fn with_id(
        id: impl Into<Rc<str>>,
        initial: T,
        spawner: &impl LocalSpawn,
    ) -> Result<Self, StoreError> {
        Self::spawn(id.into(), initial, spawner, None)
    }

    pub(crate) fn spawn(
        id: Rc<str>,
        initial: T,
        spawner: &impl LocalSpawn,
        config: Option<Flow<RuntimeConfig>>,
    ) -> Result<Self, StoreError> {
        let (sender, receiver) = mpsc::unbounded();
        let inner = Rc::new(RootInner {
            id,
            data: Observable::new(initial),
            queue: RefCell::new(Some(sender)),
            worker: RefCell::new(None),
            on_error: RefCell::new(None),
            config,
            applied: Cell::new(0),
            failed: Cell::new(0),
        });
        let (abort, registration) = AbortHandle::new_pair();
        let worker = Abortable::new(drain(Rc::downgrade(&inner), receiver), registration);
        spawner
            .spawn_local(async move {
                let _ = worker.await;
            })
            .map_err(|source| StoreError::Spawn {
                store: inner.id.to_string(),
                source,
            })?;
        *inner.worker.borrow_mut() = Some(abort);
        tracing::debug!(store = %inner.id, "store created");
        Ok(Self { inner })
    }

    /// Replace the error handler. It receives the reducer's error and the
    /// state before the job; its return value becomes the state.
    pub fn set_error_handler(&self, handler: impl Fn(&HandlerError, &T) -> T + 'static) {
        *self.inner.on_error.borrow_mut() = Some(Rc::new(handler));
    }

    #[must_use]
    pub fn with_error_handler(self, handler: impl Fn(&HandlerError, &T) -> T + 'static) -> Self {
        self.set_error_handler(handler);
        self
    }

    /// Jobs that completed successfully.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.inner.applied.get()
    }

    /// Jobs whose reducer failed.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.inner.failed.get()
    }
}

impl<T: Clone + PartialEq + 'static> Store<T> for RootStore<T> {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn data(&self) -> Flow<T> {
        self.inner.data.flow()
    }

    fn enqueue(&self, job: Job<T>) -> Result<(), StoreError> {
        let queue = self.inner.queue.borrow();
        let Some(sender) = queue.as_ref() else {
            return Err(StoreError::disposed(&self.inner.id));
        };
        sender
            .unbounded_send(job)
            .map_err(|_| StoreError::disposed(&self.inner.id))
    }

    fn is_disposed(&self) -> bool {
        self.inner.queue.borrow().is_none()
    }

    fn dispose(&self) {
        let Some(sender) = self.inner.queue.borrow_mut().take() else {
            return;
        };
        sender.close_channel();
        if let Some(worker) = self.inner.worker.borrow_mut().take() {
            worker.abort();
        }
        self.inner.data.dispose();
        tracing::debug!(store = %self.inner.id, "store disposed");
    }
}

async fn drain<T: Clone + PartialEq + 'static>(
    store: Weak<RootInner<T>>,
    mut jobs: UnboundedReceiver<Job<T>>,
) {
    while let Some(job) = jobs.next().await {
        let Some(inner) = store.upgrade() else { break };
        let (handler, reducer, after) = job.into_parts();
        let before = inner.data.get();
        let span = tracing::debug_span!("store.update", store = %inner.id, handler = %handler);
        drop(inner);

        let outcome = reducer(before.clone()).instrument(span).await;

        let Some(inner) = store.upgrade() else { break };
        let next = match outcome {
            Ok(next) => {
                inner.applied.set(inner.applied.get() + 1);
                next
            }
            Err(err) => {
                inner.failed.set(inner.failed.get() + 1);
                recover(&inner, &handler, &err, &before)
            }
        };
        let changed = inner.data.set(next);
        if inner.config.as_ref().is_some_and(|c| c.with(|c| c.trace_updates)) {
            tracing::trace!(
                store = %inner.id,
                handler = %handler,
                changed,
                version = inner.data.version(),
                "store updated"
            );
        }
        drop(inner);
        if let Some(after) = after {
            after();
        }
    }
}

fn recover<T: Clone>(inner: &RootInner<T>, handler: &str, err: &HandlerError, before: &T) -> T {
    let custom = inner.on_error.borrow().clone();
    if let Some(on_error) = custom {
        return on_error(err, before);
    }
    let policy = inner
        .config
        .as_ref()
        .map_or(StoreErrorPolicy::default(), |c| c.with(|c| c.store_errors));
    if policy == StoreErrorPolicy::LogAndKeep {
        tracing::error!(store = %inner.id, handler, error = %err, "handler failed, keeping previous state");
    }
    before.clone()
}
