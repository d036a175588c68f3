#![forbid(unsafe_code)]

//! State containers with a serialized update queue.
//!
//! A [`RootStore`] owns its state and a single worker task on the runtime's
//! local pool. Every [`Handler`] call becomes a [`Job`] on the root's FIFO
//! queue; the worker applies jobs one at a time to the latest state,
//! awaiting asynchronous reducers before touching the next job.
//!
//! A [`SubStore`] is a lens-focused view of a parent. It has no queue of its
//! own: its jobs are re-targeted at the parent state and forwarded, so
//! updates through any sub-store of a root are ordered with every other update
//! of that root.
//!
//! # Invariants
//!
//! 1. Jobs of one root store run in submission order, never concurrently.
//! 2. A reducer always receives the state left by the previous job.
//! 3. A failed reducer does not stop the queue; the error handler decides
//!    the state that is kept.
//! 4. `data()` of a sub-store is deduplicated: unrelated parent changes do
//!    not re-emit.
//! 5. After `dispose()`, every enqueue fails with [`StoreError::Disposed`].

pub(crate) mod root;
mod sub;

pub use root::RootStore;
pub use sub::SubStore;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use fritz2_core::{Emitter, Flow, Lens};
use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::{HandlerError, StoreError};
use crate::handler::Handler;

type Reducer<T> = Box<dyn FnOnce(T) -> LocalBoxFuture<'static, Result<T, HandlerError>>>;

/// One queued unit of work: a reducer with its payload already bound.
pub struct Job<T> {
    handler: Rc<str>,
    reducer: Reducer<T>,
    after: Option<Box<dyn FnOnce()>>,
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("handler", &self.handler).finish()
    }
}

impl<T: 'static> Job<T> {
    pub fn new(
        handler: impl Into<Rc<str>>,
        reducer: impl FnOnce(T) -> LocalBoxFuture<'static, Result<T, HandlerError>> + 'static,
    ) -> Self {
        Self {
            handler: handler.into(),
            reducer: Box::new(reducer),
            after: None,
        }
    }

    /// Run `after` once the job's result has been published.
    #[must_use]
    pub fn then_run(mut self, after: impl FnOnce() + 'static) -> Self {
        self.after = Some(Box::new(after));
        self
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Re-target this job at the whole `P` that `lens` focuses into.
    pub fn focus<P: 'static>(self, lens: Lens<P, T>) -> Job<P> {
        let Job {
            handler,
            reducer,
            after,
        } = self;
        Job {
            handler,
            reducer: Box::new(move |whole: P| {
                let part = reducer(lens.get(&whole));
                async move {
                    let part = part.await?;
                    Ok(lens.set(whole, part))
                }
                .boxed_local()
            }),
            after,
        }
    }

    pub(crate) fn into_parts(self) -> (Rc<str>, Reducer<T>, Option<Box<dyn FnOnce()>>) {
        (self.handler, self.reducer, self.after)
    }
}

/// The surface shared by root stores and sub-stores.
pub trait Store<T: Clone + 'static>: Clone + 'static {
    /// Dotted path naming this store (`root.field.nested`).
    fn id(&self) -> &str;

    /// Read-only view of the state.
    fn data(&self) -> Flow<T>;

    /// Queue a job. Fails once the store (or its root) is disposed.
    fn enqueue(&self, job: Job<T>) -> Result<(), StoreError>;

    fn is_disposed(&self) -> bool;

    /// Stop accepting jobs. Disposing a root also stops its worker.
    fn dispose(&self);

    fn current(&self) -> T {
        self.data().get()
    }

    /// Pure reducer handler.
    fn handle<P: 'static>(&self, reducer: impl Fn(T, P) -> T + 'static) -> Handler<P> {
        self.try_handle(move |state, payload| Ok(reducer(state, payload)))
    }

    /// Fallible reducer handler; errors go to the root's error handler.
    fn try_handle<P: 'static>(
        &self,
        reducer: impl Fn(T, P) -> Result<T, HandlerError> + 'static,
    ) -> Handler<P> {
        let reducer = Rc::new(reducer);
        let store = self.clone();
        Handler::new(self.id(), move |name, payload: P| {
            let reducer = Rc::clone(&reducer);
            store.enqueue(Job::new(name, move |state| {
                future::ready(reducer(state, payload)).boxed_local()
            }))
        })
    }

    /// Asynchronous reducer handler. The queue waits for the future before
    /// running the next job.
    fn handle_async<P, F>(&self, reducer: impl Fn(T, P) -> F + 'static) -> Handler<P>
    where
        P: 'static,
        F: Future<Output = Result<T, HandlerError>> + 'static,
    {
        let reducer = Rc::new(reducer);
        let store = self.clone();
        Handler::new(self.id(), move |name, payload: P| {
            let reducer = Rc::clone(&reducer);
            store.enqueue(Job::new(name, move |state| reducer(state, payload).boxed_local()))
        })
    }

    /// Reducer with a side output. The emitter fires after the new state has
    /// been published, and only for successful jobs.
    fn handle_and_emit<P: 'static, R: 'static>(
        &self,
        reducer: impl Fn(T, P) -> (T, R) + 'static,
    ) -> (Handler<P>, Emitter<R>) {
        let reducer = Rc::new(reducer);
        let events = Emitter::new();
        let out = events.clone();
        let store = self.clone();
        let handler = Handler::new(self.id(), move |name, payload: P| {
            let reducer = Rc::clone(&reducer);
            let slot: Rc<RefCell<Option<R>>> = Rc::new(RefCell::new(None));
            let write = Rc::clone(&slot);
            let out = out.clone();
            let job = Job::new(name, move |state| {
                let (next, emitted) = reducer(state, payload);
                *write.borrow_mut() = Some(emitted);
                future::ready(Ok(next)).boxed_local()
            })
            .then_run(move || {
                if let Some(emitted) = slot.borrow_mut().take() {
                    out.emit(emitted);
                }
            });
            store.enqueue(job)
        });
        (handler, events)
    }

    /// Handler replacing the whole state.
    fn update(&self) -> Handler<T> {
        self.handle(|_, next| next).named("update")
    }

    /// Lens-focused sub-store with id `self.id().lens.id()`.
    fn sub<S: Clone + PartialEq + 'static>(&self, lens: Lens<T, S>) -> SubStore<S> {
        SubStore::new(self, lens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fritz2_core::lens;

    #[derive(Clone, Debug, PartialEq)]
    struct Pair {
        left: i32,
        right: i32,
    }

    #[test]
    fn focused_job_rewrites_only_its_part() {
        let left: Lens<Pair, i32> = lens!(Pair, left);
        let job = Job::new("inc", |v: i32| future::ready(Ok(v + 1)).boxed_local()).focus(left);
        assert_eq!(job.handler(), "inc");
        let (_, reducer, after) = job.into_parts();
        assert!(after.is_none());
        let next = futures::executor::block_on(reducer(Pair { left: 1, right: 7 })).unwrap();
        assert_eq!(next, Pair { left: 2, right: 7 });
    }

    #[test]
    fn focused_job_propagates_errors() {
        let right: Lens<Pair, i32> = lens!(Pair, right);
        let job = Job::new("fail", |_: i32| {
            future::ready(Err(HandlerError::msg("nope"))).boxed_local()
        })
        .focus(right);
        let (_, reducer, _) = job.into_parts();
        let err = futures::executor::block_on(reducer(Pair { left: 0, right: 0 })).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
