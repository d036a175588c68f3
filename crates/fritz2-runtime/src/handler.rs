#![forbid(unsafe_code)]

//! Callable handles that enqueue work on a store.

use std::fmt;
use std::rc::Rc;

use crate::error::StoreError;

type Submit<P> = Rc<dyn Fn(Rc<str>, P) -> Result<(), StoreError>>;

/// A reducer bound to a store.
///
/// Calling a handler never runs the reducer inline: it enqueues a job on the
/// owning root store's queue and returns. Cloning yields another handle to the
/// same reducer.
pub struct Handler<P> {
    store: Rc<str>,
    name: Rc<str>,
    submit: Submit<P>,
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            name: Rc::clone(&self.name),
            submit: Rc::clone(&self.submit),
        }
    }
}

impl<P> fmt::Debug for Handler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("store", &self.store)
            .field("name", &self.name)
            .finish()
    }
}

impl<P: 'static> Handler<P> {
    pub(crate) fn new(
        store: &str,
        submit: impl Fn(Rc<str>, P) -> Result<(), StoreError> + 'static,
    ) -> Self {
        Self {
            store: Rc::from(store),
            name: Rc::from("handler"),
            submit: Rc::new(submit),
        }
    }

    /// Enqueue `payload`. Fails only when the store has been disposed.
    pub fn call(&self, payload: P) -> Result<(), StoreError> {
        (self.submit)(Rc::clone(&self.name), payload)
    }

    /// Rename the handler; the name shows up in update spans and error logs.
    #[must_use]
    pub fn named(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the store this handler enqueues on.
    #[must_use]
    pub fn store_id(&self) -> &str {
        &self.store
    }

    /// A handler taking `Q`, converting it to `P` before enqueueing.
    #[must_use]
    pub fn contramap<Q: 'static>(&self, map: impl Fn(Q) -> P + 'static) -> Handler<Q> {
        let submit = Rc::clone(&self.submit);
        Handler {
            store: Rc::clone(&self.store),
            name: Rc::clone(&self.name),
            submit: Rc::new(move |name, payload| submit(name, map(payload))),
        }
    }
}
