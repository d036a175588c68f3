#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use fritz2_core::{Flow, Lens, Observable, Subscription};

use super::{Job, Store};
use crate::error::StoreError;

type Forward<S> = Box<dyn Fn(Job<S>) -> Result<(), StoreError>>;

struct SubInner<S> {
    id: Rc<str>,
    data: Observable<S>,
    upstream: RefCell<Option<Subscription>>,
    forward: Forward<S>,
    parent_disposed: Box<dyn Fn() -> bool>,
    disposed: Cell<bool>,
}

/// A lens-focused view of a parent store.
///
/// Reads are the parent's data mapped through the lens and deduplicated.
/// Writes are re-targeted at the parent state and go through the parent's
/// queue, so a sub-store never owns state of its own.
pub struct SubStore<S> {
    inner: Rc<SubInner<S>>,
}

impl<S> Clone for SubStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug + 'static> fmt::Debug for SubStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStore")
            .field("id", &self.inner.id)
            .field("data", &self.inner.data)
            .finish()
    }
}

impl<S: Clone + PartialEq + 'static> SubStore<S> {
    pub(crate) fn new<T, P>(parent: &P, lens: Lens<T, S>) -> Self
    where
        T: Clone + 'static,
        P: Store<T>,
    {
        let parent_data = parent.data();
        let data = Observable::new(parent_data.with(|whole| lens.get(whole)));
        let slot = data.clone();
        let read = lens.clone();
        let upstream = parent_data.subscribe(move |whole| {
            slot.set(read.get(whole));
        });

        let id: Rc<str> = Rc::from(format!("{}.{}", parent.id(), lens.id()));
        let target = parent.clone();
        let probe = parent.clone();
        Self {
            inner: Rc::new(SubInner {
                id,
                data,
                upstream: RefCell::new(Some(upstream)),
                forward: Box::new(move |job: Job<S>| target.enqueue(job.focus(lens.clone()))),
                parent_disposed: Box::new(move || probe.is_disposed()),
                disposed: Cell::new(false),
            }),
        }
    }
}

impl<S: Clone + PartialEq + 'static> Store<S> for SubStore<S> {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn data(&self) -> Flow<S> {
        self.inner.data.flow()
    }

    fn enqueue(&self, job: Job<S>) -> Result<(), StoreError> {
        if self.inner.disposed.get() {
            return Err(StoreError::disposed(&self.inner.id));
        }
        (self.inner.forward)(job)
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get() || (self.inner.parent_disposed)()
    }

    /// Detach from the parent. The parent and its other sub-stores keep
    /// working.
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(sub) = self.inner.upstream.borrow_mut().take() {
            sub.cancel();
        }
        self.inner.data.dispose();
        tracing::debug!(store = %self.inner.id, "sub-store disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RootStore;
    use fritz2_core::lens;
    use futures::executor::LocalPool;

    #[derive(Clone, Debug, PartialEq)]
    struct Address {
        city: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Person {
        name: String,
        age: u32,
        address: Address,
    }

    fn heinz() -> Person {
        Person {
            name: "Heinz".into(),
            age: 18,
            address: Address {
                city: "Hamburg".into(),
            },
        }
    }

    #[test]
    fn sub_store_id_is_dotted_path() {
        let pool = LocalPool::new();
        let person = RootStore::with_id("person", heinz(), &pool.spawner()).unwrap();
        let address = person.sub(lens!(Person, address));
        let city = address.sub(lens!(Address, city));
        assert_eq!(address.id(), "person.address");
        assert_eq!(city.id(), "person.address.city");
        assert_eq!(city.current(), "Hamburg");
    }

    #[test]
    fn debug_names_store_and_data() {
        let pool = LocalPool::new();
        let person = RootStore::with_id("person", heinz(), &pool.spawner()).unwrap();
        let age = person.sub(lens!(Person, age));
        let root = format!("{person:?}");
        assert!(root.starts_with("RootStore"), "{root}");
        assert!(root.contains("\"person\""), "{root}");
        let sub = format!("{age:?}");
        assert!(sub.contains("person.age"), "{sub}");
        assert!(sub.contains("value: 18"), "{sub}");
    }

    #[test]
    fn writes_go_through_parent_queue() {
        let mut pool = LocalPool::new();
        let person = RootStore::new(heinz(), &pool.spawner()).unwrap();
        let city = person.sub(lens!(Person, address)).sub(lens!(Address, city));
        let rename = person.handle(|p: Person, name: &'static str| Person {
            name: name.into(),
            ..p
        });

        rename.call("Karl").unwrap();
        city.update().call("Berlin".into()).unwrap();
        pool.run_until_stalled();

        let now = person.current();
        assert_eq!(now.name, "Karl");
        assert_eq!(now.address.city, "Berlin");
        assert_eq!(city.current(), "Berlin");
    }

    #[test]
    fn unrelated_parent_changes_do_not_re_emit() {
        let mut pool = LocalPool::new();
        let person = RootStore::new(heinz(), &pool.spawner()).unwrap();
        let age = person.sub(lens!(Person, age));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = age.data().subscribe(move |a| s.borrow_mut().push(*a));

        person.handle(|p: Person, ()| Person { name: "Otto".into(), ..p }).call(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(*seen.borrow(), vec![18]);
    }

    #[test]
    fn disposing_sub_leaves_parent_running() {
        let mut pool = LocalPool::new();
        let person = RootStore::new(heinz(), &pool.spawner()).unwrap();
        let age = person.sub(lens!(Person, age));
        let grow = age.handle(|a, ()| a + 1);
        age.dispose();
        assert!(age.is_disposed());
        assert!(grow.call(()).unwrap_err().is_disposed());

        person.update().call(Person { age: 30, ..heinz() }).unwrap();
        pool.run_until_stalled();
        assert_eq!(person.current().age, 30);
        assert_eq!(age.current(), 18);
    }

    #[test]
    fn disposed_root_disposes_its_views() {
        let pool = LocalPool::new();
        let person = RootStore::new(heinz(), &pool.spawner()).unwrap();
        let age = person.sub(lens!(Person, age));
        person.dispose();
        assert!(age.is_disposed());
        assert!(age.update().call(1).unwrap_err().is_disposed());
    }
}
