#![forbid(unsafe_code)]

//! Wiring event sources to handlers.
//!
//! Every event a source pushes becomes one handler call. A handler that
//! fails (its store was disposed) is logged at `warn` and the event dropped;
//! the subscription stays active so the caller decides when to tear it down.
//!
//! Replaying sources (observables, store data) deliver their current value
//! on wiring, which results in one immediate handler call.

use fritz2_core::{Source, Subscription};

use crate::handler::Handler;

/// Forward every event of `source` to `handler`.
pub fn handled_by<E, S>(source: &S, handler: &Handler<E>) -> Subscription
where
    E: Clone + 'static,
    S: Source<E> + ?Sized,
{
    let handler = handler.clone();
    source.subscribe_boxed(Box::new(move |event: &E| {
        submit(&handler, event.clone());
    }))
}

/// Forward every event of `source` to `handler` after mapping it.
pub fn handled_by_mapped<E, P, S>(
    source: &S,
    map: impl Fn(&E) -> P + 'static,
    handler: &Handler<P>,
) -> Subscription
where
    E: 'static,
    P: 'static,
    S: Source<E> + ?Sized,
{
    let handler = handler.clone();
    source.subscribe_boxed(Box::new(move |event: &E| {
        submit(&handler, map(event));
    }))
}

fn submit<P: 'static>(handler: &Handler<P>, payload: P) {
    if let Err(err) = handler.call(payload) {
        tracing::warn!(
            store = handler.store_id(),
            handler = handler.name(),
            error = %err,
            "dropped action"
        );
    }
}

/// Method form of [`handled_by`] and [`handled_by_mapped`].
pub trait HandledBy<E: 'static>: Source<E> {
    fn handled_by(&self, handler: &Handler<E>) -> Subscription
    where
        E: Clone,
    {
        handled_by(self, handler)
    }

    fn handled_by_mapped<P: 'static>(
        &self,
        map: impl Fn(&E) -> P + 'static,
        handler: &Handler<P>,
    ) -> Subscription {
        handled_by_mapped(self, map, handler)
    }
}

impl<E: 'static, S: Source<E> + ?Sized> HandledBy<E> for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RootStore, Store};
    use fritz2_core::{Emitter, Observable};
    use futures::executor::LocalPool;
    use tracing_test::traced_test;

    #[test]
    fn every_click_becomes_a_handler_call() {
        let mut pool = LocalPool::new();
        let counter = RootStore::new(0, &pool.spawner()).unwrap();
        let clicks: Emitter<()> = Emitter::new();
        let _wired = clicks.handled_by(&counter.handle(|n, ()| n + 1));

        clicks.emit(());
        clicks.emit(());
        clicks.emit(());
        pool.run_until_stalled();
        assert_eq!(counter.current(), 3);
    }

    #[test]
    fn mapped_events_reach_typed_handler() {
        let mut pool = LocalPool::new();
        let name = RootStore::new(String::new(), &pool.spawner()).unwrap();
        let input: Emitter<&'static str> = Emitter::new();
        let _wired = input.handled_by_mapped(|raw| raw.trim().to_uppercase(), &name.update());

        input.emit("  heinz ");
        pool.run_until_stalled();
        assert_eq!(name.current(), "HEINZ");
    }

    #[test]
    fn replaying_source_calls_handler_on_wiring() {
        let mut pool = LocalPool::new();
        let mirror = RootStore::new(0, &pool.spawner()).unwrap();
        let source = Observable::new(5);
        let _wired = handled_by(&source, &mirror.update());
        pool.run_until_stalled();
        assert_eq!(mirror.current(), 5);
    }

    #[test]
    #[traced_test]
    fn disposed_store_drops_action_with_warning() {
        let pool = LocalPool::new();
        let store = RootStore::new(0, &pool.spawner()).unwrap();
        let clicks: Emitter<()> = Emitter::new();
        let wired = clicks.handled_by(&store.handle(|n, ()| n + 1));
        store.dispose();
        clicks.emit(());
        assert!(wired.is_active());
        assert!(logs_contain("dropped action"));
    }
}
