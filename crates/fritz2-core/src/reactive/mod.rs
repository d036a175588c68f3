#![forbid(unsafe_code)]

//! Reactive primitives for fritz2.
//!
//! - [`Observable`]: a shared, version-tracked value that replays its current
//!   value to every new subscriber.
//! - [`Flow`]: a read-only handle onto an `Observable`.
//! - [`Emitter`]: a non-replaying event stream.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Source`]: the subscription contract shared by all of the above.
//!
//! # Architecture
//!
//! Everything is single-threaded: shared ownership is `Rc`, interior
//! mutability is `RefCell`/`Cell`. Subscriber callbacks are held strongly by
//! their [`Subscription`] and weakly by the registry, so a dropped guard is
//! pruned lazily during the next notification.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. No subscriber receives emission N+1 before emission N.
//! 3. Setting a value equal to the current value is a no-op.
//! 4. Publishing from inside a callback queues instead of recursing.
//! 5. Cancelling one subscription never affects its siblings.

pub mod emitter;
pub mod observable;
pub mod source;
mod subscribers;

pub use emitter::Emitter;
pub use observable::{Flow, Observable};
pub use source::Source;
pub use subscribers::Subscription;
