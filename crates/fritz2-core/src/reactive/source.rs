#![forbid(unsafe_code)]

//! The push-stream contract every reactive producer implements.

use super::subscribers::Subscription;

/// Something that can be subscribed to with a callback.
///
/// Implemented by [`Observable`](super::Observable), [`Flow`](super::Flow),
/// [`Emitter`](super::Emitter) and
/// [`PatchStream`](crate::patch::PatchStream). Mount points and action
/// wiring accept any `Source`, which is how foreign event adapters plug in.
pub trait Source<T: 'static> {
    /// Register `callback`. Replaying sources invoke it synchronously with
    /// their current value before returning.
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription;

    /// Generic convenience over [`subscribe_boxed`](Self::subscribe_boxed).
    fn observe(&self, callback: impl Fn(&T) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.subscribe_boxed(Box::new(callback))
    }
}

impl<T: 'static, S: Source<T> + ?Sized> Source<T> for &S {
    fn subscribe_boxed(&self, callback: Box<dyn Fn(&T)>) -> Subscription {
        (**self).subscribe_boxed(callback)
    }
}
