#![forbid(unsafe_code)]

use std::fmt;

use fritz2_core::{Source, Subscription};

use crate::error::MountError;

/// Something a [`MountScope`] can tear down: nested mount points.
pub trait Disposable {
    /// Tear down. Fails with [`MountError::Disposed`] when already disposed.
    fn dispose(&self) -> Result<(), MountError>;

    fn is_disposed(&self) -> bool;
}

/// Collects what a rendered fragment subscribed to.
///
/// Renderers receive the scope of the fragment they produce and register
/// nested subscriptions and mounts on it. When the fragment is replaced or
/// removed the scope is cleared, disconnecting everything it held.
///
/// # Invariants
///
/// 1. Nested mounts are disposed, then subscriptions released, each in
///    reverse registration order.
/// 2. After `clear()` or drop, no callback registered through the scope
///    fires again.
/// 3. `binding_count()` counts both subscriptions and nested mounts.
#[derive(Default)]
pub struct MountScope {
    subscriptions: Vec<Subscription>,
    children: Vec<Box<dyn Disposable>>,
}

impl MountScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive until the scope is cleared.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Subscribe to `source` for the lifetime of the scope.
    pub fn subscribe<T: 'static>(
        &mut self,
        source: &impl Source<T>,
        callback: impl Fn(&T) + 'static,
    ) -> &mut Self {
        self.hold(source.observe(callback));
        self
    }

    /// Take ownership of a nested mount point.
    pub fn adopt(&mut self, child: impl Disposable + 'static) {
        self.children.push(Box::new(child));
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len() + self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.binding_count() == 0
    }

    /// Release everything now; the scope stays usable.
    pub fn clear(&mut self) {
        while let Some(child) = self.children.pop() {
            if !child.is_disposed() {
                let _ = child.dispose();
            }
        }
        while let Some(sub) = self.subscriptions.pop() {
            drop(sub);
        }
    }
}

impl Drop for MountScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for MountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountScope")
            .field("subscriptions", &self.subscriptions.len())
            .field("children", &self.children.len())
            .finish()
    }
}
