#![forbid(unsafe_code)]

//! The local executor that drives every store queue.
//!
//! [`Runtime`] owns a single-threaded `LocalPool`. Stores created through it
//! spawn their workers on that pool, and nothing happens until the pool is
//! driven with [`run_until_stalled`](Runtime::run_until_stalled) or
//! [`block_on`](Runtime::block_on). An embedding event loop calls
//! `run_until_stalled` once per turn.

use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::rc::Rc;

use fritz2_core::{Flow, Source};
use futures::executor::{LocalPool, LocalSpawner};

use crate::config::RuntimeConfig;
use crate::error::{RenderError, StoreError};
use crate::mount::{self, MountOptions, MountScope, MultiMount, SingleMount};
use crate::store::root::next_store_id;
use crate::store::{RootStore, Store};
use crate::target::{ChildTarget, ContentTarget};

pub struct Runtime {
    pool: LocalPool,
    spawner: LocalSpawner,
    config: RootStore<RuntimeConfig>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config.current())
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Result<Self, StoreError> {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Result<Self, StoreError> {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let config = RootStore::with_id("runtime.config", config, &spawner)?;
        Ok(Self {
            pool,
            spawner,
            config,
        })
    }

    /// Create a root store whose workers run on this runtime and whose
    /// default error handling follows the configured policy.
    pub fn store<T: Clone + PartialEq + 'static>(&self, initial: T) -> Result<RootStore<T>, StoreError> {
        RootStore::spawn(next_store_id(), initial, &self.spawner, Some(self.config.data()))
    }

    pub fn store_with_id<T: Clone + PartialEq + 'static>(
        &self,
        id: impl Into<Rc<str>>,
        initial: T,
    ) -> Result<RootStore<T>, StoreError> {
        RootStore::spawn(id.into(), initial, &self.spawner, Some(self.config.data()))
    }

    #[must_use]
    pub fn spawner(&self) -> LocalSpawner {
        self.spawner.clone()
    }

    #[must_use]
    pub fn config(&self) -> RuntimeConfig {
        self.config.current()
    }

    /// The store holding the runtime configuration. Policy changes go
    /// through its handlers and take effect for the next job or render,
    /// including renders of mounts bound before the change.
    #[must_use]
    pub fn config_store(&self) -> &RootStore<RuntimeConfig> {
        &self.config
    }

    #[must_use]
    pub fn config_flow(&self) -> Flow<RuntimeConfig> {
        self.config.data()
    }

    /// Run every queued job until no task can make progress.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }

    /// Drive the pool until `future` completes.
    pub fn block_on<F: Future>(&mut self, future: F) -> F::Output {
        self.pool.run_until(future)
    }

    /// [`mount::bind_single`] with the configured render error policy.
    pub fn bind_single<T, G>(
        &self,
        source: &impl Source<T>,
        target: G,
        render: impl Fn(&T, &mut MountScope) -> Result<G::Content, RenderError> + 'static,
    ) -> SingleMount<T, G>
    where
        T: Clone + 'static,
        G: ContentTarget + 'static,
    {
        mount::bind_single_with(source, target, self.mount_options(), render)
    }

    /// [`mount::bind_list`] with the configured render error policy.
    pub fn bind_list<T, K, G>(
        &self,
        source: &impl Source<Vec<T>>,
        id: impl Fn(&T) -> K + 'static,
        target: G,
        render: impl Fn(&Flow<T>, &mut MountScope) -> Result<G::Child, RenderError> + 'static,
    ) -> MultiMount<T, K, G>
    where
        T: Clone + PartialEq + 'static,
        K: Hash + Eq + Clone + fmt::Debug + 'static,
        G: ChildTarget + 'static,
    {
        mount::bind_list_with(source, id, target, self.mount_options(), render)
    }

    fn mount_options(&self) -> MountOptions {
        MountOptions::default().follow_policy(self.config.data().map(|c| c.render_errors))
    }
}
