#![forbid(unsafe_code)]

//! Stores, handlers and mount points for fritz2.
//!
//! This crate provides:
//! - [`Runtime`]: the local pool driving store queues, and the holder of the
//!   runtime configuration
//! - [`store`]: [`RootStore`], [`SubStore`] and the [`Store`] surface
//! - [`Handler`] and the [`action`] wiring from event sources to handlers
//! - [`mount`]: single and list mount points rendering into
//!   [`target`] implementations
//!
//! # Example
//!
//! ```
//! use fritz2_runtime::{Runtime, Store};
//!
//! let mut rt = Runtime::new().unwrap();
//! let counter = rt.store(0).unwrap();
//! let add = counter.handle(|n, by: i32| n + by);
//! add.call(2).unwrap();
//! rt.run_until_stalled();
//! assert_eq!(counter.current(), 2);
//! ```

pub mod action;
pub mod config;
pub mod error;
pub mod handler;
pub mod mount;
pub mod runtime;
pub mod store;
pub mod target;

pub use action::{HandledBy, handled_by, handled_by_mapped};
pub use config::{RenderErrorPolicy, RuntimeConfig, StoreErrorPolicy};
#[cfg(feature = "policy-config")]
pub use error::ConfigError;
pub use error::{HandlerError, MountError, RenderError, StoreError};
pub use handler::Handler;
pub use mount::{
    Disposable, MountOptions, MountScope, MountState, MultiMount, SingleMount, bind_list,
    bind_list_with, bind_single, bind_single_with,
};
pub use runtime::Runtime;
pub use store::{Job, RootStore, Store, SubStore};
pub use target::{ChildTarget, ContentTarget};
