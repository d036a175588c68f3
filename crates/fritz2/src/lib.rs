#![forbid(unsafe_code)]

//! fritz2: reactive state for user interfaces.
//!
//! Re-exports [`fritz2_core`] (observables, lenses, list patches) and
//! [`fritz2_runtime`] (stores, handlers, mount points). Most applications
//! only need the [`prelude`].
//!
//! ```
//! use fritz2::prelude::*;
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Counter {
//!     clicks: u32,
//! }
//!
//! let mut rt = Runtime::new()?;
//! let counter = rt.store(Counter { clicks: 0 })?;
//! let clicks = counter.sub(lens!(Counter, clicks));
//!
//! let mount = bind_single(&clicks.data(), None::<String>, |n: &u32, _: &mut MountScope| {
//!     Ok(format!("{n} clicks"))
//! });
//!
//! clicks.handle(|n, ()| n + 1).call(())?;
//! rt.run_until_stalled();
//! assert_eq!(mount.with_target(|t| t.clone()).as_deref(), Some("1 clicks"));
//! # Ok::<(), fritz2::runtime::StoreError>(())
//! ```

pub use fritz2_core as core;
pub use fritz2_runtime as runtime;

#[cfg(feature = "logging")]
pub mod logging;

pub mod prelude {
    //! The types and functions almost every fritz2 program touches.

    pub use fritz2_core::{
        Emitter, Flow, Lens, Observable, Patch, Source, Subscription, build_lens, lens,
    };
    pub use fritz2_runtime::{
        ChildTarget, ContentTarget, HandledBy, Handler, HandlerError, MountScope, RenderError,
        RootStore, Runtime, RuntimeConfig, Store, SubStore, bind_list, bind_single,
    };
}
