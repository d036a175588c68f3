#![forbid(unsafe_code)]

//! Core reactive building blocks for fritz2.
//!
//! This crate provides:
//! - [`reactive`]: [`Observable`], [`Flow`], [`Emitter`] and the [`Source`]
//!   subscription contract
//! - [`lens`]: [`Lens`] and the list/format lens constructors
//! - [`patch`]: keyed list diffing into ordered [`Patch`] batches
//!
//! Everything here is synchronous and single-threaded; the store queue and
//! mount points built on top live in `fritz2-runtime`.

pub mod error;
pub mod lens;
pub mod patch;
pub mod reactive;

pub use error::DiffError;
pub use lens::{Lens, build_lens};
pub use patch::{ListDiffer, Patch, PatchStream, apply_batch, diff_keyed};
pub use reactive::{Emitter, Flow, Observable, Source, Subscription};
