#![forbid(unsafe_code)]

//! Opt-in `tracing` output for applications.
//!
//! Store updates and mount renders open `debug` spans (`store.update`,
//! `mount.render`); failed handlers and renders log at `error`/`warn`.
//! The filter is read from `FRITZ2_LOG` using `EnvFilter` directive syntax,
//! e.g. `FRITZ2_LOG=fritz2_runtime=debug`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Environment variable holding the filter directives.
pub const ENV_VAR: &str = "FRITZ2_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install a human-readable fmt subscriber as the global default.
///
/// Fails if a global subscriber is already set.
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_target(true)
        .finish()
        .try_init()
}

/// Install a JSON-lines fmt subscriber as the global default.
#[cfg(feature = "logging-json")]
pub fn init_json() -> Result<(), TryInitError> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter())
        .with_current_span(true)
        .finish()
        .try_init()
}
