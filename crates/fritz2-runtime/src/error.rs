#![forbid(unsafe_code)]

use fritz2_core::DiffError;
use futures::task::SpawnError;
use thiserror::Error;

/// Failures of the store surface.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store `{store}` is disposed")]
    Disposed { store: String },

    #[error("failed to spawn update queue for store `{store}`: {source}")]
    Spawn {
        store: String,
        #[source]
        source: SpawnError,
    },
}

impl StoreError {
    /// Whether this is lifecycle misuse rather than a runtime fault.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    pub(crate) fn disposed(store: &str) -> Self {
        Self::Disposed {
            store: store.to_owned(),
        }
    }
}

/// A reducer's failure, handed to the store's error handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl HandlerError {
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A failure while rendering or while applying output to a target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),

    #[error("target rejected {op} at index {index} (len {len})")]
    Target {
        op: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Diff(#[from] DiffError),
}

impl RenderError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Lifecycle misuse of a mount point.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("mount point is disposed")]
    Disposed,

    #[error("mount point is already bound")]
    AlreadyBound,
}

/// Failures while loading a [`RuntimeConfig`](crate::config::RuntimeConfig).
#[cfg(feature = "policy-config")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {path}")]
    UnsupportedFormat { path: std::path::PathBuf },
}

pub type Result<T> = std::result::Result<T, StoreError>;
