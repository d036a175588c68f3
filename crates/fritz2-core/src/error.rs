#![forbid(unsafe_code)]

use thiserror::Error;

/// Failures of the keyed list differ and of patch application.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiffError {
    #[error("duplicate key {key} at index {index}")]
    DuplicateKey { key: String, index: usize },

    #[error("{op} at index {index} is out of bounds (len {len})")]
    OutOfBounds {
        op: &'static str,
        index: usize,
        len: usize,
    },

    #[error("patch references unknown key {key}")]
    UnknownKey { key: String },
}

pub type Result<T> = std::result::Result<T, DiffError>;
