#![forbid(unsafe_code)]

//! Error taxonomy for store and attribute operations.
//!
//! The only failure mode of the core is a data-contract violation: a path
//! that does not resolve, or a value of the wrong shape. Nothing here is
//! transient, so there is no retry policy anywhere in the crate.

use thiserror::Error;

use crate::path::KeyPath;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("key not found: {path} (missing segment '{segment}')")]
    KeyNotFound { path: KeyPath, segment: String },

    #[error("path is empty")]
    EmptyPath,

    #[error("cannot descend into {path}: '{segment}' is not a mapping")]
    NotAMapping { path: KeyPath, segment: String },

    #[error("{context}: expected {expected}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
    },
}

impl StoreError {
    #[must_use]
    pub fn key_not_found(path: &KeyPath, depth: usize) -> Self {
        Self::KeyNotFound {
            path: path.clone(),
            segment: path.segments().get(depth).cloned().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn not_a_mapping(path: &KeyPath, depth: usize) -> Self {
        Self::NotAMapping {
            path: path.prefix(depth + 1),
            segment: path.segments().get(depth).cloned().unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn mismatch(context: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            context: context.into(),
            expected,
        }
    }

    /// Whether this is a missing-key failure, the case callers are expected
    /// to absorb with a local fallback.
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}
