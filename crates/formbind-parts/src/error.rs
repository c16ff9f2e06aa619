#![forbid(unsafe_code)]

use formbind_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PartError {
    #[error("part is already built")]
    AlreadyBuilt,

    #[error("part has not been built")]
    NotBuilt,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("index {index} is out of range ({len} entries)")]
    OutOfRange { index: usize, len: usize },
}
