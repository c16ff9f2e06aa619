#![forbid(unsafe_code)]

use formbind_parts::PartError;
use formbind_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::export::ExportError;
use crate::persist::PersistError;

/// Top-level error of the formbind library and CLI.
#[derive(Debug, Error)]
pub enum FormbindError {
    #[error("no document is open")]
    NoDocument,

    #[error("invalid assignment '{0}': expected KEY=VALUE")]
    InvalidAssignment(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Part(#[from] PartError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl FormbindError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoDocument | Self::InvalidAssignment(_) | Self::Config(_) => 2,
            Self::Document(_) => 3,
            Self::Persist(_) => 4,
            Self::Export(_) => 5,
            Self::Part(_) | Self::Store(_) => 6,
            Self::Output(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, FormbindError>;
