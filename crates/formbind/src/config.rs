#![forbid(unsafe_code)]

//! Session configuration.
//!
//! Read from a TOML file passed with `--config`; every field is optional.
//!
//! ```toml
//! nested_writes = "silent"   # or "notify" (default)
//! strict_export = true       # unknown template variables are errors
//! pretty_save = true         # indent saved settings
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use formbind_store::{NestedWrites, StoreConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Whether a nested `set` notifies the subscribers of its top-level key.
    pub nested_writes: NestedWrites,
    /// Fail export when a template references a missing variable.
    pub strict_export: bool,
    /// Indent saved settings files.
    pub pretty_save: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nested_writes: NestedWrites::Notify,
            strict_export: true,
            pretty_save: true,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse(text, Path::new("<inline>"))
    }

    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            nested_writes: self.nested_writes,
        }
    }
}
