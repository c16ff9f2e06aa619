#![forbid(unsafe_code)]

//! Settings files: the whole store as one JSON object.
//!
//! Key order is preserved in both directions, so a save followed by a load
//! into a cleared store reproduces the original mapping exactly.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {path} must contain a JSON object")]
    NotAMapping { path: PathBuf },
}

/// Read a settings mapping from `path`.
pub fn load_settings(path: &Path) -> Result<Map<String, Value>, PersistError> {
    let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_owned(),
        source,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|source| PersistError::Json {
        path: path.to_owned(),
        source,
    })?;
    match value {
        Value::Object(map) => {
            tracing::debug!(path = %path.display(), keys = map.len(), "settings loaded");
            Ok(map)
        }
        _ => Err(PersistError::NotAMapping {
            path: path.to_owned(),
        }),
    }
}

/// Write `settings` to `path` verbatim, replacing any existing file.
pub fn save_settings(
    path: &Path,
    settings: &Map<String, Value>,
    pretty: bool,
) -> Result<(), PersistError> {
    let encoded = if pretty {
        serde_json::to_string_pretty(settings)
    } else {
        serde_json::to_string(settings)
    }
    .map_err(|source| PersistError::Json {
        path: path.to_owned(),
        source,
    })?;
    fs::write(path, encoded + "\n").map_err(|source| PersistError::Io {
        path: path.to_owned(),
        source,
    })?;
    tracing::debug!(path = %path.display(), keys = settings.len(), "settings saved");
    Ok(())
}
