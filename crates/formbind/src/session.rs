#![forbid(unsafe_code)]

//! Document lifecycle.
//!
//! A [`Session`] owns one store and one render surface for its whole life.
//! Opening a document replaces the part tree and the store contents; load,
//! save and export act on whatever document is open.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use formbind_parts::{HeadlessSurface, Part, SharedSurface};
use formbind_store::{KeyPath, PathStore};
use serde_json::Value;
use tracing::debug;

use crate::config::SessionConfig;
use crate::document::Document;
use crate::error::{FormbindError, Result};
use crate::export::Exporter;
use crate::persist::{load_settings, save_settings};

/// Which document actions are currently possible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Actions {
    pub load: bool,
    pub save: bool,
    pub export: bool,
}

struct Open {
    title: String,
    tree: Box<dyn Part>,
    exporter: Exporter,
}

pub struct Session {
    config: SessionConfig,
    store: PathStore,
    surface: SharedSurface,
    open: Option<Open>,
}

impl Session {
    pub fn new(config: SessionConfig, surface: SharedSurface) -> Self {
        Self {
            store: PathStore::with_config(config.store_config()),
            config,
            surface,
            open: None,
        }
    }

    /// A session rendering onto a fresh [`HeadlessSurface`], returned
    /// alongside it for inspection.
    pub fn headless(config: SessionConfig) -> (Self, Rc<RefCell<HeadlessSurface>>) {
        let headless = formbind_parts::shared(HeadlessSurface::new());
        let surface: SharedSurface = headless.clone();
        (Self::new(config, surface), headless)
    }

    /// Replace the open document with `document`.
    ///
    /// Templates are compiled first; if that fails the current document stays
    /// open. Any later failure leaves the session with no document.
    pub fn open(&mut self, document: &dyn Document) -> Result<()> {
        let exporter = Exporter::new(document.outputs(), self.config.strict_export)?;

        // The old tree holds store bindings; release them before clearing.
        self.open = None;
        self.store.clear();
        self.store.update(document.defaults());
        self.surface.borrow_mut().reset();

        let tree = document.build_parts(&self.store)?;
        tree.build(&self.surface, None)?;
        tree.layout();

        debug!(
            title = document.title(),
            keys = self.store.len(),
            outputs = exporter.names().len(),
            "document opened"
        );
        self.open = Some(Open {
            title: document.title().to_owned(),
            tree,
            exporter,
        });
        Ok(())
    }

    fn require_open(&self) -> Result<&Open> {
        self.open.as_ref().ok_or(FormbindError::NoDocument)
    }

    /// Merge settings from `path` into the store, then refresh every part.
    pub fn load(&self, path: &Path) -> Result<()> {
        let open = self.require_open()?;
        let settings = load_settings(path)?;
        self.store.update(settings);
        open.tree.refresh(true);
        debug!(path = %path.display(), "settings applied");
        Ok(())
    }

    /// Write the whole store to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.require_open()?;
        save_settings(path, &self.store.snapshot(), self.config.pretty_save)?;
        Ok(())
    }

    /// Render every output template into `dir`.
    pub fn export(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let open = self.require_open()?;
        Ok(open.exporter.export(&self.store.snapshot(), dir)?)
    }

    pub fn set(&self, path: impl Into<KeyPath>, value: impl Into<Value>) -> Result<()> {
        Ok(self.store.set(path, value)?)
    }

    pub fn get(&self, path: impl Into<KeyPath>) -> Result<Value> {
        Ok(self.store.get(path)?)
    }

    #[must_use]
    pub fn actions(&self) -> Actions {
        match &self.open {
            None => Actions::default(),
            Some(open) => Actions {
                load: true,
                save: true,
                export: !open.exporter.names().is_empty(),
            },
        }
    }

    #[must_use]
    pub fn store(&self) -> &PathStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Root of the open document's part tree.
    #[must_use]
    pub fn tree(&self) -> Option<&dyn Part> {
        self.open.as_ref().map(|open| open.tree.as_ref())
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.title.as_str())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("title", &self.title())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentFile;
    use serde_json::json;

    const DOC: &str = r#"
[document]
title = "Tiny"

[defaults]
port = 80

[[outputs]]
name = "port.txt"
template = "{{port}}"

[ui]
kind = "page"
title = "Main"

[[ui.children]]
kind = "integer"
title = "Port"
name = "port"
max = 1000
"#;

    fn opened() -> (Session, Rc<RefCell<HeadlessSurface>>) {
        let (mut session, surface) = Session::headless(SessionConfig::default());
        session
            .open(&DocumentFile::from_toml_str(DOC).unwrap())
            .unwrap();
        (session, surface)
    }

    #[test]
    fn nothing_open_disables_actions() {
        let (session, _) = Session::headless(SessionConfig::default());
        assert_eq!(session.actions(), Actions::default());
        assert!(matches!(
            session.save(Path::new("x.json")).unwrap_err(),
            FormbindError::NoDocument
        ));
        assert!(session.tree().is_none());
    }

    #[test]
    fn open_applies_defaults_and_builds() {
        let (session, surface) = opened();
        assert_eq!(session.title(), Some("Tiny"));
        assert_eq!(session.get("port").unwrap(), json!(80));
        assert_eq!(
            session.actions(),
            Actions {
                load: true,
                save: true,
                export: true
            }
        );
        assert!(surface.borrow().find_titled("Port").is_some());
    }

    #[test]
    fn reopening_replaces_store_and_widgets() {
        let (mut session, surface) = opened();
        session.set("extra", true).unwrap();
        let before = surface.borrow().len();

        session
            .open(&DocumentFile::from_toml_str(DOC).unwrap())
            .unwrap();
        assert!(session.get("extra").is_err());
        assert_eq!(surface.borrow().len(), before);
        assert_eq!(session.store().binding_count("port"), 1);
    }

    #[test]
    fn load_refreshes_parts() {
        let (session, surface) = opened();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, r#"{"port": 443}"#).unwrap();

        session.load(&path).unwrap();
        let shown = surface
            .borrow()
            .find_titled("Port")
            .and_then(|h| surface.borrow().widget(h).and_then(|w| w.value.clone()));
        assert_eq!(shown, Some(json!(443)));
    }
}
