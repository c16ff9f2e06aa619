#![forbid(unsafe_code)]

//! Template export.
//!
//! A document names a set of output files, each rendered by Handlebars from a
//! read-only snapshot of the store. Nested values resolve with dotted paths
//! (`{{server.port}}`). Output is plain text: HTML escaping is disabled.

use std::fs;
use std::path::{Component, Path, PathBuf};

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("output name '{0}' must be a relative path without '..'")]
    UnsafeName(String),

    #[error("output name '{0}' names a file that is already declared")]
    DuplicateName(String),

    #[error("template for '{name}' does not compile: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("rendering '{name}' failed: {source}")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One named output artifact.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputTemplate {
    /// Relative file name under the export directory.
    pub name: String,
    pub template: String,
}

impl OutputTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// The file an output name refers to, relative to the export directory, with
/// `.` segments removed. `None` for absolute paths, `..` and empty names.
fn relative_target(name: &str) -> Option<PathBuf> {
    let mut target = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(segment) => target.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!target.as_os_str().is_empty()).then_some(target)
}

/// Compiled output templates.
pub struct Exporter {
    registry: Handlebars<'static>,
    names: Vec<String>,
    targets: Vec<PathBuf>,
}

impl Exporter {
    /// Validate names and compile every template.
    pub fn new(outputs: &[OutputTemplate], strict: bool) -> Result<Self, ExportError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(strict);
        registry.register_escape_fn(handlebars::no_escape);

        let mut names = Vec::with_capacity(outputs.len());
        let mut targets = Vec::with_capacity(outputs.len());
        for output in outputs {
            let target = relative_target(&output.name)
                .ok_or_else(|| ExportError::UnsafeName(output.name.clone()))?;
            if targets.contains(&target) {
                return Err(ExportError::DuplicateName(output.name.clone()));
            }
            registry
                .register_template_string(&output.name, &output.template)
                .map_err(|source| ExportError::Template {
                    name: output.name.clone(),
                    source: Box::new(source),
                })?;
            names.push(output.name.clone());
            targets.push(target);
        }
        debug!(outputs = names.len(), strict, "templates compiled");
        Ok(Self {
            registry,
            names,
            targets,
        })
    }

    /// Output names, in declaration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Render output `name` against `data`.
    pub fn render(&self, name: &str, data: &Map<String, Value>) -> Result<String, ExportError> {
        self.registry
            .render(name, data)
            .map_err(|source| ExportError::Render {
                name: name.to_owned(),
                source: Box::new(source),
            })
    }

    /// Render every output and write it under `dir`, creating directories as
    /// needed. Returns the written paths in declaration order.
    ///
    /// Everything is rendered before the first file is written, so a render
    /// failure leaves `dir` untouched.
    pub fn export(&self, data: &Map<String, Value>, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        let rendered = self
            .names
            .iter()
            .zip(&self.targets)
            .map(|(name, target)| Ok((dir.join(target), self.render(name, data)?)))
            .collect::<Result<Vec<_>, ExportError>>()?;

        let mut written = Vec::with_capacity(rendered.len());
        for (path, text) in rendered {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
            }
            fs::write(&path, text).map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "output written");
            written.push(path);
        }
        Ok(written)
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter").field("names", &self.names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn renders_nested_paths_without_escaping() {
        let exporter =
            Exporter::new(&[OutputTemplate::new("a.conf", "{{host}}:{{net.port}} <{{tag}}>")], true)
                .unwrap();
        let text = exporter
            .render("a.conf", &data(json!({"host": "h", "net": {"port": 1}, "tag": "a&b"})))
            .unwrap();
        assert_eq!(text, "h:1 <a&b>");
    }

    #[test]
    fn strict_mode_rejects_missing_variables() {
        let outputs = [OutputTemplate::new("x", "{{missing}}")];
        let strict = Exporter::new(&outputs, true).unwrap();
        assert!(matches!(
            strict.render("x", &Map::new()).unwrap_err(),
            ExportError::Render { .. }
        ));
        let lenient = Exporter::new(&outputs, false).unwrap();
        assert_eq!(lenient.render("x", &Map::new()).unwrap(), "");
    }

    #[test]
    fn unsafe_names_are_rejected() {
        for name in ["", ".", "./", "../x", "/etc/passwd", "a/../../b"] {
            let err = Exporter::new(&[OutputTemplate::new(name, "")], true).unwrap_err();
            assert!(matches!(err, ExportError::UnsafeName(_)), "{name}");
        }
        assert!(Exporter::new(&[OutputTemplate::new("conf/app.ini", "")], true).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        for (first, second) in [("a", "a"), ("a", "./a"), ("conf/x", "conf/./x"), ("d/f", "d//f/")] {
            let outputs = [OutputTemplate::new(first, "1"), OutputTemplate::new(second, "2")];
            assert!(
                matches!(
                    Exporter::new(&outputs, true).unwrap_err(),
                    ExportError::DuplicateName(ref name) if name == second
                ),
                "{first} / {second}"
            );
        }
    }

    #[test]
    fn dot_segments_are_dropped_from_targets() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(&[OutputTemplate::new("./sub/./a.txt", "x")], true).unwrap();
        assert_eq!(exporter.names(), ["./sub/./a.txt"]);
        let written = exporter.export(&Map::new(), dir.path()).unwrap();
        assert_eq!(written, vec![dir.path().join("sub/a.txt")]);
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "x");
    }

    #[test]
    fn bad_template_fails_to_compile() {
        let err = Exporter::new(&[OutputTemplate::new("a", "{{#if}}")], true).unwrap_err();
        assert!(matches!(err, ExportError::Template { .. }));
    }

    #[test]
    fn export_writes_files_under_dir() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(
            &[
                OutputTemplate::new("one.txt", "{{a}}"),
                OutputTemplate::new("sub/two.txt", "{{b}}"),
            ],
            true,
        )
        .unwrap();
        let written = exporter
            .export(&data(json!({"a": 1, "b": "two"})), dir.path())
            .unwrap();
        assert_eq!(written, vec![dir.path().join("one.txt"), dir.path().join("sub/two.txt")]);
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "two");
    }

    #[test]
    fn render_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(
            &[
                OutputTemplate::new("ok.txt", "fine"),
                OutputTemplate::new("bad.txt", "{{nope}}"),
            ],
            true,
        )
        .unwrap();
        assert!(exporter.export(&Map::new(), dir.path()).is_err());
        assert!(!dir.path().join("ok.txt").exists());
    }
}
