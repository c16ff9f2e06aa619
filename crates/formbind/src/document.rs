#![forbid(unsafe_code)]

//! Form documents.
//!
//! A document supplies a title, the default settings, the part tree and the
//! export templates. [`DocumentFile`] reads all of that from TOML:
//!
//! ```toml
//! [document]
//! title = "Server"
//!
//! [defaults]
//! port = 8080
//! advanced = false
//!
//! [[outputs]]
//! name = "server.conf"
//! template = "port={{port}}"
//!
//! [ui]
//! kind = "page"
//! title = "General"
//!
//! [[ui.children]]
//! kind = "integer"
//! title = { format = "Port ({port})" }
//! name = "port"
//! max = 65535
//! ```
//!
//! Any attribute accepts a constant or one of `{ bind = "path" }`,
//! `{ format = "text {path}" }` and `{ equals = ["path", value] }`.

use std::fs;
use std::path::{Path, PathBuf};

use formbind_parts::{
    CheckInput, ChoiceInput, ChoiceOption, IntegerInput, Notebook, OptionsGroup, Page, Part,
    RealInput, Tab, TextInput,
};
use formbind_store::{Bindable, FromValue, Func, PathStore, StoreError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::export::OutputTemplate;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot read document {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("{at}: invalid '{field}': {source}")]
    InvalidAttribute {
        at: String,
        field: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Everything a session needs to open a form.
pub trait Document {
    fn title(&self) -> &str;

    /// Initial settings, applied to a cleared store in key order.
    fn defaults(&self) -> Map<String, Value>;

    /// Construct the (unbuilt) part tree over `store`.
    fn build_parts(&self, store: &PathStore) -> Result<Box<dyn Part>, DocumentError>;

    fn outputs(&self) -> &[OutputTemplate];
}

/// A constant or computed attribute as written in a document.
///
/// A table holding `bind`, `format` or `equals` is a computed form and may
/// hold nothing else. Any other value, tables included, is a constant.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrSpec {
    Bind { bind: String },
    Format { format: String },
    Equals { equals: (String, Value) },
    Constant(Value),
}

const FORMS: [&str; 3] = ["bind", "format", "equals"];

impl<'de> Deserialize<'de> for AttrSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Self::from_value(Value::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}

impl AttrSpec {
    fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(map) = value else {
            return Ok(Self::Constant(value));
        };
        let Some(form) = FORMS.into_iter().find(|form| map.contains_key(*form)) else {
            return Ok(Self::Constant(Value::Object(map)));
        };
        if let Some(extra) = map.keys().find(|key| key.as_str() != form) {
            return Err(format!("unknown field `{extra}` in a `{form}` attribute"));
        }
        match (form, &map[form]) {
            ("bind", Value::String(path)) => Ok(Self::Bind { bind: path.clone() }),
            ("format", Value::String(template)) => Ok(Self::Format {
                format: template.clone(),
            }),
            ("equals", Value::Array(pair)) => match pair.as_slice() {
                [Value::String(path), expected] => Ok(Self::Equals {
                    equals: (path.clone(), expected.clone()),
                }),
                _ => Err("`equals` expects [\"path\", value]".to_owned()),
            },
            ("equals", _) => Err("`equals` expects [\"path\", value]".to_owned()),
            (form, _) => Err(format!("`{form}` expects a string")),
        }
    }

    /// Convert to a typed attribute source. Constants are checked here;
    /// computed forms are checked on every evaluation.
    pub fn bindable<T>(&self, context: &str) -> Result<Bindable<T>, StoreError>
    where
        T: FromValue + 'static,
    {
        Ok(match self {
            Self::Bind { bind } => Bindable::Computed(Func::<T>::bind(bind.as_str())),
            Self::Format { format } => {
                typed(Func::format(format).then(Value::String), context.to_owned())
            }
            Self::Equals {
                equals: (path, expected),
            } => typed(
                Func::equals(path.as_str(), expected.clone()).then(Value::Bool),
                context.to_owned(),
            ),
            Self::Constant(value) => Bindable::Constant(T::convert(value, context)?),
        })
    }
}

fn typed<T: FromValue + 'static>(func: Func<Value>, context: String) -> Bindable<T> {
    let deps = func.dependencies().to_vec();
    Bindable::Computed(Func::try_new(deps, move |values| {
        T::convert(&func.call(values)?, &context)
    }))
}

/// Fields of a text or check input.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    pub title: AttrSpec,
    pub name: AttrSpec,
    pub label: Option<AttrSpec>,
    pub tooltip: Option<AttrSpec>,
}

/// Fields of an integer or real input.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeSpec {
    pub title: AttrSpec,
    pub name: AttrSpec,
    pub label: Option<AttrSpec>,
    pub tooltip: Option<AttrSpec>,
    pub min: Option<AttrSpec>,
    pub max: Option<AttrSpec>,
}

/// Fields of a choice input.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoiceSpec {
    pub title: AttrSpec,
    pub name: AttrSpec,
    pub label: Option<AttrSpec>,
    pub tooltip: Option<AttrSpec>,
    pub options: Option<AttrSpec>,
}

/// One node of the `[ui]` tree. Unknown keys are rejected.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum PartSpec {
    Notebook {
        #[serde(default)]
        children: Vec<PartSpec>,
    },
    Tab {
        title: AttrSpec,
        #[serde(default)]
        children: Vec<PartSpec>,
    },
    Page {
        title: AttrSpec,
        icon: Option<AttrSpec>,
        #[serde(default)]
        children: Vec<PartSpec>,
    },
    Group {
        title: AttrSpec,
        visible: Option<AttrSpec>,
        #[serde(default)]
        children: Vec<PartSpec>,
    },
    Text(InputSpec),
    Integer(RangeSpec),
    Real(RangeSpec),
    Choice(ChoiceSpec),
    Check(InputSpec),
}

struct Site<'a> {
    at: &'a str,
}

impl Site<'_> {
    fn attr<T: FromValue + 'static>(
        &self,
        field: &'static str,
        spec: &AttrSpec,
    ) -> Result<Bindable<T>, DocumentError> {
        spec.bindable(field)
            .map_err(|source| DocumentError::InvalidAttribute {
                at: self.at.to_owned(),
                field,
                source,
            })
    }
}

/// Apply the optional label and tooltip of `$input` to the input part `$part`.
macro_rules! decorate {
    ($site:expr, $part:expr, $input:expr) => {{
        let mut part = $part;
        if let Some(label) = &$input.label {
            part = part.label($site.attr::<String>("label", label)?);
        }
        if let Some(tooltip) = &$input.tooltip {
            part = part.tooltip($site.attr::<Option<String>>("tooltip", tooltip)?);
        }
        part
    }};
}

impl PartSpec {
    /// Construct the part described by this node and its subtree.
    ///
    /// `at` names the node in error messages (`ui.children[2]`).
    pub fn build(&self, store: &PathStore, at: &str) -> Result<Box<dyn Part>, DocumentError> {
        let site = Site { at };
        let part: Box<dyn Part> = match self {
            Self::Notebook { children } => {
                let mut notebook = Notebook::new(store);
                for child in build_children(children, store, at)? {
                    notebook.push(child);
                }
                Box::new(notebook)
            }
            Self::Tab { title, children } => {
                let mut tab = Tab::new(store, site.attr::<String>("title", title)?);
                for child in build_children(children, store, at)? {
                    tab.push(child);
                }
                Box::new(tab)
            }
            Self::Page {
                title,
                icon,
                children,
            } => {
                let mut page = Page::new(store, site.attr::<String>("title", title)?);
                if let Some(icon) = icon {
                    page = page.icon(site.attr::<String>("icon", icon)?);
                }
                for child in build_children(children, store, at)? {
                    page.push(child);
                }
                Box::new(page)
            }
            Self::Group {
                title,
                visible,
                children,
            } => {
                let mut group = OptionsGroup::new(store, site.attr::<String>("title", title)?);
                if let Some(visible) = visible {
                    group = group.visible(site.attr::<bool>("visible", visible)?);
                }
                for child in build_children(children, store, at)? {
                    group.push(child);
                }
                Box::new(group)
            }
            Self::Text(input) => {
                let (title, name) = site.title_and_name(&input.title, &input.name)?;
                Box::new(decorate!(site, TextInput::new(store, title, name), input))
            }
            Self::Integer(input) => {
                let (title, name) = site.title_and_name(&input.title, &input.name)?;
                let mut part = decorate!(site, IntegerInput::new(store, title, name), input);
                if let Some(min) = &input.min {
                    part = part.min(site.attr::<i64>("min", min)?);
                }
                if let Some(max) = &input.max {
                    part = part.max(site.attr::<i64>("max", max)?);
                }
                Box::new(part)
            }
            Self::Real(input) => {
                let (title, name) = site.title_and_name(&input.title, &input.name)?;
                let mut part = decorate!(site, RealInput::new(store, title, name), input);
                if let Some(min) = &input.min {
                    part = part.min(site.attr::<f64>("min", min)?);
                }
                if let Some(max) = &input.max {
                    part = part.max(site.attr::<f64>("max", max)?);
                }
                Box::new(part)
            }
            Self::Choice(input) => {
                let (title, name) = site.title_and_name(&input.title, &input.name)?;
                let mut part = decorate!(site, ChoiceInput::new(store, title, name), input);
                if let Some(options) = &input.options {
                    part = part.options(site.attr::<Vec<ChoiceOption>>("options", options)?);
                }
                Box::new(part)
            }
            Self::Check(input) => {
                let (title, name) = site.title_and_name(&input.title, &input.name)?;
                Box::new(decorate!(site, CheckInput::new(store, title, name), input))
            }
        };
        Ok(part)
    }
}

impl Site<'_> {
    fn title_and_name(
        &self,
        title: &AttrSpec,
        name: &AttrSpec,
    ) -> Result<(Bindable<String>, Bindable<String>), DocumentError> {
        Ok((
            self.attr::<String>("title", title)?,
            self.attr::<String>("name", name)?,
        ))
    }
}

fn build_children(
    specs: &[PartSpec],
    store: &PathStore,
    at: &str,
) -> Result<Vec<Box<dyn Part>>, DocumentError> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| spec.build(store, &format!("{at}.children[{index}]")))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentMeta {
    pub title: String,
}

/// A document read from a TOML file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentFile {
    pub document: DocumentMeta,
    #[serde(default)]
    pub defaults: Map<String, Value>,
    #[serde(default)]
    pub outputs: Vec<OutputTemplate>,
    pub ui: PartSpec,
}

impl DocumentFile {
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse a document from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, DocumentError> {
        Self::parse(text, Path::new("<inline>"))
    }

    fn parse(text: &str, origin: &Path) -> Result<Self, DocumentError> {
        let document: Self = toml::from_str(text).map_err(|source| DocumentError::Parse {
            path: origin.to_owned(),
            source: Box::new(source),
        })?;
        tracing::debug!(
            path = %origin.display(),
            title = %document.document.title,
            defaults = document.defaults.len(),
            outputs = document.outputs.len(),
            "document parsed"
        );
        Ok(document)
    }
}

impl Document for DocumentFile {
    fn title(&self) -> &str {
        &self.document.title
    }

    fn defaults(&self) -> Map<String, Value> {
        self.defaults.clone()
    }

    fn build_parts(&self, store: &PathStore) -> Result<Box<dyn Part>, DocumentError> {
        self.ui.build(store, "ui")
    }

    fn outputs(&self) -> &[OutputTemplate] {
        &self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbind_parts::{PartKind, walk};
    use serde_json::json;

    const SAMPLE: &str = r#"
[document]
title = "Sample"

[defaults]
port = 8080
mode = "basic"
net = { host = "localhost" }

[[outputs]]
name = "out.txt"
template = "{{port}}"

[ui]
kind = "notebook"

[[ui.children]]
kind = "page"
title = "General"
icon = "net.png"

[[ui.children.children]]
kind = "integer"
title = { format = "Port {port}" }
name = "port"
max = 65535

[[ui.children.children]]
kind = "group"
title = "Advanced"
visible = { equals = ["mode", "advanced"] }

[[ui.children.children.children]]
kind = "text"
title = "Host"
name = "net.host"
tooltip = "Name or address"

[[ui.children]]
kind = "page"
title = "Modes"

[[ui.children.children]]
kind = "choice"
title = "Mode"
name = "mode"
options = [["basic", "Basic"], { id = "advanced", label = "Advanced" }]
"#;

    #[test]
    fn parses_sections_in_order() {
        let doc = DocumentFile::from_toml_str(SAMPLE).unwrap();
        assert_eq!(doc.title(), "Sample");
        assert_eq!(doc.defaults().keys().collect::<Vec<_>>(), ["port", "mode", "net"]);
        assert_eq!(doc.outputs(), [OutputTemplate::new("out.txt", "{{port}}")]);
    }

    #[test]
    fn builds_the_described_tree() {
        let doc = DocumentFile::from_toml_str(SAMPLE).unwrap();
        let store = PathStore::new();
        let root = doc.build_parts(&store).unwrap();
        let mut kinds = Vec::new();
        walk(root.as_ref(), &mut |part, depth| kinds.push((depth, part.kind())));
        assert_eq!(
            kinds,
            vec![
                (0, PartKind::Notebook),
                (1, PartKind::Page),
                (2, PartKind::Integer),
                (2, PartKind::Group),
                (3, PartKind::Text),
                (1, PartKind::Page),
                (2, PartKind::Choice),
            ]
        );
    }

    #[test]
    fn attribute_forms() {
        let store = PathStore::new();
        store.update([("a", json!(2)), ("mode", json!("x"))]);

        let bind: AttrSpec = serde_json::from_value(json!({"bind": "a"})).unwrap();
        let format: AttrSpec = serde_json::from_value(json!({"format": "a={a}"})).unwrap();
        let equals: AttrSpec = serde_json::from_value(json!({"equals": ["mode", "x"]})).unwrap();
        let constant: AttrSpec = serde_json::from_value(json!("plain")).unwrap();

        let value = |b: Bindable<String>| formbind_store::Attribute::new(&store, b).value();
        assert_eq!(value(bind.bindable("t").unwrap()).unwrap(), "2");
        assert_eq!(value(format.bindable("t").unwrap()).unwrap(), "a=2");
        assert_eq!(value(constant.bindable("t").unwrap()).unwrap(), "plain");

        let visible = formbind_store::Attribute::new(&store, equals.bindable::<bool>("v").unwrap());
        assert!(visible.value().unwrap());
    }

    #[test]
    fn mistyped_constant_names_its_site() {
        let text = r#"
[document]
title = "Bad"

[ui]
kind = "page"
title = "P"

[[ui.children]]
kind = "integer"
title = "Port"
name = "port"
max = "lots"
"#;
        let doc = DocumentFile::from_toml_str(text).unwrap();
        let err = doc.build_parts(&PathStore::new()).err().unwrap();
        assert!(matches!(
            err,
            DocumentError::InvalidAttribute { field: "max", .. }
        ));
        assert_eq!(err.to_string(), "ui.children[0]: invalid 'max': max: expected an integer");
    }

    fn parse_error(ui: &str) -> String {
        let text = format!("[document]\ntitle = \"x\"\n\n[ui]\n{ui}");
        match DocumentFile::from_toml_str(&text) {
            Err(err @ DocumentError::Parse { .. }) => err.to_string(),
            Err(other) => panic!("expected a parse error, got {other}"),
            Ok(_) => panic!("document accepted: {ui}"),
        }
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        let err = parse_error("kind = \"text\"\ntitle = \"T\"\nname = \"t\"\ntooltp = \"hint\"\n");
        assert!(err.contains("unknown field `tooltp`"), "{err}");

        let err = parse_error("kind = \"group\"\ntitle = \"G\"\nvisble = true\n");
        assert!(err.contains("unknown field `visble`"), "{err}");

        let err = parse_error("kind = \"integer\"\ntitle = \"I\"\nname = \"i\"\nmaximum = 3\n");
        assert!(err.contains("unknown field `maximum`"), "{err}");

        let err = parse_error("kind = \"choice\"\ntitle = \"C\"\nname = \"c\"\noption = []\n");
        assert!(err.contains("unknown field `option`"), "{err}");
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let text = "[document]\ntitle = \"x\"\n[defualts]\na = 1\n[ui]\nkind = \"notebook\"\n";
        let err = DocumentFile::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("defualts"), "{err}");
    }

    #[test]
    fn computed_forms_reject_extra_or_mistyped_keys() {
        let err = parse_error("kind = \"page\"\ntitle = { bind = \"a\", fallback = \"x\" }\n");
        assert!(err.contains("unknown field `fallback` in a `bind` attribute"), "{err}");

        let err = parse_error("kind = \"page\"\ntitle = { format = 3 }\n");
        assert!(err.contains("`format` expects a string"), "{err}");

        let err = parse_error("kind = \"group\"\ntitle = \"G\"\nvisible = { equals = [\"mode\"] }\n");
        assert!(err.contains("`equals` expects"), "{err}");
    }

    #[test]
    fn tables_without_a_form_key_are_constants() {
        let spec: AttrSpec = serde_json::from_value(json!({"id": 1, "label": "One"})).unwrap();
        assert_eq!(spec, AttrSpec::Constant(json!({"id": 1, "label": "One"})));
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        let text = "[document]\ntitle = \"x\"\n[ui]\nkind = \"slider\"\n";
        assert!(matches!(
            DocumentFile::from_toml_str(text).unwrap_err(),
            DocumentError::Parse { .. }
        ));
    }
}
