#![forbid(unsafe_code)]

//! The `Part` trait and the state every part shares.
//!
//! A part is one node of a settings form: a container (notebook, tab, page,
//! group) or an input bound to a store path. Parts are declared up front,
//! then materialized exactly once with [`Part::build`]. After that, attribute
//! handlers keep the presentation in sync with the store.
//!
//! # State machine
//!
//! ```text
//! unbuilt ──build()──▶ built
//! ```
//!
//! There is no teardown transition: a document reload drops the whole tree and
//! builds a new one.

use std::cell::OnceCell;
use std::fmt;

use formbind_store::{Attribute, PathStore};

use crate::error::PartError;
use crate::surface::{SharedSurface, WidgetHandle, WidgetRef};

/// Kind of a part, doubling as the kind of widget it creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartKind {
    Notebook,
    Tab,
    Page,
    Group,
    Text,
    Integer,
    Real,
    Choice,
    Check,
}

impl PartKind {
    /// Lowercase name, as used in document files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::Tab => "tab",
            Self::Page => "page",
            Self::Group => "group",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Choice => "choice",
            Self::Check => "check",
        }
    }

    /// Whether parts of this kind hold children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Notebook | Self::Tab | Self::Page | Self::Group)
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// State shared by every part: the store it binds against, its children and
/// its built widget.
pub struct PartBase {
    store: PathStore,
    children: Vec<Box<dyn Part>>,
    widget: OnceCell<WidgetRef>,
}

impl PartBase {
    #[must_use]
    pub fn new(store: &PathStore) -> Self {
        Self {
            store: store.clone(),
            children: Vec::new(),
            widget: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &PathStore {
        &self.store
    }

    pub fn add_child(&mut self, child: Box<dyn Part>) {
        self.children.push(child);
    }

    #[must_use]
    pub fn children(&self) -> &[Box<dyn Part>] {
        &self.children
    }

    /// The built widget, if any.
    #[must_use]
    pub fn widget(&self) -> Option<&WidgetRef> {
        self.widget.get()
    }

    /// The built widget, or `NotBuilt`.
    pub fn require_widget(&self) -> Result<&WidgetRef, PartError> {
        self.widget.get().ok_or(PartError::NotBuilt)
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.widget.get().is_some()
    }

    /// Create this part's widget. Fails with `AlreadyBuilt` on a second call.
    pub fn create_widget(
        &self,
        kind: PartKind,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetRef, PartError> {
        if self.is_built() {
            return Err(PartError::AlreadyBuilt);
        }
        let handle = surface.borrow_mut().create(kind, parent);
        let widget = WidgetRef::new(surface.clone(), handle);
        self.widget
            .set(widget.clone())
            .map_err(|_| PartError::AlreadyBuilt)?;
        tracing::trace!(%kind, %handle, "widget created");
        Ok(widget)
    }

    /// Build every child under `parent`, returning their handles in order.
    pub fn build_children(
        &self,
        surface: &SharedSurface,
        parent: WidgetHandle,
    ) -> Result<Vec<WidgetHandle>, PartError> {
        self.children
            .iter()
            .map(|child| child.build(surface, Some(parent)))
            .collect()
    }

    /// Request a relayout at the root of the widget tree. No-op before build.
    pub fn layout(&self) {
        if let Some(widget) = self.widget.get() {
            widget.relayout_root();
        }
    }
}

impl fmt::Debug for PartBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartBase")
            .field("children", &self.children.len())
            .field("widget", &self.widget.get().map(WidgetRef::handle))
            .finish()
    }
}

/// A node of the part tree.
pub trait Part {
    fn kind(&self) -> PartKind;

    fn base(&self) -> &PartBase;

    /// Materialize this part and its children on `surface`.
    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError>;

    /// Caption used by a parent notebook or tab navigator.
    fn title(&self) -> Option<&Attribute<String>> {
        None
    }

    /// Icon used by a parent tab navigator.
    fn icon(&self) -> Option<&Attribute<String>> {
        None
    }

    /// Re-pull this part's own bound state into its widget.
    fn refresh_self(&self) {}

    /// Re-pull bound state; with `recursive`, children first, then self.
    fn refresh(&self, recursive: bool) {
        if recursive {
            for child in self.children() {
                child.refresh(true);
            }
        }
        self.refresh_self();
    }

    /// Propagate a relayout request to the root of the widget tree.
    fn layout(&self) {
        self.base().layout();
    }

    fn children(&self) -> &[Box<dyn Part>] {
        self.base().children()
    }

    fn handle(&self) -> Option<WidgetHandle> {
        self.base().widget().map(WidgetRef::handle)
    }
}

/// Depth-first pre-order visit of `part` and its descendants.
pub fn walk(part: &dyn Part, visit: &mut dyn FnMut(&dyn Part, usize)) {
    fn go(part: &dyn Part, depth: usize, visit: &mut dyn FnMut(&dyn Part, usize)) {
        visit(part, depth);
        for child in part.children() {
            go(child.as_ref(), depth + 1, visit);
        }
    }
    go(part, 0, visit);
}
