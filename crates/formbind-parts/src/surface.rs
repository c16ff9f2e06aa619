#![forbid(unsafe_code)]

//! The rendering boundary.
//!
//! Parts never talk to a toolkit directly. They create opaque widgets on a
//! [`RenderSurface`] and push [`Property`] updates to them; the surface decides
//! what those mean on screen. [`HeadlessSurface`](crate::HeadlessSurface) is
//! the in-memory implementation used by tests and the CLI.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::part::PartKind;

/// Opaque identifier of a widget created by a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetHandle(u32);

impl WidgetHandle {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WidgetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One presentation update pushed to a widget.
#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    /// Caption shown next to or above the widget.
    Title(String),
    /// Trailing label (units, hints).
    Label(String),
    Tooltip(Option<String>),
    Visible(bool),
    Icon(String),
    /// Numeric bounds of a spin-style input.
    Range { min: f64, max: f64 },
    /// Displayed fraction digits of a real input.
    Digits(u32),
    /// Labels of a choice input, in order.
    Options(Vec<String>),
    /// The edited value.
    Value(Value),
    /// Selected option index of a choice input; `None` clears the selection.
    Selection(Option<usize>),
    /// Caption of the page at `index` inside a notebook or tab navigator.
    PageText { index: usize, text: String },
    /// Icon of the page at `index` inside a tab navigator.
    PageIcon { index: usize, icon: String },
}

/// A toolkit adapter.
///
/// Implementations must not call back into the part tree or the store from
/// any of these methods; parts may call them from inside store notification
/// rounds.
pub trait RenderSurface {
    /// Create a widget of `kind` under `parent` (a root when `None`).
    fn create(&mut self, kind: PartKind, parent: Option<WidgetHandle>) -> WidgetHandle;

    fn apply(&mut self, handle: WidgetHandle, property: Property);

    fn parent(&self, handle: WidgetHandle) -> Option<WidgetHandle>;

    /// Recompute the layout of `handle` and everything below it.
    fn relayout(&mut self, handle: WidgetHandle);

    /// Discard every widget.
    fn reset(&mut self);
}

/// A surface shared between a part tree and the handlers it installs.
pub type SharedSurface = Rc<RefCell<dyn RenderSurface>>;

/// Wrap `surface` for sharing.
pub fn shared<S: RenderSurface + 'static>(surface: S) -> Rc<RefCell<S>> {
    Rc::new(RefCell::new(surface))
}

/// A built widget: the surface it lives on plus its handle.
///
/// Attribute handlers capture a `WidgetRef` rather than the part itself, so
/// they never keep the part (or its attributes) alive.
#[derive(Clone)]
pub struct WidgetRef {
    surface: SharedSurface,
    handle: WidgetHandle,
}

impl WidgetRef {
    pub(crate) fn new(surface: SharedSurface, handle: WidgetHandle) -> Self {
        Self { surface, handle }
    }

    #[must_use]
    pub fn handle(&self) -> WidgetHandle {
        self.handle
    }

    #[must_use]
    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn apply(&self, property: Property) {
        self.surface.borrow_mut().apply(self.handle, property);
    }

    /// Apply `property` to another widget on the same surface.
    pub fn apply_to(&self, handle: WidgetHandle, property: Property) {
        self.surface.borrow_mut().apply(handle, property);
    }

    /// Walk the parent chain to the root widget and relayout it.
    pub fn relayout_root(&self) {
        let root = {
            let surface = self.surface.borrow();
            let mut current = self.handle;
            while let Some(parent) = surface.parent(current) {
                current = parent;
            }
            current
        };
        self.surface.borrow_mut().relayout(root);
    }
}

impl fmt::Debug for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WidgetRef").field(&self.handle).finish()
    }
}
