#![forbid(unsafe_code)]

//! Input parts: widgets that edit one store path.
//!
//! Every input carries four attributes: `title`, `name` (the dotted store path
//! it edits), `label` and `tooltip`. Because `name` is itself an attribute, the
//! edited path may be computed from other keys; when it changes the input
//! retargets and re-reads.
//!
//! Inputs watch the top-level key of their path, so any assignment to that key
//! (a load, another input, a handler) is reflected in the widget. User edits
//! go through the `on_*` methods, which write the store; the widget then
//! updates from the resulting notification like any other change.
//!
//! A missing key is not an error for presentation: the widget keeps whatever
//! it showed before and the condition is logged at debug level.

use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

use formbind_store::{
    Attribute, Bindable, FromValue, KeyPath, PathStore, StoreError, Subscription, display_value,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::bind::{current, present, report, tooltip_text};
use crate::error::PartError;
use crate::part::{Part, PartBase, PartKind};
use crate::surface::{Property, SharedSurface, WidgetHandle, WidgetRef};

/// Type-specific presentation of a store value.
trait View: 'static {
    /// Shape accepted by `show`, for diagnostics.
    const EXPECTED: &'static str;

    /// Present `value`; `false` if it has the wrong shape.
    fn show(&self, widget: &WidgetRef, value: &Value) -> bool;
}

/// The part of an input shared with its attribute handlers and store watch.
struct Link<V> {
    store: PathStore,
    widget: OnceCell<WidgetRef>,
    path: RefCell<Option<KeyPath>>,
    watch: RefCell<Option<Subscription>>,
    view: V,
}

impl<V: View> Link<V> {
    fn path(&self) -> Option<KeyPath> {
        self.path.borrow().clone()
    }

    /// Pull the value at the current path into the widget.
    fn refresh(&self) {
        let (Some(widget), Some(path)) = (self.widget.get(), self.path()) else {
            return;
        };
        match self.store.get(&path) {
            Ok(value) => {
                if !self.view.show(widget, &value) {
                    warn!(path = %path, expected = V::EXPECTED, "input value has the wrong type; presentation unchanged");
                }
            }
            Err(err) => report("value", &err),
        }
    }

    /// Write `value` at the current path.
    fn write(&self, value: Value) -> Result<(), PartError> {
        if self.widget.get().is_none() {
            return Err(PartError::NotBuilt);
        }
        let path = self.path().ok_or(StoreError::EmptyPath)?;
        debug!(path = %path, value = %value, "input edited");
        self.store.set(path, value)?;
        Ok(())
    }

    /// Like [`write`](Self::write), for handlers that cannot return errors.
    fn commit(&self, value: Value) {
        if let Err(err) = self.write(value) {
            warn!(error = %err, "input write-back failed");
        }
    }
}

/// Point `link` at the dotted path `name`, move the store watch to its
/// top-level key and re-read.
fn retarget<V: View>(link: &Rc<Link<V>>, name: &str) {
    let path = KeyPath::parse(name);
    let watch = path.head().map(|key| {
        let weak = Rc::downgrade(link);
        link.store.subscribe(key, move |_, _| {
            if let Some(link) = weak.upgrade() {
                link.refresh();
            }
        })
    });
    debug!(path = %path, "input bound");
    *link.path.borrow_mut() = (!path.is_empty()).then_some(path);
    let previous = link.watch.replace(watch);
    drop(previous);
    link.refresh();
}

/// Attributes and plumbing common to every input.
struct Field<V> {
    title: Attribute<String>,
    name: Attribute<String>,
    label: Attribute<String>,
    tooltip: Attribute<Option<String>>,
    link: Rc<Link<V>>,
}

impl<V: View> Field<V> {
    fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
        view: V,
    ) -> Self {
        Self {
            title: Attribute::new(store, title),
            name: Attribute::new(store, name),
            label: Attribute::constant(String::new()),
            tooltip: Attribute::constant(None),
            link: Rc::new(Link {
                store: store.clone(),
                widget: OnceCell::new(),
                path: RefCell::new(None),
                watch: RefCell::new(None),
                view,
            }),
        }
    }

    fn view(&self) -> &V {
        &self.link.view
    }

    /// Create the widget and present title, label and tooltip.
    fn build(
        &self,
        base: &PartBase,
        kind: PartKind,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetRef, PartError> {
        let widget = base.create_widget(kind, surface, parent)?;
        self.link
            .widget
            .set(widget.clone())
            .map_err(|_| PartError::AlreadyBuilt)?;

        let own = widget.clone();
        present(&self.title, "title", move |text: &String| {
            own.apply(Property::Title(text.clone()));
        });
        let own = widget.clone();
        present(&self.label, "label", move |text: &String| {
            own.apply(Property::Label(text.clone()));
        });
        let own = widget.clone();
        present(&self.tooltip, "tooltip", move |tip: &Option<String>| {
            own.apply(Property::Tooltip(tooltip_text(tip.as_deref())));
        });
        Ok(widget)
    }

    /// Follow the `name` attribute. Reads the current value once.
    fn bind_name(&self) {
        let link = Rc::clone(&self.link);
        present(&self.name, "name", move |name: &String| retarget(&link, name));
    }
}

macro_rules! field_accessors {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub fn label(mut self, label: impl Into<Bindable<String>>) -> Self {
                self.field.label = Attribute::new(self.base.store(), label);
                self
            }

            #[must_use]
            pub fn tooltip(mut self, tooltip: impl Into<Bindable<Option<String>>>) -> Self {
                self.field.tooltip = Attribute::new(self.base.store(), tooltip);
                self
            }

            /// The attribute naming the edited store path.
            #[must_use]
            pub fn name(&self) -> &Attribute<String> {
                &self.field.name
            }

            /// The store path currently edited; `None` before build or while
            /// the name is unreadable.
            #[must_use]
            pub fn path(&self) -> Option<KeyPath> {
                self.field.link.path()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// TextInput
// ---------------------------------------------------------------------------

struct TextView;

impl View for TextView {
    const EXPECTED: &'static str = "text";

    fn show(&self, widget: &WidgetRef, value: &Value) -> bool {
        widget.apply(Property::Value(Value::String(display_value(value))));
        true
    }
}

/// Single-line text entry.
pub struct TextInput {
    base: PartBase,
    field: Field<TextView>,
}

impl TextInput {
    pub fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
    ) -> Self {
        Self {
            field: Field::new(store, title, name, TextView),
            base: PartBase::new(store),
        }
    }

    /// The user changed the text.
    pub fn on_value_changed(&self, text: &str) -> Result<(), PartError> {
        self.field.link.write(Value::String(text.to_owned()))
    }
}

field_accessors!(TextInput);

impl Part for TextInput {
    fn kind(&self) -> PartKind {
        PartKind::Text
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.field.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.field.build(&self.base, PartKind::Text, surface, parent)?;
        self.field.bind_name();
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        self.field.link.refresh();
    }
}

// ---------------------------------------------------------------------------
// IntegerInput
// ---------------------------------------------------------------------------

/// Clamp into `min..=max`. An inverted range collapses to `min`.
fn clamp_int(value: i64, (min, max): (i64, i64)) -> i64 {
    value.min(max).max(min)
}

/// Clamp into `min..=max`, ignoring non-finite bounds. An inverted range
/// collapses to `min`. A finite value always stays finite.
fn clamp_real(value: f64, (min, max): (f64, f64)) -> f64 {
    let value = if max.is_finite() { value.min(max) } else { value };
    if min.is_finite() { value.max(min) } else { value }
}

struct IntegerView {
    range: Cell<(i64, i64)>,
    shown: Cell<Option<i64>>,
}

impl IntegerView {
    fn display(&self, widget: &WidgetRef, value: i64) -> i64 {
        let clamped = clamp_int(value, self.range.get());
        self.shown.set(Some(clamped));
        widget.apply(Property::Value(Value::from(clamped)));
        clamped
    }
}

impl View for IntegerView {
    const EXPECTED: &'static str = i64::EXPECTED;

    fn show(&self, widget: &WidgetRef, value: &Value) -> bool {
        i64::from_value(value)
            .map(|v| self.display(widget, v))
            .is_some()
    }
}

fn apply_int_range(link: &Link<IntegerView>) {
    let (min, max) = link.view.range.get();
    if let Some(widget) = link.widget.get() {
        widget.apply(Property::Range {
            min: min as f64,
            max: max as f64,
        });
    }
}

/// Re-clamp the shown value into the new range and write it back.
fn reclamp_int(link: &Link<IntegerView>) {
    apply_int_range(link);
    let Some(widget) = link.widget.get() else {
        return;
    };
    let (min, _) = link.view.range.get();
    let value = link.view.display(widget, link.view.shown.get().unwrap_or(min));
    link.commit(Value::from(value));
}

/// Whole-number spinner with bounds.
pub struct IntegerInput {
    base: PartBase,
    field: Field<IntegerView>,
    min: Attribute<i64>,
    max: Attribute<i64>,
}

impl IntegerInput {
    pub const DEFAULT_MIN: i64 = 0;
    pub const DEFAULT_MAX: i64 = 100;

    pub fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
    ) -> Self {
        let view = IntegerView {
            range: Cell::new((Self::DEFAULT_MIN, Self::DEFAULT_MAX)),
            shown: Cell::new(None),
        };
        Self {
            field: Field::new(store, title, name, view),
            min: Attribute::constant(Self::DEFAULT_MIN),
            max: Attribute::constant(Self::DEFAULT_MAX),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn min(mut self, min: impl Into<Bindable<i64>>) -> Self {
        self.min = Attribute::new(self.base.store(), min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: impl Into<Bindable<i64>>) -> Self {
        self.max = Attribute::new(self.base.store(), max);
        self
    }

    /// Current `(min, max)` bounds of the widget.
    #[must_use]
    pub fn range(&self) -> (i64, i64) {
        self.field.view().range.get()
    }

    /// The value currently shown, after clamping.
    #[must_use]
    pub fn shown(&self) -> Option<i64> {
        self.field.view().shown.get()
    }

    /// The user spun to `value`; it is clamped into range before writing.
    pub fn on_value_changed(&self, value: i64) -> Result<(), PartError> {
        let value = clamp_int(value, self.range());
        self.field.link.write(Value::from(value))
    }
}

field_accessors!(IntegerInput);

impl Part for IntegerInput {
    fn kind(&self) -> PartKind {
        PartKind::Integer
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.field.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.field.build(&self.base, PartKind::Integer, surface, parent)?;
        let view = self.field.view();
        let (mut min, mut max) = view.range.get();
        if let Some(value) = current(&self.min, "min") {
            min = value;
        }
        if let Some(value) = current(&self.max, "max") {
            max = value;
        }
        view.range.set((min, max));
        apply_int_range(&self.field.link);

        let link = Rc::clone(&self.field.link);
        self.min.add_handler(
            move |min: &i64| {
                let (_, max) = link.view.range.get();
                link.view.range.set((*min, max));
                reclamp_int(&link);
            },
            false,
        )?;
        let link = Rc::clone(&self.field.link);
        self.max.add_handler(
            move |max: &i64| {
                let (min, _) = link.view.range.get();
                link.view.range.set((min, *max));
                reclamp_int(&link);
            },
            false,
        )?;

        self.field.bind_name();
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        self.field.link.refresh();
    }
}

// ---------------------------------------------------------------------------
// RealInput
// ---------------------------------------------------------------------------

struct RealView {
    range: Cell<(f64, f64)>,
    shown: Cell<Option<f64>>,
}

impl RealView {
    fn display(&self, widget: &WidgetRef, value: f64) -> f64 {
        let clamped = clamp_real(value, self.range.get());
        self.shown.set(Some(clamped));
        widget.apply(Property::Value(Value::from(clamped)));
        clamped
    }
}

impl View for RealView {
    const EXPECTED: &'static str = f64::EXPECTED;

    fn show(&self, widget: &WidgetRef, value: &Value) -> bool {
        f64::from_value(value)
            .map(|v| self.display(widget, v))
            .is_some()
    }
}

fn apply_real_range(link: &Link<RealView>) {
    let (min, max) = link.view.range.get();
    if let Some(widget) = link.widget.get() {
        widget.apply(Property::Range { min, max });
    }
}

/// Clamp the shown value (or the lower bound if nothing is shown yet) and
/// write it to the store. A non-finite lower bound starts from zero.
fn write_back_real(link: &Link<RealView>) {
    let Some(widget) = link.widget.get() else {
        return;
    };
    let (min, _) = link.view.range.get();
    let origin = if min.is_finite() { min } else { 0.0 };
    let value = link.view.display(widget, link.view.shown.get().unwrap_or(origin));
    link.commit(Value::from(value));
}

/// Decimal spinner with bounds and two display digits.
///
/// Unlike the other inputs, a real input writes its value to the store as
/// soon as it is built, so the key always exists afterwards.
pub struct RealInput {
    base: PartBase,
    field: Field<RealView>,
    min: Attribute<f64>,
    max: Attribute<f64>,
}

impl RealInput {
    pub const DEFAULT_MIN: f64 = 0.0;
    pub const DEFAULT_MAX: f64 = 100.0;
    pub const DIGITS: u32 = 2;

    pub fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
    ) -> Self {
        let view = RealView {
            range: Cell::new((Self::DEFAULT_MIN, Self::DEFAULT_MAX)),
            shown: Cell::new(None),
        };
        Self {
            field: Field::new(store, title, name, view),
            min: Attribute::constant(Self::DEFAULT_MIN),
            max: Attribute::constant(Self::DEFAULT_MAX),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn min(mut self, min: impl Into<Bindable<f64>>) -> Self {
        self.min = Attribute::new(self.base.store(), min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: impl Into<Bindable<f64>>) -> Self {
        self.max = Attribute::new(self.base.store(), max);
        self
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.field.view().range.get()
    }

    #[must_use]
    pub fn shown(&self) -> Option<f64> {
        self.field.view().shown.get()
    }

    pub fn on_value_changed(&self, value: f64) -> Result<(), PartError> {
        let value = clamp_real(value, self.range());
        self.field.link.write(Value::from(value))
    }
}

field_accessors!(RealInput);

impl Part for RealInput {
    fn kind(&self) -> PartKind {
        PartKind::Real
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.field.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.field.build(&self.base, PartKind::Real, surface, parent)?;
        widget.apply(Property::Digits(Self::DIGITS));
        let view = self.field.view();
        let (mut min, mut max) = view.range.get();
        if let Some(value) = current(&self.min, "min") {
            min = value;
        }
        if let Some(value) = current(&self.max, "max") {
            max = value;
        }
        view.range.set((min, max));
        apply_real_range(&self.field.link);

        let link = Rc::clone(&self.field.link);
        self.min.add_handler(
            move |min: &f64| {
                let (_, max) = link.view.range.get();
                link.view.range.set((*min, max));
                apply_real_range(&link);
                write_back_real(&link);
            },
            false,
        )?;
        let link = Rc::clone(&self.field.link);
        self.max.add_handler(
            move |max: &f64| {
                let (min, _) = link.view.range.get();
                link.view.range.set((min, *max));
                apply_real_range(&link);
                write_back_real(&link);
            },
            false,
        )?;

        self.field.bind_name();
        write_back_real(&self.field.link);
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        self.field.link.refresh();
    }
}

// ---------------------------------------------------------------------------
// ChoiceInput
// ---------------------------------------------------------------------------

/// One entry of a choice input: the value written to the store and the text
/// shown for it.
#[derive(Clone, Debug, PartialEq)]
pub struct ChoiceOption {
    pub id: Value,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(id: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Accepts `[id, label]`, `{ "id": .., "label": .. }`, or a bare string used
/// as both id and label.
impl FromValue for ChoiceOption {
    const EXPECTED: &'static str = "an option ([id, label], {id, label} or a string)";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::new(text.clone(), text.clone())),
            Value::Array(pair) => match pair.as_slice() {
                [id, label] => Some(Self::new(id.clone(), String::from_value(label)?)),
                _ => None,
            },
            Value::Object(map) => {
                let id = map.get("id")?.clone();
                let label = match map.get("label") {
                    Some(label) => String::from_value(label)?,
                    None => display_value(&id),
                };
                Some(Self { id, label })
            }
            _ => None,
        }
    }
}

struct ChoiceView {
    ids: RefCell<Vec<Value>>,
    selected: Cell<Option<usize>>,
}

impl View for ChoiceView {
    const EXPECTED: &'static str = "one of the option ids";

    fn show(&self, widget: &WidgetRef, value: &Value) -> bool {
        let index = self.ids.borrow().iter().position(|id| id == value);
        self.selected.set(index);
        widget.apply(Property::Selection(index));
        true
    }
}

/// Single-selection list of options.
///
/// A store value that is not among the option ids shows no selection.
pub struct ChoiceInput {
    base: PartBase,
    field: Field<ChoiceView>,
    options: Attribute<Vec<ChoiceOption>>,
}

impl ChoiceInput {
    pub fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
    ) -> Self {
        let view = ChoiceView {
            ids: RefCell::new(Vec::new()),
            selected: Cell::new(None),
        };
        Self {
            field: Field::new(store, title, name, view),
            options: Attribute::constant(Vec::new()),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn options(mut self, options: impl Into<Bindable<Vec<ChoiceOption>>>) -> Self {
        self.options = Attribute::new(self.base.store(), options);
        self
    }

    /// Constant options from `(id, label)` pairs.
    #[must_use]
    pub fn choices<I, V, L>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<Value>,
        L: Into<String>,
    {
        let options = choices
            .into_iter()
            .map(|(id, label)| ChoiceOption::new(id, label))
            .collect();
        self.options(Bindable::Constant(options))
    }

    /// Index of the selected option, if the store value matches one.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.field.view().selected.get()
    }

    /// Current option ids, in order.
    #[must_use]
    pub fn option_ids(&self) -> Vec<Value> {
        self.field.view().ids.borrow().clone()
    }

    /// The user picked the option at `index`; its id is written to the store.
    pub fn select(&self, index: usize) -> Result<(), PartError> {
        self.base.require_widget()?;
        let id = {
            let ids = self.field.view().ids.borrow();
            ids.get(index).cloned().ok_or(PartError::OutOfRange {
                index,
                len: ids.len(),
            })?
        };
        self.field.link.write(id)
    }
}

field_accessors!(ChoiceInput);

impl Part for ChoiceInput {
    fn kind(&self) -> PartKind {
        PartKind::Choice
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.field.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.field.build(&self.base, PartKind::Choice, surface, parent)?;

        // Options first: the selection is looked up among their ids.
        let link = Rc::clone(&self.field.link);
        present(&self.options, "options", move |options: &Vec<ChoiceOption>| {
            *link.view.ids.borrow_mut() = options.iter().map(|o| o.id.clone()).collect();
            if let Some(widget) = link.widget.get() {
                widget.apply(Property::Options(
                    options.iter().map(|o| o.label.clone()).collect(),
                ));
            }
            link.refresh();
        });

        self.field.bind_name();
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        self.field.link.refresh();
    }
}

// ---------------------------------------------------------------------------
// CheckInput
// ---------------------------------------------------------------------------

struct CheckView {
    checked: Cell<Option<bool>>,
}

impl View for CheckView {
    const EXPECTED: &'static str = bool::EXPECTED;

    fn show(&self, widget: &WidgetRef, value: &Value) -> bool {
        let Some(checked) = bool::from_value(value) else {
            return false;
        };
        self.checked.set(Some(checked));
        widget.apply(Property::Value(Value::Bool(checked)));
        true
    }
}

/// A checkbox.
pub struct CheckInput {
    base: PartBase,
    field: Field<CheckView>,
}

impl CheckInput {
    pub fn new(
        store: &PathStore,
        title: impl Into<Bindable<String>>,
        name: impl Into<Bindable<String>>,
    ) -> Self {
        let view = CheckView {
            checked: Cell::new(None),
        };
        Self {
            field: Field::new(store, title, name, view),
            base: PartBase::new(store),
        }
    }

    #[must_use]
    pub fn checked(&self) -> Option<bool> {
        self.field.view().checked.get()
    }

    pub fn on_toggled(&self, checked: bool) -> Result<(), PartError> {
        self.field.link.write(Value::Bool(checked))
    }
}

field_accessors!(CheckInput);

impl Part for CheckInput {
    fn kind(&self) -> PartKind {
        PartKind::Check
    }

    fn base(&self) -> &PartBase {
        &self.base
    }

    fn title(&self) -> Option<&Attribute<String>> {
        Some(&self.field.title)
    }

    fn build(
        &self,
        surface: &SharedSurface,
        parent: Option<WidgetHandle>,
    ) -> Result<WidgetHandle, PartError> {
        let widget = self.field.build(&self.base, PartKind::Check, surface, parent)?;
        self.field.bind_name();
        Ok(widget.handle())
    }

    fn refresh_self(&self) {
        self.field.link.refresh();
    }
}
