#![forbid(unsafe_code)]

//! Reactive attributes: constant or computed values with change handlers.
//!
//! An [`Attribute<T>`] parameterizes a part's presentation (title,
//! visibility, numeric bounds, option lists, ...). It wraps either a constant
//! or a [`Func`] over store keys, decided once at construction through
//! [`Bindable`].
//!
//! # Design
//!
//! A computed attribute subscribes one *trampoline* per distinct dependency
//! key. When any of those keys is assigned, the trampoline re-evaluates the
//! attribute and passes the fresh value to every handler, in registration
//! order. Reads are never cached: [`value()`](Attribute::value) evaluates
//! against the current store contents each time.
//!
//! The trampolines hold only a `Weak` reference to the attribute, and their
//! subscriptions live in the attribute's [`BindingScope`]; dropping the last
//! clone of an attribute unregisters it from the store.
//!
//! # Invariants
//!
//! 1. A constant attribute never touches the store.
//! 2. Handlers receive only the new value, never the old one or the key that
//!    changed.
//! 3. One assignment to a dependency key notifies each handler exactly once,
//!    even if the key is declared twice.
//!
//! # Failure Modes
//!
//! - **Missing dependency on read**: `value()` returns `KeyNotFound`.
//! - **Missing dependency during a notification round**: the trampoline logs a
//!   warning and skips this attribute's handlers. Other subscribers of the
//!   same key still run and the triggering `set` still succeeds.
//! - **Handler panics**: propagate to the writer that triggered the round.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::func::Func;
use crate::store::PathStore;
use crate::subscription::BindingScope;

/// How an attribute gets its value: fixed, or computed from store keys.
pub enum Bindable<T> {
    Constant(T),
    Computed(Func<T>),
}

impl<T> From<Func<T>> for Bindable<T> {
    fn from(func: Func<T>) -> Self {
        Self::Computed(func)
    }
}

impl From<&str> for Bindable<String> {
    fn from(value: &str) -> Self {
        Self::Constant(value.to_owned())
    }
}

impl From<String> for Bindable<String> {
    fn from(value: String) -> Self {
        Self::Constant(value)
    }
}

impl From<&str> for Bindable<Option<String>> {
    fn from(value: &str) -> Self {
        Self::Constant(Some(value.to_owned()))
    }
}

impl From<Option<String>> for Bindable<Option<String>> {
    fn from(value: Option<String>) -> Self {
        Self::Constant(value)
    }
}

impl From<bool> for Bindable<bool> {
    fn from(value: bool) -> Self {
        Self::Constant(value)
    }
}

impl From<i64> for Bindable<i64> {
    fn from(value: i64) -> Self {
        Self::Constant(value)
    }
}

impl From<f64> for Bindable<f64> {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl From<Value> for Bindable<Value> {
    fn from(value: Value) -> Self {
        Self::Constant(value)
    }
}

type Handler<T> = dyn Fn(&T);

enum Source<T> {
    Constant(T),
    Computed { store: PathStore, func: Func<T> },
}

struct AttributeInner<T> {
    source: Source<T>,
    handlers: RefCell<Vec<Rc<Handler<T>>>>,
    scope: RefCell<BindingScope>,
}

impl<T: Clone + 'static> AttributeInner<T> {
    fn evaluate(&self) -> Result<T> {
        match &self.source {
            Source::Constant(value) => Ok(value.clone()),
            Source::Computed { store, func } => func.evaluate(store),
        }
    }

    /// The trampoline body: re-evaluate and fan out to the handlers.
    fn fire(&self, key: &str) {
        match self.evaluate() {
            Ok(value) => {
                let handlers = self.handlers.borrow().clone();
                for handler in &handlers {
                    handler(&value);
                }
            }
            Err(err) => {
                warn!(key, error = %err, "attribute re-evaluation failed; handlers skipped");
            }
        }
    }
}

/// A constant or computed value with change handlers.
///
/// Cloning an `Attribute` creates another handle to the **same** attribute.
pub struct Attribute<T> {
    inner: Rc<AttributeInner<T>>,
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Attribute<T> {
    /// Resolve `source` into a constant or computed attribute over `store`.
    pub fn new(store: &PathStore, source: impl Into<Bindable<T>>) -> Self {
        match source.into() {
            Bindable::Constant(value) => Self::constant(value),
            Bindable::Computed(func) => Self::computed(store, func),
        }
    }

    /// An attribute that always reads as `value`. Performs no subscription.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            inner: Rc::new(AttributeInner {
                source: Source::Constant(value),
                handlers: RefCell::new(Vec::new()),
                scope: RefCell::new(BindingScope::new()),
            }),
        }
    }

    /// An attribute evaluated from `func` over `store`, subscribed to every
    /// distinct dependency key.
    pub fn computed(store: &PathStore, func: Func<T>) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for dep in func.dependencies() {
            if !keys.contains(dep) {
                keys.push(dep.clone());
            }
        }

        let inner = Rc::new(AttributeInner {
            source: Source::Computed {
                store: store.clone(),
                func,
            },
            handlers: RefCell::new(Vec::new()),
            scope: RefCell::new(BindingScope::new()),
        });

        let mut scope = BindingScope::new();
        for key in keys {
            let weak = Rc::downgrade(&inner);
            scope.subscribe(store, key, move |key, _| {
                if let Some(strong) = weak.upgrade() {
                    strong.fire(key);
                }
            });
        }
        *inner.scope.borrow_mut() = scope;

        Self { inner }
    }

    /// The current value. Computed attributes evaluate fresh on every call.
    pub fn value(&self) -> Result<T> {
        self.inner.evaluate()
    }

    /// Append `handler`. With `invoke_immediately`, call it once right away
    /// with the current value; an evaluation failure is returned and the
    /// handler stays registered.
    pub fn add_handler(
        &self,
        handler: impl Fn(&T) + 'static,
        invoke_immediately: bool,
    ) -> Result<()> {
        let handler: Rc<Handler<T>> = Rc::new(handler);
        self.inner.handlers.borrow_mut().push(Rc::clone(&handler));
        if invoke_immediately {
            let value = self.value()?;
            handler(&value);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self.inner.source, Source::Computed { .. })
    }

    /// Declared dependency keys; empty for constants.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        match &self.inner.source {
            Source::Constant(_) => &[],
            Source::Computed { func, .. } => func.dependencies(),
        }
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.borrow().len()
    }

    /// Store subscriptions held by this attribute.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.scope.borrow().binding_count()
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Attribute");
        match &self.inner.source {
            Source::Constant(value) => dbg.field("constant", value),
            Source::Computed { func, .. } => dbg
                .field("deps", &func.dependencies())
                .field("value", &self.value().ok()),
        };
        dbg.field("handlers", &self.handler_count()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
