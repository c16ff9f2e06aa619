#![forbid(unsafe_code)]

//! The path-addressable variable store.
//!
//! [`PathStore`] is a nested, order-preserving mapping from top-level keys to
//! [`serde_json::Value`]s with key-scoped change subscriptions. Every
//! top-level assignment fans out synchronously to the subscribers bound to
//! that exact key before `set` returns.
//!
//! # Architecture
//!
//! The store is a cheap, clonable handle over `Rc<StoreInner>`: one instance
//! is constructed per application and passed by reference to every part and
//! attribute. Values and bindings live in separate `RefCell`s and neither is
//! borrowed while a subscriber runs, so subscribers may read, write,
//! subscribe or unsubscribe from inside a notification round.
//!
//! # Invariants
//!
//! 1. A top-level assignment (direct `set` or `update`) notifies the
//!    subscribers of exactly that key, never of ancestors or descendants.
//! 2. Subscribers run in registration order.
//! 3. The subscriber list of a round is fixed when the round starts.
//!    Subscribers added during the round first fire on the next one;
//!    subscribers released (or cleared) during the round are skipped.
//! 4. There is no batching, deduplication or unchanged-value detection:
//!    assigning an identical value still notifies.
//! 5. A nested write (`set` with a multi-segment path) never creates
//!    intermediate mappings.
//!
//! # Nested writes
//!
//! Whether a multi-segment `set` notifies the subscribers of its top-level key
//! is controlled by [`NestedWrites`]. The default, [`NestedWrites::Notify`],
//! passes the whole mutated top-level value to those subscribers.
//! [`NestedWrites::Silent`] keeps nested writes invisible to subscribers, the
//! historical behavior of the form builder this store was written for.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing segment | `get`/`set` through an absent key | `KeyNotFound` |
//! | Scalar in the middle of a path | `a.b` where `a` is a number | `NotAMapping` |
//! | Empty path | zero segments | `EmptyPath` |
//! | Subscriber panics | bug in a callback | Propagates to the writer; the rest of the round is skipped |

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::path::KeyPath;
use crate::subscription::Subscription;

/// Notification policy for multi-segment assignments.
///
/// With the `serde` feature it (de)serializes as `"notify"` / `"silent"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NestedWrites {
    /// Notify the top-level key's subscribers with the mutated top-level value.
    #[default]
    Notify,
    /// Mutate in place without notifying anyone.
    Silent,
}

/// Construction-time options for a [`PathStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub nested_writes: NestedWrites,
}

pub(crate) type Callback = dyn Fn(&str, &Value);

/// One registered callback. `active` goes false when the subscription is
/// released or the store is cleared, which also stops a round in progress
/// from calling it.
pub(crate) struct Subscriber {
    pub(crate) id: u64,
    pub(crate) active: Cell<bool>,
    callback: Rc<Callback>,
}

pub(crate) struct StoreInner {
    values: RefCell<Map<String, Value>>,
    bindings: RefCell<HashMap<String, Vec<Rc<Subscriber>>>>,
    next_id: Cell<u64>,
    depth: Cell<usize>,
    config: StoreConfig,
}

impl StoreInner {
    /// Remove one subscriber. The removed entry is dropped after the borrow is
    /// released since its callback may own further subscriptions.
    pub(crate) fn unsubscribe(&self, key: &str, id: u64) {
        let removed = {
            let mut bindings = self.bindings.borrow_mut();
            let Some(list) = bindings.get_mut(key) else {
                return;
            };
            let position = list.iter().position(|sub| sub.id == id);
            let removed = position.map(|index| list.remove(index));
            if list.is_empty() {
                bindings.remove(key);
            }
            removed
        };
        if let Some(sub) = removed {
            sub.active.set(false);
            trace!(key, id, "subscription released");
        }
    }

    pub(crate) fn is_subscribed(&self, key: &str, id: u64) -> bool {
        self.bindings
            .borrow()
            .get(key)
            .is_some_and(|list| list.iter().any(|sub| sub.id == id && sub.active.get()))
    }
}

/// Decrements the notification depth even if a subscriber unwinds.
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Nested key-value store with key-scoped change subscriptions.
///
/// Cloning a `PathStore` yields another handle to the **same** store.
#[derive(Clone)]
pub struct PathStore {
    inner: Rc<StoreInner>,
}

impl PathStore {
    /// Create an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                values: RefCell::new(Map::new()),
                bindings: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
                depth: Cell::new(0),
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> StoreConfig {
        self.inner.config
    }

    /// Resolve `path` and return a clone of the value found there (which may
    /// itself be a nested mapping).
    pub fn get(&self, path: impl Into<KeyPath>) -> Result<Value> {
        self.with_value(path, Value::clone)
    }

    /// Resolve `path` and pass a reference to the value to `f`.
    ///
    /// The store is borrowed while `f` runs: `f` may read but must not write.
    pub fn with_value<R>(&self, path: impl Into<KeyPath>, f: impl FnOnce(&Value) -> R) -> Result<R> {
        let path = path.into();
        let values = self.inner.values.borrow();
        let value = resolve(&values, &path)?;
        Ok(f(value))
    }

    /// Whether `path` resolves to a value.
    #[must_use]
    pub fn contains(&self, path: impl Into<KeyPath>) -> bool {
        let path = path.into();
        resolve(&self.inner.values.borrow(), &path).is_ok()
    }

    /// Assign `value` at `path`.
    ///
    /// A single-segment path is a top-level assignment and always notifies.
    /// A longer path mutates an existing nested mapping in place; every
    /// intermediate segment must already exist and be a mapping. Whether it
    /// notifies depends on [`StoreConfig::nested_writes`].
    pub fn set(&self, path: impl Into<KeyPath>, value: impl Into<Value>) -> Result<()> {
        let path = path.into();
        let value = value.into();
        match path.segments() {
            [] => Err(StoreError::EmptyPath),
            [key] => {
                self.assign(key, value);
                Ok(())
            }
            [head, .., last] => {
                let top = {
                    let mut values = self.inner.values.borrow_mut();
                    let parent = resolve_parent_mut(&mut values, &path)?;
                    parent.insert(last.clone(), value);
                    trace!(path = %path, "nested assignment");
                    match self.inner.config.nested_writes {
                        NestedWrites::Notify => values.get(head.as_str()).cloned(),
                        NestedWrites::Silent => None,
                    }
                };
                if let Some(top) = top {
                    self.notify(head, &top);
                }
                Ok(())
            }
        }
    }

    /// Apply every entry as an independent top-level assignment, in iteration
    /// order. Each entry triggers its own notification round.
    pub fn update<I, K>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in entries {
            let key = key.into();
            self.assign(&key, value);
        }
    }

    /// Empty the store and discard every subscription.
    ///
    /// Outstanding [`Subscription`] guards become inert and attributes
    /// computed over the old keys fail with `KeyNotFound` on their next read.
    pub fn clear(&self) {
        let values = std::mem::take(&mut *self.inner.values.borrow_mut());
        let bindings = std::mem::take(&mut *self.inner.bindings.borrow_mut());
        let mut released = 0usize;
        for sub in bindings.values().flatten() {
            sub.active.set(false);
            released += 1;
        }
        debug!(keys = values.len(), subscriptions = released, "store cleared");
        // Callbacks may own subscriptions of their own; drop them only after
        // the borrows above are gone.
        drop(bindings);
    }

    /// Register `callback` for every future top-level assignment to `key`.
    ///
    /// The callback receives the key and the newly assigned value. Dropping
    /// the returned guard unregisters it.
    pub fn subscribe(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&str, &Value) + 'static,
    ) -> Subscription {
        self.register(key.into(), Rc::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe), then invoke `callback` once with
    /// the current value of `key`.
    ///
    /// If `key` is absent the immediate call is silently skipped; the
    /// subscription is still registered.
    pub fn subscribe_immediate(
        &self,
        key: impl Into<String>,
        callback: impl Fn(&str, &Value) + 'static,
    ) -> Subscription {
        let key = key.into();
        let callback: Rc<Callback> = Rc::new(callback);
        let subscription = self.register(key.clone(), Rc::clone(&callback));
        let current = self.inner.values.borrow().get(&key).cloned();
        match current {
            Some(value) => callback(&key, &value),
            None => trace!(key = %key, "immediate subscription on absent key skipped"),
        }
        subscription
    }

    /// Number of live subscribers bound to `key`.
    #[must_use]
    pub fn binding_count(&self, key: &str) -> usize {
        self.inner
            .bindings
            .borrow()
            .get(key)
            .map_or(0, |list| list.iter().filter(|sub| sub.active.get()).count())
    }

    /// A value-complete copy of the current contents, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner.values.borrow().clone()
    }

    /// Top-level keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.values.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.borrow().is_empty()
    }

    /// Whether two handles refer to the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn assign(&self, key: &str, value: Value) {
        self.inner
            .values
            .borrow_mut()
            .insert(key.to_owned(), value.clone());
        trace!(key, "assignment");
        self.notify(key, &value);
    }

    fn register(&self, key: String, callback: Rc<Callback>) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let entry = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback,
        });
        self.inner
            .bindings
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push(entry);
        trace!(key = %key, id, "subscribed");
        Subscription::new(Rc::downgrade(&self.inner), key, id)
    }

    fn notify(&self, key: &str, value: &Value) {
        let round: Vec<Rc<Subscriber>> = match self.inner.bindings.borrow().get(key) {
            Some(list) => list.clone(),
            None => return,
        };
        let depth = self.inner.depth.get() + 1;
        self.inner.depth.set(depth);
        let _guard = DepthGuard(&self.inner.depth);
        trace!(key, subscribers = round.len(), depth, "notification round");
        for sub in &round {
            if sub.active.get() {
                (sub.callback)(key, value);
            }
        }
    }
}

impl Default for PathStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PathStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: usize = self.inner.bindings.borrow().values().map(Vec::len).sum();
        f.debug_struct("PathStore")
            .field("keys", &self.keys())
            .field("subscriptions", &bindings)
            .field("config", &self.inner.config)
            .finish()
    }
}

fn resolve<'a>(root: &'a Map<String, Value>, path: &KeyPath) -> Result<&'a Value> {
    let (head, rest) = path.segments().split_first().ok_or(StoreError::EmptyPath)?;
    let mut current = root
        .get(head)
        .ok_or_else(|| StoreError::key_not_found(path, 0))?;
    for (offset, segment) in rest.iter().enumerate() {
        let depth = offset + 1;
        let map = current
            .as_object()
            .ok_or_else(|| StoreError::not_a_mapping(path, depth - 1))?;
        current = map
            .get(segment)
            .ok_or_else(|| StoreError::key_not_found(path, depth))?;
    }
    Ok(current)
}

/// Resolve every segment but the last and return the mapping the last
/// segment will be written into. `path` must have at least two segments.
fn resolve_parent_mut<'a>(
    root: &'a mut Map<String, Value>,
    path: &KeyPath,
) -> Result<&'a mut Map<String, Value>> {
    let segments = path.segments();
    let parent_len = segments.len() - 1;
    let mut current = root
        .get_mut(&segments[0])
        .ok_or_else(|| StoreError::key_not_found(path, 0))?;
    for (depth, segment) in segments.iter().enumerate().take(parent_len).skip(1) {
        current = current
            .as_object_mut()
            .ok_or_else(|| StoreError::not_a_mapping(path, depth - 1))?
            .get_mut(segment)
            .ok_or_else(|| StoreError::key_not_found(path, depth))?;
    }
    current
        .as_object_mut()
        .ok_or_else(|| StoreError::not_a_mapping(path, parent_len - 1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
