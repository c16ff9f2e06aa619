#![forbid(unsafe_code)]

//! Subscription lifetime management.
//!
//! [`Subscription`] is the RAII guard returned by
//! [`PathStore::subscribe`](crate::PathStore::subscribe): dropping it
//! unregisters the callback. [`BindingScope`] collects the subscriptions of one
//! owner (an attribute, a part) so that tearing the owner down releases all of
//! them at once.
//!
//! # Invariants
//!
//! 1. After a `Subscription` drops, its callback never runs again, including
//!    in a notification round already in progress.
//! 2. A guard outliving its store, or a store that was `clear()`ed, drops as a
//!    no-op.
//! 3. `BindingScope` releases subscriptions in registration order on drop or
//!    `clear()`.

use std::fmt;
use std::rc::Weak;

use serde_json::Value;

use crate::store::{PathStore, StoreInner};

/// Guard for one registered store callback.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    store: Option<Weak<StoreInner>>,
    key: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(store: Weak<StoreInner>, key: String, id: u64) -> Self {
        Self {
            store: Some(store),
            key,
            id,
        }
    }

    /// The top-level key this subscription listens on.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the callback is still registered with a live store.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.store
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|inner| inner.is_subscribed(&self.key, self.id))
    }

    /// Keep the callback registered for the remaining lifetime of the store
    /// (or until the next `clear()`).
    pub fn detach(mut self) {
        self.store = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.take().and_then(|weak| weak.upgrade()) {
            inner.unsubscribe(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Collects subscriptions for one logical owner.
///
/// ```
/// # use formbind_store::{BindingScope, PathStore};
/// let store = PathStore::new();
/// let mut scope = BindingScope::new();
/// scope.subscribe(&store, "count", |_, v| println!("count = {v}"));
/// assert_eq!(store.binding_count("count"), 1);
///
/// drop(scope);
/// assert_eq!(store.binding_count("count"), 0);
/// ```
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `subscription` alive until the scope is dropped or cleared.
    pub fn hold(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    /// Subscribe to `key` on `store` within this scope.
    pub fn subscribe(
        &mut self,
        store: &PathStore,
        key: impl Into<String>,
        callback: impl Fn(&str, &Value) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(store.subscribe(key, callback));
        self
    }

    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Keys held by this scope, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(Subscription::key)
    }

    /// Release everything now; the scope stays usable.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
