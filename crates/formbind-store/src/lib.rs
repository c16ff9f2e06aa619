#![forbid(unsafe_code)]

//! Reactive variable store for declarative settings forms.
//!
//! This crate holds the model half of formbind:
//!
//! - [`PathStore`]: a nested mapping addressed by dotted [`KeyPath`]s, with
//!   synchronous per-key change notification.
//! - [`Subscription`] / [`BindingScope`]: RAII handles for store callbacks.
//! - [`Func`]: dependency keys plus a pure evaluator.
//! - [`Attribute`]: a constant or computed value that re-evaluates and calls
//!   its handlers whenever a dependency key is assigned.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); the store and its
//! attributes are not `Send`.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use formbind_store::{Attribute, Func, PathStore};
//! use serde_json::json;
//!
//! let store = PathStore::new();
//! store.update([("count", json!(1))]);
//!
//! let doubled = Attribute::computed(
//!     &store,
//!     Func::map("count", |c| c.as_i64().unwrap_or(0) * 2),
//! );
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! doubled
//!     .add_handler(move |v| sink.borrow_mut().push(*v), true)
//!     .unwrap();
//!
//! store.set("count", 5).unwrap();
//! assert_eq!(*seen.borrow(), vec![2, 10]);
//! ```

pub mod attribute;
pub mod error;
pub mod func;
pub mod path;
pub mod store;
pub mod subscription;
pub mod value;

pub use attribute::{Attribute, Bindable};
pub use error::{Result, StoreError};
pub use func::Func;
pub use path::KeyPath;
pub use store::{NestedWrites, PathStore, StoreConfig};
pub use subscription::{BindingScope, Subscription};
pub use value::{FromValue, display_value};
