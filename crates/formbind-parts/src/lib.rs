#![forbid(unsafe_code)]

//! Part tree for formbind settings forms.
//!
//! A form is a tree of [`Part`]s: containers ([`Notebook`], [`Tab`],
//! [`Page`], [`OptionsGroup`]) and inputs ([`TextInput`], [`IntegerInput`],
//! [`RealInput`], [`ChoiceInput`], [`CheckInput`]). Each part holds
//! [`Attribute`](formbind_store::Attribute)s over a shared
//! [`PathStore`](formbind_store::PathStore) and, once built on a
//! [`RenderSurface`], keeps its widget in sync with them.
//!
//! # Example
//!
//! ```
//! use formbind_parts::{HeadlessSurface, IntegerInput, OptionsGroup, Page, Part, SharedSurface};
//! use formbind_store::{Func, PathStore};
//! use serde_json::json;
//!
//! let store = PathStore::new();
//! store.update([("port", json!(8080)), ("advanced", json!(false))]);
//!
//! let page = Page::new(&store, "General").with_child(
//!     OptionsGroup::new(&store, "Network")
//!         .visible(Func::<bool>::bind("advanced"))
//!         .with_child(IntegerInput::new(&store, "Port", "port").max(65535i64)),
//! );
//!
//! let headless = formbind_parts::shared(HeadlessSurface::new());
//! let surface: SharedSurface = headless.clone();
//! page.build(&surface, None).unwrap();
//!
//! store.set("advanced", true).unwrap();
//! print!("{}", headless.borrow());
//! ```

mod bind;
pub mod container;
pub mod error;
pub mod headless;
pub mod input;
pub mod part;
pub mod surface;

pub use container::{DEFAULT_PAGE_ICON, Notebook, OptionsGroup, Page, Tab};
pub use error::PartError;
pub use headless::{HeadlessSurface, WidgetRecord};
pub use input::{CheckInput, ChoiceInput, ChoiceOption, IntegerInput, RealInput, TextInput};
pub use part::{Part, PartBase, PartKind, walk};
pub use surface::{Property, RenderSurface, SharedSurface, WidgetHandle, WidgetRef, shared};
