#![forbid(unsafe_code)]

//! Settings forms described in TOML, bound to a reactive store.
//!
//! A [`DocumentFile`] describes defaults, a part tree and export templates.
//! A [`Session`] opens it: the store is reset to the defaults, the parts are
//! built on a render surface and stay in sync with the store. Settings load
//! from and save to JSON; outputs are rendered with Handlebars.
//!
//! ```
//! use formbind::{DocumentFile, Session, SessionConfig};
//!
//! let document = DocumentFile::from_toml_str(r#"
//! [document]
//! title = "Demo"
//!
//! [defaults]
//! port = 8080
//!
//! [ui]
//! kind = "integer"
//! title = { format = "Port {port}" }
//! name = "port"
//! max = 65535
//! "#).unwrap();
//!
//! let (mut session, surface) = Session::headless(SessionConfig::default());
//! session.open(&document).unwrap();
//! session.set("port", 9090).unwrap();
//! assert!(surface.borrow().find_titled("Port 9090").is_some());
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod logging;
pub mod persist;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use formbind_store::NestedWrites;
pub use document::{AttrSpec, Document, DocumentError, DocumentFile, PartSpec};
pub use error::{FormbindError, Result};
pub use export::{ExportError, Exporter, OutputTemplate};
pub use persist::{PersistError, load_settings, save_settings};
pub use session::{Actions, Session};
