//! # pathmodel-core
//!
//! A typed model tree for path-addressed key-value stores.
//!
//! This crate provides:
//! - Schema types: storage keys, fixed fields and dynamic collections
//! - Path templates with positional `$` variables
//! - Binding of schemas into nodes with absolute paths and a store
//! - Pinned clones of a subtree for one concrete instance
//! - Conversion between model-shaped and storage-shaped JSON
//! - A store trait, an in-memory store, and model-aware access on top
//!
//! This crate is intentionally runtime-agnostic and contains no async code.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pathmodel_core::{Binding, MemoryStore, Root, Schema};
//! use serde_json::json;
//!
//! # fn main() -> pathmodel_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let root = Root::new(
//!     [(
//!         "users",
//!         Schema::node("u", [("$userId", Schema::var([("name", Schema::leaf("n")?)])?)])?,
//!     )],
//!     Binding::new().store(store.clone()),
//! )?;
//!
//! let user = root.child("users").and_then(|u| u.var_child()).expect("modeled");
//! assert_eq!(user.path(), "u/$");
//!
//! user.at(&["u1"]).set(&json!({"name": "Bob"}))?;
//! assert_eq!(user.at(&["u1"]).get()?, Some(json!({"name": "Bob"})));
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod apply;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod node;
pub mod path;
pub mod store;

pub use access::Access;
pub use config::{clear_default_store, default_store, set_default_store, Binding};
pub use error::{ModelError, Result, StoreError};
pub use model::{Children, Schema, Shape};
pub use node::{Node, Root};
pub use path::{resolve, segment_is_valid, PathTemplate};
pub use store::{MemoryStore, Reference, Store, Subscription, TransactionOutcome};
