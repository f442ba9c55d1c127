//! Bound model nodes.
//!
//! A [`Node`] is a [`Schema`] that has been given an absolute path and,
//! optionally, a store. Nodes are produced by binding a schema (see
//! [`Root::new`] and [`Node::bind`]) or by cloning a bound node with
//! [`Node::clone_with`]. The shape never changes after that; only the
//! applicator writes paths and store bindings.

use std::ops::Deref;
use std::sync::Arc;

use serde_json::Value;
use tracing::trace;

use crate::access::Access;
use crate::apply::{self, PathRule};
use crate::config::{self, Binding};
use crate::convert;
use crate::error::{ModelError, Result};
use crate::model::{Children, Schema, Shape};
use crate::path::PathTemplate;
use crate::store::{Reference, Store, Subscription, CONNECTED_PATH, SERVER_TIME_OFFSET_PATH};

/// One bound segment of a model tree.
///
/// `Clone` copies the whole subtree; the bound store is shared.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) key: String,
    pub(crate) path: PathTemplate,
    pub(crate) store: Option<Arc<dyn Store>>,
    pub(crate) store_blocked: bool,
    pub(crate) children: Children<Node>,
}

impl Node {
    /// Bind `schema` below `parent_path` (the root if `None`).
    pub fn bind(schema: &Schema, parent_path: Option<&str>, binding: &Binding) -> Self {
        let mut node = Self::unbound(schema);
        apply::apply(&mut node, PathRule::FromParent(parent_path), binding);
        node
    }

    fn unbound(schema: &Schema) -> Self {
        Self {
            key: schema.key().to_string(),
            path: PathTemplate::default(),
            store: None,
            store_blocked: false,
            children: schema.children().map(Self::unbound),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The absolute path template, with `$` at every variable ancestor.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    pub fn path_template(&self) -> &PathTemplate {
        &self.path
    }

    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.store.as_ref()
    }

    pub fn store_blocked(&self) -> bool {
        self.store_blocked
    }

    pub fn children(&self) -> &Children<Node> {
        &self.children
    }

    /// Child by field name.
    pub fn child(&self, field: &str) -> Option<&Node> {
        self.children.get(field)
    }

    /// The variable child of a dynamic-collection node.
    pub fn var_child(&self) -> Option<&Node> {
        self.children.variable()
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.children, Children::Collection { .. })
    }

    /// Resolve this node's path with positional `vars`.
    pub fn path_with_vars(&self, vars: &[&str]) -> Result<String> {
        self.path.resolve(vars)
    }

    /// Path from this node down to `target`, excluding this node's own
    /// segments, resolved with `vars`.
    pub fn path_to(&self, target: &Node, vars: &[&str]) -> Result<String> {
        target.path.relative_to(&self.path, vars)
    }

    /// The store address for this node.
    ///
    /// `store` overrides the bound and default stores unless this node's
    /// store is blocked.
    pub fn reference(&self, vars: &[&str], store: Option<&Arc<dyn Store>>) -> Result<Reference> {
        let store = self.select_store(store)?;
        Ok(Reference::new(store, self.path_with_vars(vars)?))
    }

    pub(crate) fn select_store(&self, store: Option<&Arc<dyn Store>>) -> Result<Arc<dyn Store>> {
        if let Some(store) = store {
            if self.store_blocked {
                return Err(ModelError::StoreOverrideBlocked {
                    path: self.path().to_string(),
                });
            }
            trace!(path = self.path(), "using store override");
            return Ok(store.clone());
        }
        if let Some(store) = &self.store {
            return Ok(store.clone());
        }
        config::default_store().ok_or(ModelError::NoStoreConfigured)
    }

    /// An independent copy of this subtree pinned at the path resolved with
    /// `vars`, bound with `binding`.
    pub fn clone_with(&self, vars: &[&str], binding: &Binding) -> Result<Node> {
        apply::clone_node(self, vars, binding)
    }

    /// Convert model-shaped data to storage shape.
    pub fn to_storage(&self, data: &Value) -> Value {
        convert::to_storage(self, data)
    }

    /// Convert storage-shaped data to model shape, keeping unmodeled entries.
    pub fn from_storage(&self, data: &Value) -> Value {
        convert::from_storage(self, data, true)
    }

    /// Convert storage-shaped data to model shape.
    pub fn from_storage_with(&self, data: &Value, include_unmodeled: bool) -> Value {
        convert::from_storage(self, data, include_unmodeled)
    }

    /// Model-aware store access at the path resolved with `vars`.
    pub fn at<'a>(&'a self, vars: &'a [&'a str]) -> Access<'a> {
        Access::new(self, vars)
    }
}

impl Shape for Node {
    fn key(&self) -> &str {
        Node::key(self)
    }

    fn children(&self) -> &Children<Self> {
        Node::children(self)
    }
}

/// The bound root of a model tree.
///
/// Dereferences to its [`Node`]. Only the root exposes the store's
/// connection-state and clock-offset addresses.
#[derive(Debug, Clone)]
pub struct Root {
    node: Node,
}

impl Root {
    /// Build the root schema from `children` and bind the whole tree.
    pub fn new<I, F>(children: I, binding: Binding) -> Result<Self>
    where
        I: IntoIterator<Item = (F, Schema)>,
        F: Into<String>,
    {
        Ok(Self::from_schema(&Schema::root(children)?, binding))
    }

    /// Bind an existing schema as the root.
    pub fn from_schema(schema: &Schema, binding: Binding) -> Self {
        Self {
            node: Node::bind(schema, None, &binding),
        }
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    /// Follow the store's connection state.
    pub fn on_connected(
        &self,
        callback: impl Fn(bool) + Send + Sync + 'static,
        store: Option<&Arc<dyn Store>>,
    ) -> Result<Subscription> {
        let reference = Reference::new(self.node.select_store(store)?, CONNECTED_PATH);
        Ok(reference.on_value(move |v| callback(v.and_then(Value::as_bool).unwrap_or(false)))?)
    }

    /// Follow the estimated offset between local and server clocks, in ms.
    pub fn on_server_time_offset(
        &self,
        callback: impl Fn(f64) + Send + Sync + 'static,
        store: Option<&Arc<dyn Store>>,
    ) -> Result<Subscription> {
        let reference = Reference::new(self.node.select_store(store)?, SERVER_TIME_OFFSET_PATH);
        Ok(reference.on_value(move |v| callback(v.and_then(Value::as_f64).unwrap_or(0.0)))?)
    }
}

impl Deref for Root {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}
