//! Schema types.
//!
//! A [`Schema`] is the immutable shape of one path segment and everything
//! below it: the storage key and the modeled children. The children are
//! resolved once, at construction, into either an ordered list of fixed
//! fields or a single variable item (a dynamic collection).
//!
//! Schemas carry no path and no store. Binding a schema produces a
//! [`Node`](crate::node::Node).

use std::collections::HashSet;

use crate::error::{ModelError, Result};
use crate::path::{segment_is_valid, VAR_KEY};

/// The modeled children of a schema or a bound node.
#[derive(Debug, Clone, PartialEq)]
pub enum Children<T> {
    /// Statically known children, in declaration order. Empty for leaves.
    Fixed(Vec<(String, T)>),
    /// A single variable child: every storage key below this node is a
    /// caller-chosen identifier sharing the `item` shape.
    Collection { field: String, item: Box<T> },
}

impl<T> Children<T> {
    /// Iterate `(field name, child)` pairs, including the variable child.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        let (fixed, item): (&[(String, T)], Option<(&str, &T)>) = match self {
            Children::Fixed(fields) => (fields.as_slice(), None),
            Children::Collection { field, item } => (&[], Some((field.as_str(), item.as_ref()))),
        };
        fixed
            .iter()
            .map(|(name, child)| (name.as_str(), child))
            .chain(item)
    }

    /// Look up a child by field name.
    pub fn get(&self, field: &str) -> Option<&T> {
        self.iter()
            .find(|(name, _)| *name == field)
            .map(|(_, child)| child)
    }

    /// The variable child, if this is a collection.
    pub fn variable(&self) -> Option<&T> {
        match self {
            Children::Collection { item, .. } => Some(item.as_ref()),
            Children::Fixed(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Children::Fixed(fields) => fields.len(),
            Children::Collection { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut T> {
        let (fixed, item): (&mut [(String, T)], Option<&mut T>) = match self {
            Children::Fixed(fields) => (fields.as_mut_slice(), None),
            Children::Collection { item, .. } => (&mut [], Some(item.as_mut())),
        };
        fixed.iter_mut().map(|(_, child)| child).chain(item)
    }

    pub(crate) fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Children<U> {
        match self {
            Children::Fixed(fields) => Children::Fixed(
                fields
                    .iter()
                    .map(|(name, child)| (name.clone(), f(child)))
                    .collect(),
            ),
            Children::Collection { field, item } => Children::Collection {
                field: field.clone(),
                item: Box::new(f(item)),
            },
        }
    }
}

impl<T> Default for Children<T> {
    fn default() -> Self {
        Children::Fixed(Vec::new())
    }
}

/// Anything with a storage key and modeled children.
///
/// Implemented by [`Schema`] and [`Node`](crate::node::Node) so that data
/// conversion works on either.
pub trait Shape: Sized {
    /// The storage-level segment name. `"$"` for variable nodes.
    fn key(&self) -> &str;

    /// The modeled children.
    fn children(&self) -> &Children<Self>;

    /// True if the key is supplied at call time.
    fn is_var(&self) -> bool {
        self.key() == VAR_KEY
    }

    /// Find the fixed child stored under `storage_key`, with its field name.
    fn child_by_key(&self, storage_key: &str) -> Option<(&str, &Self)> {
        match self.children() {
            Children::Fixed(fields) => fields
                .iter()
                .find(|(_, child)| child.key() == storage_key)
                .map(|(name, child)| (name.as_str(), child)),
            Children::Collection { .. } => None,
        }
    }
}

/// The immutable shape of a model tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    key: String,
    children: Children<Schema>,
}

impl Schema {
    /// A node without modeled children.
    pub fn leaf(key: &str) -> Result<Self> {
        Self::node(key, Vec::<(String, Schema)>::new())
    }

    /// A node with the given `(field name, child)` pairs.
    ///
    /// `key` must be a valid segment or `"$"`.
    pub fn node<I, F>(key: &str, children: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, Schema)>,
        F: Into<String>,
    {
        if key != VAR_KEY && !segment_is_valid(key) {
            return Err(ModelError::InvalidKey {
                key: key.to_string(),
            });
        }
        Self::build(key, children)
    }

    /// A variable node with the given children.
    pub fn var<I, F>(children: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, Schema)>,
        F: Into<String>,
    {
        Self::build(VAR_KEY, children)
    }

    /// A variable node without modeled children.
    pub fn var_leaf() -> Self {
        Self {
            key: VAR_KEY.to_string(),
            children: Children::default(),
        }
    }

    /// The root shape: an empty key, so children paths start at the top.
    pub fn root<I, F>(children: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, Schema)>,
        F: Into<String>,
    {
        Self::build("", children)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn children(&self) -> &Children<Schema> {
        &self.children
    }

    fn build<I, F>(key: &str, children: I) -> Result<Self>
    where
        I: IntoIterator<Item = (F, Schema)>,
        F: Into<String>,
    {
        let ambiguity = |reason: String| ModelError::SchemaAmbiguity {
            key: key.to_string(),
            reason,
        };

        let mut fixed: Vec<(String, Schema)> = Vec::new();
        let mut variables: Vec<(String, Schema)> = Vec::new();
        let mut field_names = HashSet::new();

        for (field, child) in children {
            let field = field.into();
            if !field_names.insert(field.clone()) {
                return Err(ambiguity(format!("duplicate field {field:?}")));
            }
            if child.is_var() {
                variables.push((field, child));
            } else {
                fixed.push((field, child));
            }
        }

        let children = match variables.len() {
            0 => {
                let mut storage_keys = HashSet::new();
                for (field, child) in &fixed {
                    if !storage_keys.insert(child.key.as_str()) {
                        return Err(ambiguity(format!(
                            "field {field:?} reuses storage key {:?}",
                            child.key
                        )));
                    }
                }
                Children::Fixed(fixed)
            }
            1 if fixed.is_empty() => {
                let (field, item) = variables.remove(0);
                Children::Collection {
                    field,
                    item: Box::new(item),
                }
            }
            1 => {
                let names: Vec<&str> = fixed.iter().map(|(name, _)| name.as_str()).collect();
                return Err(ambiguity(format!(
                    "variable child {:?} has fixed siblings {names:?}",
                    variables[0].0
                )));
            }
            _ => {
                let names: Vec<&str> = variables.iter().map(|(name, _)| name.as_str()).collect();
                return Err(ambiguity(format!("more than one variable child: {names:?}")));
            }
        };

        Ok(Self {
            key: key.to_string(),
            children,
        })
    }
}

impl Shape for Schema {
    fn key(&self) -> &str {
        Schema::key(self)
    }

    fn children(&self) -> &Children<Self> {
        Schema::children(self)
    }
}
