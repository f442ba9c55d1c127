//! Conversion between model-shaped and storage-shaped data.
//!
//! Model-shaped data is keyed by field names (`{"name": "Bob"}`); storage
//! shaped data is keyed by each node's storage key (`{"n": "Bob"}`). Below a
//! dynamic-collection node the keys are caller-chosen identifiers and are
//! never remapped; each value is converted with the variable child's shape.
//!
//! Entries with no modeled counterpart pass through unchanged, except that
//! [`from_storage`] can drop them.

use serde_json::{Map, Value};

use crate::model::{Children, Shape};

/// Convert model-shaped `data` to storage shape.
pub fn to_storage<S: Shape>(node: &S, data: &Value) -> Value {
    match (data, node.children()) {
        (Value::Object(entries), Children::Collection { item, .. }) => Value::Object(
            entries
                .iter()
                .map(|(id, value)| (id.clone(), to_storage(item.as_ref(), value)))
                .collect(),
        ),
        (Value::Object(entries), Children::Fixed(_)) => {
            let mut converted = Map::with_capacity(entries.len());
            for (field, value) in entries {
                match node.children().get(field) {
                    Some(child) => {
                        converted.insert(child.key().to_string(), to_storage(child, value))
                    }
                    None => converted.insert(field.clone(), value.clone()),
                };
            }
            Value::Object(converted)
        }
        (Value::Array(items), Children::Collection { item, .. }) => Value::Array(
            items
                .iter()
                .map(|value| to_storage(item.as_ref(), value))
                .collect(),
        ),
        _ => data.clone(),
    }
}

/// Convert storage-shaped `data` to model shape.
///
/// Entries whose key matches no modeled child are copied as they are when
/// `include_unmodeled` is set, and dropped otherwise.
pub fn from_storage<S: Shape>(node: &S, data: &Value, include_unmodeled: bool) -> Value {
    match (data, node.children()) {
        (Value::Object(entries), Children::Collection { item, .. }) => Value::Object(
            entries
                .iter()
                .map(|(id, value)| {
                    (id.clone(), from_storage(item.as_ref(), value, include_unmodeled))
                })
                .collect(),
        ),
        (Value::Object(entries), Children::Fixed(_)) => {
            let mut converted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                match node.child_by_key(key) {
                    Some((field, child)) => {
                        converted.insert(
                            field.to_string(),
                            from_storage(child, value, include_unmodeled),
                        );
                    }
                    None if include_unmodeled => {
                        converted.insert(key.clone(), value.clone());
                    }
                    None => {}
                }
            }
            Value::Object(converted)
        }
        (Value::Array(items), Children::Collection { item, .. }) => Value::Array(
            items
                .iter()
                .map(|value| from_storage(item.as_ref(), value, include_unmodeled))
                .collect(),
        ),
        _ => data.clone(),
    }
}
