//! Model-aware store access.
//!
//! [`Access`] pairs a node with the variables that address one concrete
//! location, and converts data on the way in and out. Every call resolves
//! its reference afresh and never mutates the node.

use std::sync::Arc;

use serde_json::Value;

use crate::convert;
use crate::error::Result;
use crate::node::Node;
use crate::store::{Reference, Store, Subscription, TransactionOutcome};

/// Reads and writes model-shaped data at one node location.
#[derive(Debug, Clone)]
pub struct Access<'a> {
    node: &'a Node,
    vars: &'a [&'a str],
    store: Option<&'a Arc<dyn Store>>,
}

impl<'a> Access<'a> {
    pub(crate) fn new(node: &'a Node, vars: &'a [&'a str]) -> Self {
        Self {
            node,
            vars,
            store: None,
        }
    }

    /// Use `store` instead of the bound or default store.
    ///
    /// Operations fail if the node's store is blocked.
    pub fn with_store(mut self, store: &'a Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn reference(&self) -> Result<Reference> {
        self.node.reference(self.vars, self.store)
    }

    /// The stored value in model shape, unmodeled entries included.
    pub fn get(&self) -> Result<Option<Value>> {
        Ok(self
            .reference()?
            .get()?
            .map(|data| self.node.from_storage(&data)))
    }

    /// The stored value in model shape, without unmodeled entries.
    pub fn get_modeled(&self) -> Result<Option<Value>> {
        Ok(self
            .reference()?
            .get()?
            .map(|data| self.node.from_storage_with(&data, false)))
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.reference()?.exists()?)
    }

    pub fn set(&self, value: &Value) -> Result<()> {
        Ok(self.reference()?.set(self.node.to_storage(value))?)
    }

    pub fn update(&self, value: &Value) -> Result<()> {
        Ok(self.reference()?.update(self.node.to_storage(value))?)
    }

    pub fn remove(&self) -> Result<()> {
        Ok(self.reference()?.remove()?)
    }

    /// Add a child under a generated key.
    ///
    /// On a dynamic-collection node `value` is one item of the collection.
    /// Without a value nothing is written and the new location is returned.
    pub fn push(&self, value: Option<&Value>) -> Result<Reference> {
        let reference = self.reference()?;
        let data = value.map(|value| match self.node.var_child() {
            Some(item) => item.to_storage(value),
            None => self.node.to_storage(value),
        });
        Ok(reference.push(data)?)
    }

    /// Replace the value with `update(current)`, both in model shape.
    ///
    /// `update` returning `None` aborts the transaction.
    pub fn transaction(
        &self,
        mut update: impl FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<TransactionOutcome> {
        let node = self.node;
        let outcome = self.reference()?.transaction(|current| {
            let current = current.map(|data| node.from_storage(&data));
            update(current).map(|value| node.to_storage(&value))
        })?;

        Ok(TransactionOutcome {
            committed: outcome.committed,
            snapshot: outcome.snapshot.map(|data| node.from_storage(&data)),
        })
    }

    /// Subscribe to the value in model shape.
    pub fn on_value(
        &self,
        callback: impl Fn(Option<Value>) + Send + Sync + 'static,
    ) -> Result<Subscription> {
        let node = self.node.clone();
        let reference = self.reference()?;
        Ok(reference.on_value(move |data| callback(data.map(|d| convert::from_storage(&node, d, true))))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Binding;
    use crate::error::ModelError;
    use crate::model::Schema;
    use crate::node::Root;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;

    fn root(store: &Arc<MemoryStore>) -> Root {
        Root::new(
            [(
                "logs",
                Schema::node(
                    "l",
                    [(
                        "$logId",
                        Schema::var([
                            ("count", Schema::leaf("c").unwrap()),
                            ("label", Schema::leaf("lb").unwrap()),
                        ])
                        .unwrap(),
                    )],
                )
                .unwrap(),
            )],
            Binding::new().store(store.clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_set_and_get() {
        let store = Arc::new(MemoryStore::new());
        let root = root(&store);
        let log = root.child("logs").unwrap().var_child().unwrap();

        log.at(&["a1"]).set(&json!({"count": 5, "note": "x"})).unwrap();

        assert_eq!(store.get("l/a1").unwrap(), Some(json!({"c": 5, "note": "x"})));
        assert_eq!(log.at(&["a1"]).get().unwrap(), Some(json!({"count": 5, "note": "x"})));
        assert_eq!(log.at(&["a1"]).get_modeled().unwrap(), Some(json!({"count": 5})));
        assert!(log.at(&["a1"]).exists().unwrap());
        assert!(!log.at(&["a2"]).exists().unwrap());
    }

    #[test]
    fn test_collection_get() {
        let store = Arc::new(MemoryStore::from_value(json!({
            "l": {"a1": {"c": 1}, "a2": {"c": 2, "lb": "two"}}
        })));
        let root = root(&store);

        let logs = root.child("logs").unwrap().at(&[]).get().unwrap();
        assert_eq!(
            logs,
            Some(json!({"a1": {"count": 1}, "a2": {"count": 2, "label": "two"}}))
        );
    }

    #[test]
    fn test_array_collection_items() {
        let store = Arc::new(MemoryStore::new());
        let root = root(&store);
        let logs = root.child("logs").unwrap();
        let item = logs.var_child().unwrap();

        logs.at(&[]).set(&json!([{"count": 1}, {"count": 2}])).unwrap();
        assert_eq!(item.at(&["1"]).get().unwrap(), Some(json!({"count": 2})));

        item.at(&["1"]).set(&json!({"count": 9})).unwrap();
        assert_eq!(
            store.snapshot().unwrap(),
            json!({"l": {"0": {"c": 1}, "1": {"c": 9}}})
        );
        assert_eq!(
            logs.at(&[]).get().unwrap(),
            Some(json!({"0": {"count": 1}, "1": {"count": 9}}))
        );
    }

    #[test]
    fn test_update_and_remove() {
        let store = Arc::new(MemoryStore::from_value(json!({"l": {"a1": {"c": 1, "lb": "one"}}})));
        let root = root(&store);
        let log = root.child("logs").unwrap().var_child().unwrap();

        log.at(&["a1"]).update(&json!({"count": 2})).unwrap();
        assert_eq!(store.get("l/a1").unwrap(), Some(json!({"c": 2, "lb": "one"})));

        log.at(&["a1"]).remove().unwrap();
        assert_eq!(store.snapshot().unwrap(), Value::Null);
    }

    #[test]
    fn test_push_into_collection() {
        let store = Arc::new(MemoryStore::new());
        let root = root(&store);
        let logs = root.child("logs").unwrap();

        let pushed = logs.at(&[]).push(Some(&json!({"count": 1}))).unwrap();
        let id = pushed.key().unwrap().to_string();

        assert_eq!(store.get(&format!("l/{id}")).unwrap(), Some(json!({"c": 1})));

        let empty = logs.at(&[]).push(None).unwrap();
        assert!(!empty.exists().unwrap());
    }

    #[test]
    fn test_transaction() {
        let store = Arc::new(MemoryStore::from_value(json!({"l": {"a1": {"c": 1}}})));
        let root = root(&store);
        let log = root.child("logs").unwrap().var_child().unwrap();

        let outcome = log
            .at(&["a1"])
            .transaction(|current| {
                let count = current?.get("count")?.as_i64()?;
                Some(json!({"count": count + 1}))
            })
            .unwrap();

        assert!(outcome.committed);
        assert_eq!(outcome.snapshot, Some(json!({"count": 2})));
        assert_eq!(store.get("l/a1/c").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_on_value() {
        let store = Arc::new(MemoryStore::new());
        let root = root(&store);
        let log = root.child("logs").unwrap().var_child().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let sub = log
            .at(&["a1"])
            .on_value(move |v| sink.lock().unwrap().push(v))
            .unwrap();
        store.set("l/a1/c", json!(3)).unwrap();
        sub.off();

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(json!({"count": 3}))]);
    }

    #[test]
    fn test_store_override() {
        let bound = Arc::new(MemoryStore::new());
        let other: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let root = root(&bound);
        let logs = root.child("logs").unwrap();

        logs.at(&[]).with_store(&other).set(&json!({"a1": {"count": 1}})).unwrap();
        assert_eq!(other.get("l").unwrap(), Some(json!({"a1": {"c": 1}})));
        assert_eq!(bound.get("l").unwrap(), None);

        let blocked = logs.clone_with(&[], &Binding::new().blocked()).unwrap();
        let err = blocked.at(&[]).with_store(&other).get().unwrap_err();
        assert!(matches!(err, ModelError::StoreOverrideBlocked { .. }));
    }
}
