//! Store abstraction and in-memory implementation.
//!
//! The model tree never persists anything itself. It resolves a path, picks a
//! [`Store`], and hands out a [`Reference`]: the address of one location in
//! that store. All reads, writes and subscriptions go through the store.
//!
//! [`MemoryStore`] keeps the whole tree as one nested JSON value and follows
//! realtime-tree semantics: `null` and empty objects are never stored, arrays
//! are kept as objects keyed by index, and listeners are notified after every
//! write that touches their path.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::path::SEPARATOR;

/// Path of the connection-state flag.
pub const CONNECTED_PATH: &str = ".info/connected";

/// Path of the estimated offset between local and server clocks, in ms.
pub const SERVER_TIME_OFFSET_PATH: &str = ".info/serverTimeOffset";

const INFO_SEGMENT: &str = ".info";

/// Optimistic transactions give up after this many conflicting writes.
const MAX_TRANSACTION_ATTEMPTS: usize = 25;

/// Callback invoked with the current value at a subscribed path.
pub type Listener = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Result of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// False if the update function aborted or the retries ran out.
    pub committed: bool,
    /// The value at the path after the transaction.
    pub snapshot: Option<Value>,
}

/// Trait for path-addressed store implementations.
///
/// Paths are `/`-separated; the empty path is the root.
pub trait Store: Send + Sync + fmt::Debug {
    /// Get the value at a path, or `None` if nothing is stored there.
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value at a path. `null` removes it.
    fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Write each entry of an object below a path, leaving other children alone.
    fn update(&self, path: &str, values: Value) -> Result<(), StoreError>;

    /// Remove the value at a path.
    fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.set(path, Value::Null)
    }

    /// Atomically replace the value at a path with `update(current)`.
    ///
    /// `update` returning `None` aborts. It may run more than once.
    fn transaction(
        &self,
        path: &str,
        update: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<TransactionOutcome, StoreError>;

    /// Register a listener for a path. It is called once with the current
    /// value and again after every change at or below the path.
    fn subscribe(&self, path: &str, listener: Listener) -> Result<SubscriptionId, StoreError>;

    /// Remove a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Generate a new unique child key, ordered by creation time.
    fn push_key(&self) -> String {
        uuid::Uuid::now_v7().simple().to_string()
    }
}

/// The address of one location in a store.
#[derive(Debug, Clone)]
pub struct Reference {
    store: Arc<dyn Store>,
    path: String,
}

impl Reference {
    pub fn new(store: Arc<dyn Store>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The last segment of the path, if any.
    pub fn key(&self) -> Option<&str> {
        self.path.rsplit(SEPARATOR).find(|s| !s.is_empty())
    }

    /// A reference to a child location.
    pub fn child(&self, segment: &str) -> Reference {
        Reference::new(self.store.clone(), join(&self.path, segment))
    }

    pub fn get(&self) -> Result<Option<Value>, StoreError> {
        self.store.get(&self.path)
    }

    pub fn exists(&self) -> Result<bool, StoreError> {
        Ok(self.get()?.is_some())
    }

    pub fn set(&self, value: Value) -> Result<(), StoreError> {
        self.store.set(&self.path, value)
    }

    pub fn update(&self, values: Value) -> Result<(), StoreError> {
        self.store.update(&self.path, values)
    }

    pub fn remove(&self) -> Result<(), StoreError> {
        self.store.remove(&self.path)
    }

    /// Create a child under a generated key, writing `value` if given.
    pub fn push(&self, value: Option<Value>) -> Result<Reference, StoreError> {
        let child = self.child(&self.store.push_key());
        if let Some(value) = value {
            child.set(value)?;
        }
        Ok(child)
    }

    pub fn transaction(
        &self,
        mut update: impl FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<TransactionOutcome, StoreError> {
        self.store.transaction(&self.path, &mut update)
    }

    /// Subscribe to the value at this location.
    pub fn on_value(
        &self,
        callback: impl Fn(Option<&Value>) + Send + Sync + 'static,
    ) -> Result<Subscription, StoreError> {
        let id = self.store.subscribe(&self.path, Arc::new(callback))?;
        Ok(Subscription {
            reference: self.clone(),
            id,
        })
    }
}

/// A registered listener.
///
/// The listener stays registered until the subscription is dropped or
/// [`off`](Self::off) is called.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    reference: Reference,
    id: SubscriptionId,
}

impl Subscription {
    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn off(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.reference.store.unsubscribe(self.id);
    }
}

/// Join a path and a (possibly multi-segment) child path.
fn join(base: &str, child: &str) -> String {
    let child = child.trim_start_matches(SEPARATOR);
    if base.is_empty() || base == "/" {
        child.to_string()
    } else {
        format!("{}{}{}", base.trim_end_matches(SEPARATOR), SEPARATOR, child)
    }
}

fn split(path: &str) -> Vec<String> {
    path.split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_info(segments: &[String]) -> bool {
    segments.first().map(String::as_str) == Some(INFO_SEGMENT)
}

/// True if one path is an ancestor of (or equal to) the other.
///
/// `.info` paths live outside the data tree and only relate to each other.
fn related(a: &[String], b: &[String]) -> bool {
    is_info(a) == is_info(b) && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// Drop nulls and empty objects, and store arrays as objects keyed by
/// index. `None` means "nothing to store".
fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Array(items) => normalize(Value::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
        )),
        other => Some(other),
    }
}

fn get_path_value<'a>(current: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = current;
    for segment in segments {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    (!current.is_null()).then_some(current)
}

/// Set a value at a path, creating (or replacing scalars with) intermediate
/// objects as needed.
fn set_path_value(current: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *current = value;
        return;
    };
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_path_value(child, rest, value);
    }
}

/// Remove the value at a path and prune parents left empty.
fn remove_path_value(current: &mut Value, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        *current = Value::Null;
        return;
    };
    if let Value::Object(map) = current {
        if rest.is_empty() {
            map.remove(first);
        } else if let Some(child) = map.get_mut(first) {
            remove_path_value(child, rest);
            if child.is_null() {
                map.remove(first);
            }
        }
        if map.is_empty() {
            *current = Value::Null;
        }
    }
}

/// Count leaf values in a tree.
fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        Value::Null => 0,
        _ => 1,
    }
}

struct Registration {
    id: SubscriptionId,
    segments: Vec<String>,
    listener: Listener,
}

struct State {
    /// The stored tree. `Null` when empty.
    data: Value,
    /// Store-managed values under `.info`
    info: Value,
    listeners: Vec<Registration>,
    next_id: u64,
}

impl State {
    fn read(&self, segments: &[String]) -> Option<&Value> {
        match segments.split_first() {
            Some((first, rest)) if first == INFO_SEGMENT => get_path_value(&self.info, rest),
            _ => get_path_value(&self.data, segments),
        }
    }

    fn write(&mut self, segments: &[String], value: Value) {
        match normalize(value) {
            Some(value) => set_path_value(&mut self.data, segments, value),
            None => remove_path_value(&mut self.data, segments),
        }
    }

    /// Listeners affected by writes at `touched`, with their new values.
    fn notifications(&self, touched: &[Vec<String>]) -> Vec<(Listener, Option<Value>)> {
        let mut seen = HashSet::new();
        self.listeners
            .iter()
            .filter(|reg| touched.iter().any(|t| related(&reg.segments, t)))
            .filter(|reg| seen.insert(reg.id))
            .map(|reg| (reg.listener.clone(), self.read(&reg.segments).cloned()))
            .collect()
    }
}

fn dispatch(notifications: Vec<(Listener, Option<Value>)>) {
    trace!(count = notifications.len(), "dispatching listeners");
    for (listener, value) in notifications {
        listener(value.as_ref());
    }
}

fn ensure_writable(path: &str, segments: &[String]) -> Result<(), StoreError> {
    if is_info(segments) {
        return Err(StoreError::ReadOnlyPath {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Reject a root write whose value would shadow `.info`.
fn ensure_value_writable(segments: &[String], value: &Value) -> Result<(), StoreError> {
    match value {
        Value::Object(map) if segments.is_empty() && map.contains_key(INFO_SEGMENT) => {
            Err(StoreError::ReadOnlyPath {
                path: INFO_SEGMENT.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// In-memory store implementation.
///
/// Stores the full tree as a nested JSON structure behind a lock. Listeners
/// run after the lock is released, so they may call back into the store.
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new empty store, reporting itself as connected.
    pub fn new() -> Self {
        Self::from_value(Value::Null)
    }

    /// Create a store seeded with `data` (storage-shaped).
    pub fn from_value(data: Value) -> Self {
        let info = serde_json::json!({
            "connected": true,
            "serverTimeOffset": 0
        });

        Self {
            state: RwLock::new(State {
                data: normalize(data).unwrap_or(Value::Null),
                info,
                listeners: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// A copy of the whole stored tree.
    pub fn snapshot(&self) -> Result<Value, StoreError> {
        Ok(self.read_state()?.data.clone())
    }

    /// Number of leaf values in the store.
    pub fn leaf_count(&self) -> Result<usize, StoreError> {
        Ok(count_leaves(&self.read_state()?.data))
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> Result<usize, StoreError> {
        Ok(self.read_state()?.listeners.len())
    }

    /// Change the reported connection state.
    pub fn set_connected(&self, connected: bool) -> Result<(), StoreError> {
        self.set_info("connected", Value::Bool(connected))
    }

    /// Change the reported server clock offset, in milliseconds.
    pub fn set_server_time_offset(&self, offset_ms: f64) -> Result<(), StoreError> {
        self.set_info("serverTimeOffset", serde_json::json!(offset_ms))
    }

    fn set_info(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let notifications = {
            let mut state = self.write_state()?;
            if let Value::Object(info) = &mut state.info {
                info.insert(key.to_string(), value);
            }
            state.notifications(&[vec![INFO_SEGMENT.to_string(), key.to_string()]])
        };
        debug!(key, "info value changed");
        dispatch(notifications);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("MemoryStore");
        match self.state.read() {
            Ok(state) => s
                .field("leaves", &count_leaves(&state.data))
                .field("listeners", &state.listeners.len()),
            Err(_) => s.field("poisoned", &true),
        };
        s.finish()
    }
}

impl Store for MemoryStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let state = self.read_state()?;
        Ok(state.read(&split(path)).cloned())
    }

    fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split(path);
        ensure_writable(path, &segments)?;
        ensure_value_writable(&segments, &value)?;

        let notifications = {
            let mut state = self.write_state()?;
            state.write(&segments, value);
            state.notifications(&[segments])
        };
        debug!(path, "set");
        dispatch(notifications);
        Ok(())
    }

    fn update(&self, path: &str, values: Value) -> Result<(), StoreError> {
        let segments = split(path);
        ensure_writable(path, &segments)?;
        let Value::Object(values) = values else {
            return Err(StoreError::InvalidUpdate {
                path: path.to_string(),
            });
        };

        let writes = values
            .into_iter()
            .map(|(child, value)| {
                let child_path = join(path, &child);
                let child_segments = split(&child_path);
                ensure_writable(&child_path, &child_segments)?;
                ensure_value_writable(&child_segments, &value)?;
                Ok((child_segments, value))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let notifications = {
            let mut state = self.write_state()?;
            let mut touched = Vec::with_capacity(writes.len());
            for (child_segments, value) in writes {
                state.write(&child_segments, value);
                touched.push(child_segments);
            }
            state.notifications(&touched)
        };
        debug!(path, "update");
        dispatch(notifications);
        Ok(())
    }

    fn transaction(
        &self,
        path: &str,
        update: &mut dyn FnMut(Option<Value>) -> Option<Value>,
    ) -> Result<TransactionOutcome, StoreError> {
        let segments = split(path);
        ensure_writable(path, &segments)?;

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let current = self.get(path)?;
            let Some(next) = update(current.clone()) else {
                debug!(path, "transaction aborted");
                return Ok(TransactionOutcome {
                    committed: false,
                    snapshot: current,
                });
            };
            ensure_value_writable(&segments, &next)?;

            let (snapshot, notifications) = {
                let mut state = self.write_state()?;
                if state.read(&segments) != current.as_ref() {
                    trace!(path, attempt, "transaction conflict, retrying");
                    continue;
                }
                state.write(&segments, next);
                let snapshot = state.read(&segments).cloned();
                (snapshot, state.notifications(&[segments.clone()]))
            };
            debug!(path, attempt, "transaction committed");
            dispatch(notifications);
            return Ok(TransactionOutcome {
                committed: true,
                snapshot,
            });
        }

        warn!(path, "transaction gave up after {MAX_TRANSACTION_ATTEMPTS} attempts");
        Ok(TransactionOutcome {
            committed: false,
            snapshot: self.get(path)?,
        })
    }

    fn subscribe(&self, path: &str, listener: Listener) -> Result<SubscriptionId, StoreError> {
        let segments = split(path);
        let (id, current) = {
            let mut state = self.write_state()?;
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            let current = state.read(&segments).cloned();
            state.listeners.push(Registration {
                id,
                segments,
                listener: listener.clone(),
            });
            (id, current)
        };
        debug!(path, id = id.0, "subscribed");
        listener(current.as_ref());
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        match self.state.write() {
            Ok(mut state) => state.listeners.retain(|reg| reg.id != id),
            Err(_) => warn!(id = id.0, "cannot unsubscribe: store lock poisoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get("").unwrap(), None);
        assert_eq!(store.get("a/b").unwrap(), None);
        assert_eq!(store.leaf_count().unwrap(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let store = MemoryStore::new();
        store.set("users/u1/n", json!("Bob")).unwrap();

        assert_eq!(store.get("users/u1/n").unwrap(), Some(json!("Bob")));
        assert_eq!(store.get("users/u1").unwrap(), Some(json!({"n": "Bob"})));
        assert_eq!(store.get("/users/u1/n").unwrap(), Some(json!("Bob")));
        assert_eq!(store.snapshot().unwrap(), json!({"users": {"u1": {"n": "Bob"}}}));
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let store = MemoryStore::new();
        store.set("a", json!(1)).unwrap();
        store.set("a/b", json!(2)).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"b": 2})));
    }

    #[test]
    fn test_null_and_empty_remove() {
        let store = MemoryStore::from_value(json!({"a": {"b": 1, "c": 2}}));

        store.set("a/b", Value::Null).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"c": 2})));

        store.set("a/c", json!({})).unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.snapshot().unwrap(), Value::Null);
    }

    #[test]
    fn test_nested_nulls_dropped() {
        let store = MemoryStore::new();
        store.set("a", json!({"b": null, "c": {"d": null}, "e": 1})).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(json!({"e": 1})));
    }

    #[test]
    fn test_remove_prunes_parents() {
        let store = MemoryStore::from_value(json!({"a": {"b": {"c": 1}}, "x": 1}));
        store.remove("a/b/c").unwrap();
        assert_eq!(store.snapshot().unwrap(), json!({"x": 1}));
    }

    #[test]
    fn test_update_merges_children() {
        let store = MemoryStore::from_value(json!({"u": {"n": "Bob", "e": "bob@x"}}));
        store.update("u", json!({"n": "Rob", "p/q": 1})).unwrap();
        assert_eq!(
            store.get("u").unwrap(),
            Some(json!({"n": "Rob", "e": "bob@x", "p": {"q": 1}}))
        );
    }

    #[test]
    fn test_update_requires_object() {
        let store = MemoryStore::new();
        let err = store.update("u", json!(5)).unwrap_err();
        assert_eq!(err, StoreError::InvalidUpdate { path: "u".into() });
    }

    #[test]
    fn test_info_paths() {
        let store = MemoryStore::new();
        assert_eq!(store.get(CONNECTED_PATH).unwrap(), Some(json!(true)));
        assert_eq!(store.get(SERVER_TIME_OFFSET_PATH).unwrap(), Some(json!(0)));

        let err = store.set(CONNECTED_PATH, json!(false)).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnlyPath { .. }));

        store.set_connected(false).unwrap();
        assert_eq!(store.get(CONNECTED_PATH).unwrap(), Some(json!(false)));
    }

    #[test]
    fn test_arrays_stored_as_objects() {
        let store = MemoryStore::new();
        store.set("l", json!([{"c": 1}, null, {"c": 3}])).unwrap();
        assert_eq!(store.get("l").unwrap(), Some(json!({"0": {"c": 1}, "2": {"c": 3}})));
        assert_eq!(store.get("l/2/c").unwrap(), Some(json!(3)));

        store.set("l/2/c", json!(4)).unwrap();
        assert_eq!(store.get("l").unwrap(), Some(json!({"0": {"c": 1}, "2": {"c": 4}})));

        store.set("tags", json!([])).unwrap();
        assert_eq!(store.get("tags").unwrap(), None);
    }

    #[test]
    fn test_info_cannot_be_shadowed() {
        let store = MemoryStore::from_value(json!({"a": 1}));

        let err = store
            .update("", json!({".info/connected": false, "x": 1}))
            .unwrap_err();
        assert!(matches!(err, StoreError::ReadOnlyPath { .. }));

        let err = store.set("", json!({".info": {"connected": false}})).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnlyPath { .. }));

        assert_eq!(store.snapshot().unwrap(), json!({"a": 1}));
        assert_eq!(store.get(CONNECTED_PATH).unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_info_listeners_isolated_from_data() {
        let store = MemoryStore::new();
        let info_seen = Arc::new(Mutex::new(Vec::new()));
        let root_seen = Arc::new(Mutex::new(Vec::new()));

        let sink = info_seen.clone();
        let info = store
            .subscribe(
                CONNECTED_PATH,
                Arc::new(move |v: Option<&Value>| sink.lock().unwrap().push(v.cloned())),
            )
            .unwrap();
        let sink = root_seen.clone();
        let root = store
            .subscribe(
                "",
                Arc::new(move |v: Option<&Value>| sink.lock().unwrap().push(v.cloned())),
            )
            .unwrap();

        store.set("", json!({"a": 1})).unwrap();
        store.set_connected(false).unwrap();
        store.unsubscribe(info);
        store.unsubscribe(root);

        assert_eq!(*info_seen.lock().unwrap(), vec![Some(json!(true)), Some(json!(false))]);
        assert_eq!(*root_seen.lock().unwrap(), vec![None, Some(json!({"a": 1}))]);
    }

    #[test]
    fn test_dropped_subscription_unsubscribes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let count = Arc::new(Mutex::new(0));
        let reference = Reference::new(store.clone(), "a");

        let sink = count.clone();
        {
            let _sub = reference
                .on_value(move |_| *sink.lock().unwrap() += 1)
                .unwrap();
            store.set("a", json!(1)).unwrap();
        }
        store.set("a", json!(2)).unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn test_listeners() {
        let store = MemoryStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let id = store
            .subscribe(
                "users/u1",
                Arc::new(move |v: Option<&Value>| sink.lock().unwrap().push(v.cloned())),
            )
            .unwrap();

        store.set("users/u1/n", json!("Bob")).unwrap();
        store.set("users", json!({"u1": {"n": "Rob"}})).unwrap();
        store.set("other", json!(1)).unwrap();
        store.unsubscribe(id);
        store.set("users/u1/n", json!("Ann")).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some(json!({"n": "Bob"})), Some(json!({"n": "Rob"}))]
        );
        assert_eq!(store.listener_count().unwrap(), 0);
    }

    #[test]
    fn test_listener_may_reenter_store() {
        let store = Arc::new(MemoryStore::new());
        let inner = store.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        store
            .subscribe(
                "a",
                Arc::new(move |_: Option<&Value>| {
                    *sink.lock().unwrap() = inner.get("a").unwrap();
                }),
            )
            .unwrap();
        store.set("a", json!(7)).unwrap();

        assert_eq!(*seen.lock().unwrap(), Some(json!(7)));
    }

    #[test]
    fn test_transaction() {
        let store = MemoryStore::from_value(json!({"count": 1}));

        let outcome = store
            .transaction("count", &mut |v| {
                Some(json!(v.and_then(|v| v.as_i64()).unwrap_or(0) + 1))
            })
            .unwrap();
        assert!(outcome.committed);
        assert_eq!(outcome.snapshot, Some(json!(2)));

        let aborted = store.transaction("count", &mut |_| None).unwrap();
        assert!(!aborted.committed);
        assert_eq!(aborted.snapshot, Some(json!(2)));
    }

    #[test]
    fn test_reference_push() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let logs = Reference::new(store.clone(), "logs");

        let first = logs.push(Some(json!({"c": 1}))).unwrap();
        let second = logs.push(None).unwrap();

        assert!(crate::path::segment_is_valid(first.key().unwrap()));
        assert_ne!(first.key(), second.key());
        assert_eq!(first.path(), format!("logs/{}", first.key().unwrap()));
        assert_eq!(first.get().unwrap(), Some(json!({"c": 1})));
        assert!(!second.exists().unwrap());
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("/", "a"), "a");
        assert_eq!(join("a/b", "c/d"), "a/b/c/d");
        assert_eq!(join("a/", "/c"), "a/c");
    }
}
