//! Store configuration.
//!
//! A node finds its store in this order:
//! 1. a per-call override (refused if the node's store is blocked),
//! 2. the store bound to the node by its root or by a clone,
//! 3. the process-wide default store set with [`set_default_store`].
//!
//! The default store is written rarely (usually once at startup) and read on
//! every reference resolution.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::store::Store;

static DEFAULT_STORE: RwLock<Option<Arc<dyn Store>>> = RwLock::new(None);

/// Set the store used by nodes that have no store of their own.
pub fn set_default_store(store: Arc<dyn Store>) {
    debug!(?store, "default store set");
    *DEFAULT_STORE.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
}

/// Forget the default store.
pub fn clear_default_store() {
    debug!("default store cleared");
    *DEFAULT_STORE.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// The current default store, if any.
pub fn default_store() -> Option<Arc<dyn Store>> {
    DEFAULT_STORE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Store binding applied to a root or a clone and inherited by every
/// descendant.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    /// Store bound to the subtree.
    pub store: Option<Arc<dyn Store>>,
    /// Refuse per-call store overrides on the subtree.
    pub store_blocked: bool,
}

impl Binding {
    /// No store and no blocking: nodes fall back to the default store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn blocked(mut self) -> Self {
        self.store_blocked = true;
        self
    }
}
