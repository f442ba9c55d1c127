//! Error types for model and store operations.

use thiserror::Error;

/// Errors raised by the model tree: path resolution, construction and
/// store selection.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A substitution value for a `$` placeholder is missing or is not a
    /// valid path segment. `index` is 1-based.
    #[error("vars[{index}] not set or has an invalid value: value={value:?}, path={template:?}")]
    InvalidSegment {
        index: usize,
        value: Option<String>,
        template: String,
    },

    /// A relative path was requested between nodes that are not in an
    /// ancestor/descendant relation.
    #[error("path {target:?} is not below {parent:?}")]
    PathMismatch { parent: String, target: String },

    /// No store override, no bound store and no default store.
    #[error("no store configured; set a default store or bind one to the root")]
    NoStoreConfigured,

    /// A per-call store was passed to a node whose store is blocked.
    #[error("a store override was passed but the store is blocked for {path:?}")]
    StoreOverrideBlocked { path: String },

    /// The schema shape cannot be resolved unambiguously.
    #[error("ambiguous schema at key {key:?}: {reason}")]
    SchemaAmbiguity { key: String, reason: String },

    /// A node key is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid node key {key:?}")]
    InvalidKey { key: String },

    /// The underlying store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ModelError {
    /// True for the two ways store selection can fail.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ModelError::NoStoreConfigured | ModelError::StoreOverrideBlocked { .. }
        )
    }
}

/// Errors raised by [`Store`](crate::store::Store) implementations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The path is managed by the store itself (e.g. `.info/connected`).
    #[error("path is read-only: {path}")]
    ReadOnlyPath { path: String },

    /// `update` was called with something other than an object.
    #[error("update value at {path} must be an object")]
    InvalidUpdate { path: String },

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
