//! Errors surfaced by [`crate::registry::CachedPoolRegistry`].

/// An error constructing or looking up a pool entry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// The pool constructor callback failed.
    #[error("pool construction failed: {0}")]
    ConstructionFailed(String),
    /// The leader constructing this entry was dropped before finishing; waiters should retry.
    #[error("pool construction was cancelled before completing")]
    ConstructionCancelled,
}
