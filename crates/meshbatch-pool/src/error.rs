//! Error types for [`crate::pool::ConnectionPool`].

/// Errors a checkout can surface.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// The pool was disposed while a caller was waiting for a client.
    #[error("pool was disposed")]
    Disposed,
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
