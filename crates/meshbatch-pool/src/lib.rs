//! Holds a set of authenticated backend clients for one (identity-set, endpoint), selecting
//! among them on checkout and delegating sustained-load decisions to the rate controller
//! (spec §4.C).
//!
//! # Example
//!
//! ```rust,no_run
//! use meshbatch_pool::{BatchOutcome, ConnectionPool, PoolConfig};
//! use meshbatch_core::client::BackendClient;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(clients: Vec<(String, Arc<dyn BackendClient>)>) {
//! let pool = ConnectionPool::new(
//!     PoolConfig::builder().hard_ceiling_per_identity(20).build(),
//!     clients,
//! );
//!
//! let handle = pool.checkout().await.unwrap();
//! // ... use handle.client() to issue one batch ...
//! pool.release(handle, BatchOutcome::Success { duration: Duration::from_millis(120) });
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod pool;

pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::PoolError;
pub use events::PoolEvent;
pub use pool::{BatchOutcome, ConnectionPool, PoolHandle};
