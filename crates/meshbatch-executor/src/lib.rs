//! Batches entities into groups, dispatches them against a connection pool at the
//! concurrency its rate controller currently permits, and retries throttled or transient
//! batches (spec §4.F).
//!
//! # Example
//!
//! ```rust,no_run
//! use meshbatch_executor::{BulkExecutor, ExecuteOptions, Operation};
//! use meshbatch_retry::ExponentialBackoff;
//! use meshbatch_pool::ConnectionPool;
//! use std::sync::Arc;
//!
//! # async fn example(pool: Arc<ConnectionPool>, entities: Vec<String>) {
//! let executor = BulkExecutor::new("accounts", pool, ExponentialBackoff::new(Default::default()));
//! let result = executor
//!     .execute(entities, Operation::Upsert, ExecuteOptions::default(), |item: &String, op| {
//!         meshbatch_core::client::BackendRequest {
//!             operation: format!("{op:?}"),
//!             payload: item.clone().into_bytes(),
//!         }
//!     })
//!     .await;
//! println!("{} succeeded, {} failed", result.success_count, result.failure_count);
//! # }
//! ```

pub mod bulk;
pub mod events;
pub mod result;

pub use bulk::{BulkExecutor, ExecuteOptions, RequestBuilder};
pub use events::ExecutorEvent;
pub use result::{BulkResult, Operation, RecordError};
