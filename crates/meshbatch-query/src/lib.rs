//! Lazy, cancellable query plan execution (spec §3-§4).
//!
//! A query plan is a tree of [`PlanNode`]s. Scans sit at the leaves, transforms and the
//! script node compose them, and nothing touches the backend until a consumer polls the row
//! stream returned by [`PlanNode::execute`].
//!
//! ```no_run
//! use meshbatch_query::context::QueryPlanContext;
//! use meshbatch_query::plan::PlanNode;
//! use meshbatch_query::scan::RemoteScan;
//! use meshbatch_pool::ConnectionPool;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # async fn run(pool: Arc<ConnectionPool>) {
//! let ctx = QueryPlanContext::new(pool);
//! let scan = RemoteScan::new("SELECT id, name FROM account", None);
//! let mut rows = scan.execute(&ctx);
//! while let Some(row) = rows.next().await {
//!     let row = row.expect("row stream failed");
//!     println!("{}", row.get("name").unwrap());
//! }
//! # }
//! ```

pub mod cancellation;
pub mod context;
pub mod events;
pub mod expr;
pub mod metadata;
pub mod plan;
pub mod scan;
pub mod script;
#[cfg(test)]
mod test_support;
pub mod transform;
pub mod variables;

pub use cancellation::CancellationSignal;
pub use context::{ExecutionStats, QueryPlanContext};
pub use events::QueryEvent;
pub use plan::{PlanNode, RowStream};
pub use variables::VariableScope;
