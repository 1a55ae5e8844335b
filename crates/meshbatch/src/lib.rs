//! Bulk operations, adaptive rate control, and query plan execution for backend mesh clients.
//!
//! `meshbatch` is a facade over a handful of independently usable subsystems. Each is its own
//! crate and its own feature here; enable what you need.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! meshbatch = { version = "0.1", features = ["executor", "query"] }
//! ```
//!
//! # Subsystems
//!
//! - **[Core]** - identity/pool-key model, the `BackendClient` trait, error taxonomy, events
//! - **[Rate Control]** - per-identity throttle tracking and AIMD-derived concurrency ceilings
//! - **[Pool]** - connection checkout across authenticated clients, LRU-with-tiebreak selection
//! - **[Registry]** - a cache of pools keyed by identity set, built at most once per key
//! - **[Retry]** - bounded exponential backoff for batch retry loops
//! - **[Executor]** - parallel bulk dispatch with per-batch retry against the rate controller
//! - **[Query]** - lazy, cancellable query plan execution: scans, merges, scripts
//!
//! [Core]: #core
//! [Rate Control]: #rate-control
//! [Pool]: #pool
//! [Registry]: #registry
//! [Retry]: #retry
//! [Executor]: #executor
//! [Query]: #query
//!
//! # Subsystem Guides
//!
//! ## Core
//!
//! Always available. Defines [`meshbatch_core::value::QueryRow`]/[`meshbatch_core::value::QueryValue`]
//! (the row/column model every other subsystem passes around), [`meshbatch_core::error::MeshError`]
//! (the closed error taxonomy every subsystem surfaces), and [`meshbatch_core::client::BackendClient`]
//! (the trait a caller implements once per backend transport).
//!
//! ### When to Use
//!
//! - Implementing a new `BackendClient` for a transport this crate doesn't already speak
//! - Matching on `MeshError` variants to decide what a caller should do next
//!
//! ## Rate Control
//!
//! Tracks which identities are currently throttled and derives a safe parallelism ceiling
//! from AIMD feedback on throttle rate, execution time, and request rate.
//!
//! ### When to Use
//!
//! - **Bulk operations against a rate-limited backend**: let the ceiling track the backend's
//!   real capacity instead of hardcoding a worker count
//! - **Multi-identity fan-out**: some identities may be cooling down while others aren't
//!
//! ### Trade-offs
//!
//! - **Convergence time**: AIMD needs several feedback cycles to find a stable ceiling
//! - **Shared state overhead**: one lock per identity's cooldown state
//!
//! ### Anti-Patterns
//!
//! ❌ **Ignoring `lastKnownGood`**: reverting to the additive-increase default after an idle
//! period throws away a ceiling the backend already proved it could sustain
//! ✅ Resume from `lastKnownGood` after idle-reset, not from the floor
//!
//! ## Pool
//!
//! Checks out a [`meshbatch_core::client::BackendClient`] from a set of authenticated
//! identities, feeding checkout outcomes back to rate control.
//!
//! ### Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "pool")]
//! # {
//! use meshbatch_pool::{ConnectionPool, PoolConfig};
//! use std::sync::Arc;
//!
//! # async fn example(client: Arc<dyn meshbatch_core::client::BackendClient>) {
//! let pool = ConnectionPool::new(PoolConfig::builder().build(), vec![("svc-a".to_string(), client)]);
//! let handle = pool.checkout().await.expect("at least one identity available");
//! // ... use handle.client() ...
//! # }
//! # }
//! ```
//!
//! ## Registry
//!
//! Caches pools keyed by the identity set they were built from, so concurrent callers asking
//! for the same set share one construction rather than racing N of them.
//!
//! ### When to Use
//!
//! - **Multi-tenant services**: each tenant's identity set gets its own pool, built once
//! - **Expensive pool construction**: authentication handshakes per identity are not free
//!
//! ## Retry
//!
//! Exponential backoff with a bounded attempt count, used by the executor's per-batch retry
//! loop. Usable standalone for any bounded-retry need.
//!
//! ## Executor
//!
//! Dispatches a bulk operation across chunked batches, each retried independently against
//! [`meshbatch_retry`]'s backoff and re-checked out from the pool on throttle.
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Bulk Upsert Against a Throttled Backend
//! ├─ 10,000 records chunked into batches of 100
//! ├─ Parallelism tracks the rate controller's current ceiling
//! ├─ A throttled batch is retried against a different identity
//! └─ continueOnError: false aborts the run, recording the fatal error
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **Fixed worker count**: doesn't adapt when the backend's capacity changes mid-run
//! ✅ Let `AdaptiveRateController::get_parallelism` drive in-flight batch count
//!
//! ## Query
//!
//! A tree of [`meshbatch_query::PlanNode`]s: scans at the leaves, transforms and script
//! control flow composing them. Nothing touches the backend until a consumer polls the row
//! stream.
//!
//! ### Real-World Scenarios
//!
//! ```text
//! Cross-Environment Aggregate
//! ├─ ParallelPartition fans a query across N backend shards
//! ├─ Each shard's CountOptimized tries the O(1) count path, falls back to a scan
//! ├─ MergeAggregate combines partial sums/counts into one group-by result
//! └─ COUNT(DISTINCT) is rejected at plan-construction time, not mid-run
//! ```
//!
//! ### Anti-Patterns
//!
//! ❌ **Materializing the whole result before consuming it**: defeats the point of a lazy
//! plan tree
//! ✅ Stream rows as they arrive; use `Prefetch` only where running ahead of the consumer
//! genuinely helps
//!
//! # Composition
//!
//! A typical bulk pipeline: `Registry` resolves a pool for the caller's identity set, the
//! `Executor` dispatches a bulk operation through that pool, and `RateControl`'s ceiling
//! governs how many batches run at once. A typical query pipeline: a `Pool` backs one or more
//! `RemoteScan`/`PagingScan` leaves, `ParallelPartition`/`MergeAggregate` compose them for
//! fan-out aggregation, and `ScriptNode` wraps the whole tree in control flow when the caller
//! needs `DECLARE`/`SET`/`IF`.

// Re-export core (always available)
pub use meshbatch_core as core;

// Re-export subsystems based on features
#[cfg(feature = "executor")]
pub use meshbatch_executor as executor;

#[cfg(feature = "pool")]
pub use meshbatch_pool as pool;

#[cfg(feature = "query")]
pub use meshbatch_query as query;

#[cfg(feature = "ratecontrol")]
pub use meshbatch_ratecontrol as ratecontrol;

#[cfg(feature = "registry")]
pub use meshbatch_registry as registry;

#[cfg(feature = "retry")]
pub use meshbatch_retry as retry;
