//! Shared execution state passed to every node in one plan enumeration (spec §3
//! `QueryPlanContext`).

use crate::cancellation::CancellationSignal;
use crate::expr::{DefaultEvaluator, ExpressionEvaluator};
use crate::variables::VariableScope;
use meshbatch_core::events::EventListeners;
use meshbatch_pool::ConnectionPool;
use meshbatch_registry::CachedPoolRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::events::QueryEvent;

/// Running statistics a plan tree accumulates during one enumeration.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub pages_fetched: u64,
    pub rows_read: u64,
    pub last_paging_cookie: Option<String>,
    pub total_count: Option<u64>,
}

/// Shared state for one plan-tree enumeration (spec §3). Borrows pools; owns no backend
/// resources itself.
pub struct QueryPlanContext {
    default_pool: Arc<ConnectionPool>,
    remote_pools: HashMap<String, Arc<ConnectionPool>>,
    registry: Option<Arc<CachedPoolRegistry>>,
    pub cancellation: CancellationSignal,
    pub evaluator: Arc<dyn ExpressionEvaluator>,
    pub variables: Mutex<VariableScope>,
    pub stats: Mutex<ExecutionStats>,
    pub progress: EventListeners<QueryEvent>,
}

impl QueryPlanContext {
    pub fn new(default_pool: Arc<ConnectionPool>) -> Self {
        Self {
            default_pool,
            remote_pools: HashMap::new(),
            registry: None,
            cancellation: CancellationSignal::new(),
            evaluator: Arc::new(DefaultEvaluator),
            variables: Mutex::new(VariableScope::new()),
            stats: Mutex::new(ExecutionStats::default()),
            progress: EventListeners::new(),
        }
    }

    /// Registers a pool reachable by `RemoteScan` under `label` (spec §4.H cross-environment
    /// scans).
    pub fn with_remote_pool(mut self, label: impl Into<String>, pool: Arc<ConnectionPool>) -> Self {
        self.remote_pools.insert(label.into(), pool);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Registers the registry that resolved this context's pools, so a scan hitting
    /// `AuthExpired` can invalidate the affected identity before surfacing the error (spec §7
    /// propagation policy).
    pub fn with_registry(mut self, registry: Arc<CachedPoolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn registry(&self) -> Option<&Arc<CachedPoolRegistry>> {
        self.registry.as_ref()
    }

    /// Resolves a `remoteLabel` to its executor pool; `None` selects the default pool.
    pub fn pool_for(&self, remote_label: Option<&str>) -> Option<&Arc<ConnectionPool>> {
        match remote_label {
            None => Some(&self.default_pool),
            Some(label) => self.remote_pools.get(label),
        }
    }

    pub fn record_rows_read(&self, count: u64) {
        self.stats.lock().rows_read += count;
    }
}
