//! Attempts the backend's O(1) total-count path, falling back to a child node (spec §4.H
//! `CountOptimized`).

use crate::context::QueryPlanContext;
use crate::plan::{fail, invalidate_on_auth_expired, map_client_error, PlanNode, RowStream};
use meshbatch_core::value::{QueryRow, QueryValue};
use meshbatch_pool::BatchOutcome;
use std::time::Instant;

/// Yields one row `{alias: count}` from `GetTotalCount` when supported; otherwise delegates to
/// `fallback`. Yields nothing if neither path produces a count.
pub struct CountOptimized {
    entity: String,
    alias: String,
    remote_label: Option<String>,
    fallback: Option<Box<dyn PlanNode>>,
}

impl CountOptimized {
    pub fn new(entity: impl Into<String>, alias: impl Into<String>, remote_label: Option<String>) -> Self {
        Self { entity: entity.into(), alias: alias.into(), remote_label, fallback: None }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn PlanNode>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl PlanNode for CountOptimized {
    fn description(&self) -> String {
        format!("CountOptimized({})", self.entity)
    }

    fn estimated_rows(&self) -> i64 {
        1
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        self.fallback.as_deref().into_iter().collect()
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let Some(pool) = ctx.pool_for(self.remote_label.as_deref()) else {
                fail(meshbatch_core::error::MeshError::Fatal {
                    message: format!("no executor registered for remote label {:?}", self.remote_label),
                })?;
                unreachable!()
            };

            let handle = pool.checkout().await.map_err(|e| meshbatch_core::error::MeshError::Fatal { message: e.to_string() })?;
            let started = Instant::now();
            let outcome = handle.client().get_total_count(&self.entity).await;

            match outcome {
                Ok(Some(count)) => {
                    pool.release(handle, BatchOutcome::Success { duration: started.elapsed() });
                    yield QueryRow::new(self.entity.clone(), vec![(self.alias.clone(), QueryValue::Int(count as i64))]);
                    return;
                }
                Ok(None) => {
                    pool.release(handle, BatchOutcome::Success { duration: started.elapsed() });
                }
                Err(err) => {
                    let identity = handle.identity().to_string();
                    pool.release(handle, BatchOutcome::Transient);
                    invalidate_on_auth_expired(ctx, &err, &identity).await;
                    if self.fallback.is_none() {
                        fail(map_client_error(err, &identity))?;
                        unreachable!()
                    }
                }
            }

            if let Some(fallback) = &self.fallback {
                let mut stream = fallback.execute(ctx);
                use futures::StreamExt;
                while let Some(row) = stream.next().await {
                    yield row?;
                }
            }
        })
    }
}
