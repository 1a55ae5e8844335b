//! One-shot, non-paging scan against a native backend query (spec §4.H `RemoteScan`).

use crate::context::QueryPlanContext;
use crate::plan::{fail, invalidate_on_auth_expired, map_client_error, PlanNode, RowStream};
use meshbatch_core::client::ClientError;
use meshbatch_core::error::MeshError;
use meshbatch_pool::BatchOutcome;
use std::time::Instant;

/// Resolves `remote_label` to an executor via the context (the default pool if unlabeled; a
/// cross-environment pool otherwise), issues one-shot retrieval, and yields each record.
pub struct RemoteScan {
    query: String,
    remote_label: Option<String>,
}

impl RemoteScan {
    pub fn new(query: impl Into<String>, remote_label: Option<String>) -> Self {
        Self { query: query.into(), remote_label }
    }
}

impl PlanNode for RemoteScan {
    fn description(&self) -> String {
        match &self.remote_label {
            Some(label) => format!("RemoteScan[{label}]({})", self.query),
            None => format!("RemoteScan({})", self.query),
        }
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let Some(pool) = ctx.pool_for(self.remote_label.as_deref()) else {
                fail(MeshError::Fatal {
                    message: format!("no executor registered for remote label {:?}", self.remote_label),
                })?;
                unreachable!()
            };

            let handle = pool.checkout().await.map_err(|e| MeshError::Fatal { message: e.to_string() })?;
            let started = Instant::now();

            match handle.client().retrieve_multiple(&self.query, 1, None).await {
                Ok(response) => {
                    pool.release(handle, BatchOutcome::Success { duration: started.elapsed() });
                    if let Some(total) = response.total_count {
                        ctx.stats.lock().total_count = Some(total);
                    }
                    for row in response.records {
                        if ctx.cancellation.is_cancelled() {
                            return;
                        }
                        ctx.record_rows_read(1);
                        yield row;
                    }
                }
                Err(ClientError::Throttled(retry_after)) => {
                    let identity = handle.identity().to_string();
                    pool.release(handle, BatchOutcome::Throttled { retry_after });
                    fail(map_client_error(ClientError::Throttled(retry_after), &identity))?;
                }
                Err(err) => {
                    let identity = handle.identity().to_string();
                    pool.release(handle, BatchOutcome::Transient);
                    invalidate_on_auth_expired(ctx, &err, &identity).await;
                    fail(map_client_error(err, &identity))?;
                }
            }
        })
    }
}
