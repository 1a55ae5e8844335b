//! Auto-paging scan using the backend's paging-cookie protocol (spec §4.H `PagingScan`).

use crate::context::QueryPlanContext;
use crate::plan::{fail, invalidate_on_auth_expired, map_client_error, PlanNode, RowStream};
use meshbatch_core::client::ClientError;
use meshbatch_pool::BatchOutcome;
use std::time::Instant;

/// Like [`crate::scan::RemoteScan`] but pages until the backend reports no more records, an
/// optional `max_rows` is reached, or the context is cancelled. Supports resuming from a
/// caller-supplied page number and cookie (spec §8 scenario 2).
pub struct PagingScan {
    query: String,
    remote_label: Option<String>,
    initial_page_number: u32,
    initial_paging_cookie: Option<String>,
    max_rows: Option<u64>,
}

impl PagingScan {
    pub fn new(query: impl Into<String>, remote_label: Option<String>) -> Self {
        Self {
            query: query.into(),
            remote_label,
            initial_page_number: 1,
            initial_paging_cookie: None,
            max_rows: None,
        }
    }

    /// Resumes from `page_number` with `paging_cookie` rather than starting at page 1.
    pub fn resume_from(mut self, page_number: u32, paging_cookie: impl Into<String>) -> Self {
        self.initial_page_number = page_number;
        self.initial_paging_cookie = Some(paging_cookie.into());
        self
    }

    pub fn max_rows(mut self, max_rows: u64) -> Self {
        self.max_rows = Some(max_rows);
        self
    }
}

impl PlanNode for PagingScan {
    fn description(&self) -> String {
        format!("PagingScan({}, from page {})", self.query, self.initial_page_number)
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let Some(pool) = ctx.pool_for(self.remote_label.as_deref()) else {
                fail(meshbatch_core::error::MeshError::Fatal {
                    message: format!("no executor registered for remote label {:?}", self.remote_label),
                })?;
                unreachable!()
            };

            let mut page_number = self.initial_page_number;
            let mut cookie = self.initial_paging_cookie.clone();
            let mut rows_yielded: u64 = 0;

            loop {
                if ctx.cancellation.is_cancelled() {
                    return;
                }

                let handle = pool.checkout().await.map_err(|e| meshbatch_core::error::MeshError::Fatal { message: e.to_string() })?;
                let started = Instant::now();

                let response = match handle
                    .client()
                    .retrieve_multiple(&self.query, page_number, cookie.as_deref())
                    .await
                {
                    Ok(response) => {
                        pool.release(handle, BatchOutcome::Success { duration: started.elapsed() });
                        response
                    }
                    Err(ClientError::Throttled(retry_after)) => {
                        let identity = handle.identity().to_string();
                        pool.release(handle, BatchOutcome::Throttled { retry_after });
                        fail(map_client_error(ClientError::Throttled(retry_after), &identity))?;
                        unreachable!()
                    }
                    Err(err) => {
                        let identity = handle.identity().to_string();
                        pool.release(handle, BatchOutcome::Transient);
                        invalidate_on_auth_expired(ctx, &err, &identity).await;
                        fail(map_client_error(err, &identity))?;
                        unreachable!()
                    }
                };

                {
                    let mut stats = ctx.stats.lock();
                    stats.pages_fetched += 1;
                    stats.last_paging_cookie = response.paging_cookie.clone();
                    if let Some(total) = response.total_count {
                        stats.total_count = Some(total);
                    }
                }

                let more_records = response.more_records;
                let next_cookie = response.paging_cookie.clone();

                for row in response.records {
                    if ctx.cancellation.is_cancelled() {
                        return;
                    }
                    if let Some(max) = self.max_rows {
                        if rows_yielded >= max {
                            return;
                        }
                    }
                    rows_yielded += 1;
                    ctx.record_rows_read(1);
                    yield row;
                }

                if !more_records || next_cookie.is_none() {
                    return;
                }
                if let Some(max) = self.max_rows {
                    if rows_yielded >= max {
                        return;
                    }
                }

                cookie = next_cookie;
                page_number += 1;
            }
        })
    }
}
