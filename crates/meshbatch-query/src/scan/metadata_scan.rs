//! Exposes the backend's schema as one of six virtual tables (spec §4.H `MetadataScan`).

use crate::context::QueryPlanContext;
use crate::metadata::{query_metadata_table, MetadataSource};
pub use crate::metadata::MetadataTable;
use crate::plan::{fail, PlanNode, RowStream};
use std::sync::Arc;

/// Materializes `table` from `source` as a row stream, honoring a column projection.
/// Metadata sets are bounded by schema size, so the underlying query is eager; only the
/// yielding to the consumer is lazy, consistent with every other scan node in this module.
pub struct MetadataScan {
    source: Arc<dyn MetadataSource>,
    table: MetadataTable,
    requested_columns: Option<Vec<String>>,
}

impl MetadataScan {
    pub fn new(source: Arc<dyn MetadataSource>, table: MetadataTable) -> Self {
        Self { source, table, requested_columns: None }
    }

    pub fn with_requested_columns(mut self, columns: Vec<String>) -> Self {
        self.requested_columns = Some(columns);
        self
    }
}

impl PlanNode for MetadataScan {
    fn description(&self) -> String {
        format!("MetadataScan({:?})", self.table)
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let rows = query_metadata_table(
                self.source.as_ref(),
                self.table,
                self.requested_columns.as_deref(),
                &self.description(),
                ctx,
            )
            .await;

            let rows = match rows {
                Ok(rows) => rows,
                Err(err) => {
                    // MetadataSource has no notion of a pool identity, so there is nothing to
                    // invalidate here even for ClientError::AuthExpired.
                    fail(crate::plan::map_client_error(err, ""))?;
                    unreachable!()
                }
            };

            for row in rows {
                if ctx.cancellation.is_cancelled() {
                    return;
                }
                ctx.record_rows_read(1);
                yield row;
            }
        })
    }
}
