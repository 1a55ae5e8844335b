//! Row-by-row predicate filter applied after retrieval, not pushed to the backend (spec §4.I
//! `ClientFilter`).

use crate::context::QueryPlanContext;
use crate::plan::{PlanNode, RowStream};
use futures::StreamExt;
use meshbatch_core::value::QueryRow;
use std::sync::Arc;

/// Forwards only the rows from `child` for which `predicate` returns `true`. Useful when a
/// condition can't be expressed in the backend's query language, or when it's cheaper to
/// filter client-side than to round-trip a second query.
pub struct ClientFilter {
    child: Box<dyn PlanNode>,
    predicate: Arc<dyn Fn(&QueryRow) -> bool + Send + Sync>,
}

impl ClientFilter {
    pub fn new(child: Box<dyn PlanNode>, predicate: Arc<dyn Fn(&QueryRow) -> bool + Send + Sync>) -> Self {
        Self { child, predicate }
    }
}

impl PlanNode for ClientFilter {
    fn description(&self) -> String {
        format!("ClientFilter({})", self.child.description())
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        vec![self.child.as_ref()]
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let mut stream = self.child.execute(ctx);
            while let Some(row) = stream.next().await {
                let row = row?;
                if (self.predicate)(&row) {
                    yield row;
                }
            }
        })
    }
}
