//! Fans a query out across independent child plans and interleaves their rows (spec §4.I
//! `ParallelPartition`).

use crate::context::QueryPlanContext;
use crate::plan::PlanNode;
use crate::transform::merge_aggregate::AggregateSpec;
use futures::StreamExt;
use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryRow;

/// Runs every child concurrently and merges their rows into one stream through a bounded
/// fan-in channel. `COUNT(DISTINCT ...)` can't be honored under partitioning: no single
/// partition sees every value, so a distinct set can't be reduced without shipping raw
/// values between partitions, defeating the point of partitioning (spec §8 scenario 3).
pub struct ParallelPartition {
    children: Vec<Box<dyn PlanNode>>,
    max_parallelism: usize,
}

impl std::fmt::Debug for ParallelPartition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelPartition")
            .field("children", &self.children.len())
            .field("max_parallelism", &self.max_parallelism)
            .finish()
    }
}

impl ParallelPartition {
    /// `aggregates` is the aggregate list this partition's output will be merged through, if
    /// any; pass `None` for a plain partitioned scan with no aggregation.
    pub fn new(
        children: Vec<Box<dyn PlanNode>>,
        max_parallelism: usize,
        aggregates: Option<&[AggregateSpec]>,
    ) -> Result<Self, MeshError> {
        if let Some(aggregates) = aggregates {
            if aggregates.iter().any(AggregateSpec::is_distinct_count) {
                return Err(MeshError::UnsupportedFeature {
                    feature: "COUNT(DISTINCT) under ParallelPartition".to_string(),
                });
            }
        }
        Ok(Self { children, max_parallelism: max_parallelism.max(1) })
    }
}

async fn run_child(
    child: &dyn PlanNode,
    ctx: &QueryPlanContext,
    tx: tokio::sync::mpsc::Sender<Result<QueryRow, MeshError>>,
) {
    let mut stream = child.execute(ctx);
    while let Some(item) = stream.next().await {
        let is_err = item.is_err();
        if tx.send(item).await.is_err() {
            return;
        }
        if is_err || ctx.cancellation.is_cancelled() {
            return;
        }
    }
}

impl PlanNode for ParallelPartition {
    fn description(&self) -> String {
        format!("ParallelPartition({} children, max {})", self.children.len(), self.max_parallelism)
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        self.children.iter().map(|c| c.as_ref()).collect()
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> crate::plan::RowStream<'a> {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<QueryRow, MeshError>>(self.max_parallelism.max(1) * 4);

        let fan_out = async move {
            let mut pending = futures::stream::FuturesUnordered::new();
            let mut remaining = self.children.iter();
            for child in remaining.by_ref().take(self.max_parallelism) {
                pending.push(run_child(child.as_ref(), ctx, tx.clone()));
            }
            while pending.next().await.is_some() {
                if let Some(child) = remaining.next() {
                    pending.push(run_child(child.as_ref(), ctx, tx.clone()));
                }
            }
        };

        Box::pin(async_stream::stream! {
            tokio::pin!(fan_out);
            let mut rx = tokio_stream::wrappers::ReceiverStream::new(rx);
            let mut fan_out_done = false;
            loop {
                tokio::select! {
                    biased;
                    item = rx.next() => {
                        match item {
                            Some(item) => yield item,
                            None => break,
                        }
                    }
                    _ = &mut fan_out, if !fan_out_done => {
                        fan_out_done = true;
                    }
                }
            }
        })
    }
}
