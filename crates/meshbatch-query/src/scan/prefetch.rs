//! Wraps a child in a bounded channel so the child can run ahead of its consumer (spec §4.H
//! `Prefetch`).

use crate::context::QueryPlanContext;
use crate::plan::{PlanNode, RowStream};
use futures::StreamExt;
use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryRow;
use tokio_stream::wrappers::ReceiverStream;

/// A producer task drains `child` into a channel of size `buffer_size`; the consumer yields
/// from the channel. A producer exception completes the channel with that exception so the
/// consumer observes it with no row loss up to the point of failure. Cancellation is
/// propagated so neither side outlives the other.
pub struct Prefetch {
    child: Box<dyn PlanNode>,
    buffer_size: usize,
}

impl Prefetch {
    pub fn new(child: Box<dyn PlanNode>, buffer_size: usize) -> Self {
        Self { child, buffer_size: buffer_size.max(1) }
    }
}

impl PlanNode for Prefetch {
    fn description(&self) -> String {
        format!("Prefetch({}, buffer={})", self.child.description(), self.buffer_size)
    }

    fn estimated_rows(&self) -> i64 {
        self.child.estimated_rows()
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        vec![self.child.as_ref()]
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<QueryRow, MeshError>>(self.buffer_size);

        let producer = async move {
            let mut stream = self.child.execute(ctx);
            while let Some(item) = stream.next().await {
                let is_err = item.is_err();
                if tx.send(item).await.is_err() {
                    // Consumer dropped; nothing left to do.
                    return;
                }
                if is_err || ctx.cancellation.is_cancelled() {
                    return;
                }
            }
        };

        Box::pin(async_stream::stream! {
            tokio::pin!(producer);
            let mut rx = ReceiverStream::new(rx);
            let mut producer_done = false;
            loop {
                tokio::select! {
                    biased;
                    item = rx.next() => {
                        match item {
                            Some(item) => yield item,
                            None => break,
                        }
                    }
                    _ = &mut producer, if !producer_done => {
                        producer_done = true;
                    }
                }
            }
        })
    }
}
