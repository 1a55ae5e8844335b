//! Observability events emitted by [`crate::bulk::BulkExecutor`].

use meshbatch_core::events::MeshEvent;
use std::time::Instant;

/// An event emitted as batches are dispatched, retried, and completed.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    BatchDispatched {
        executor_name: String,
        batch_size: usize,
        attempt: u32,
        timestamp: Instant,
    },
    BatchThrottled {
        executor_name: String,
        identity: String,
        timestamp: Instant,
    },
    BatchRetried {
        executor_name: String,
        attempt: u32,
        timestamp: Instant,
    },
    BatchFailed {
        executor_name: String,
        message: String,
        timestamp: Instant,
    },
}

impl MeshEvent for ExecutorEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            ExecutorEvent::BatchDispatched { .. } => "batch_dispatched",
            ExecutorEvent::BatchThrottled { .. } => "batch_throttled",
            ExecutorEvent::BatchRetried { .. } => "batch_retried",
            ExecutorEvent::BatchFailed { .. } => "batch_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ExecutorEvent::BatchDispatched { timestamp, .. }
            | ExecutorEvent::BatchThrottled { timestamp, .. }
            | ExecutorEvent::BatchRetried { timestamp, .. }
            | ExecutorEvent::BatchFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            ExecutorEvent::BatchDispatched { executor_name, .. }
            | ExecutorEvent::BatchThrottled { executor_name, .. }
            | ExecutorEvent::BatchRetried { executor_name, .. }
            | ExecutorEvent::BatchFailed { executor_name, .. } => executor_name,
        }
    }
}
