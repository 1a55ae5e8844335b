//! The bulk batch executor itself (spec §4.F).

use crate::events::ExecutorEvent;
use crate::result::{BulkResult, Operation};
use meshbatch_core::client::{BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome};
use meshbatch_core::events::EventListeners;
use meshbatch_core::value::QueryRow;
use meshbatch_pool::{BatchOutcome, ConnectionPool};
use meshbatch_registry::CachedPoolRegistry;
use meshbatch_retry::ExponentialBackoff;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Tunables for one [`BulkExecutor::execute`] call.
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Entities are grouped into batches of at most this size before dispatch.
    pub batch_size: usize,
    /// When `true`, per-batch fatal failures are recorded as record errors and execution
    /// continues with the remaining batches. When `false`, a fatal failure aborts every
    /// batch still pending or in flight.
    pub continue_on_error: bool,
    /// Passed through to [`meshbatch_ratecontrol::AdaptiveRateController::get_parallelism`] as
    /// the operator-recommended concurrency per identity.
    pub recommended_per_identity: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            continue_on_error: true,
            recommended_per_identity: 2,
        }
    }
}

/// Turns a source item into the wire request that performs `operation` on it.
pub trait RequestBuilder<T>: Send + Sync {
    fn build(&self, item: &T, operation: Operation) -> BackendRequest;
}

impl<T, F> RequestBuilder<T> for F
where
    F: Fn(&T, Operation) -> BackendRequest + Send + Sync,
{
    fn build(&self, item: &T, operation: Operation) -> BackendRequest {
        self(item, operation)
    }
}

struct Batch<T> {
    items: Vec<(usize, T)>,
    attempt: u32,
}

enum BatchTaskResult<T> {
    Done {
        items: Vec<(usize, T)>,
        outcomes: Vec<RequestOutcome>,
    },
    Exhausted {
        items: Vec<(usize, T)>,
        message: String,
    },
    Fatal {
        items: Vec<(usize, T)>,
        error: ClientError,
        identity: String,
    },
}

/// Batches entities, dispatches them against a [`ConnectionPool`] at the concurrency the pool's
/// rate controller currently permits, and retries throttled or transient batches (spec §4.F).
pub struct BulkExecutor {
    name: String,
    pool: Arc<ConnectionPool>,
    backoff: ExponentialBackoff,
    listeners: EventListeners<ExecutorEvent>,
    registry: Option<Arc<CachedPoolRegistry>>,
}

impl BulkExecutor {
    pub fn new(name: impl Into<String>, pool: Arc<ConnectionPool>, backoff: ExponentialBackoff) -> Self {
        Self {
            name: name.into(),
            pool,
            backoff,
            listeners: EventListeners::new(),
            registry: None,
        }
    }

    /// Registers the registry that resolved `pool`, so a fatal `AuthExpired` batch failure can
    /// invalidate the affected identity before surfacing (spec §7 propagation policy).
    pub fn with_registry(mut self, registry: Arc<CachedPoolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn on_event<L>(&mut self, listener: L)
    where
        L: meshbatch_core::events::EventListener<ExecutorEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Runs `operation` across every entity in `entities`, batching, retrying, and aggregating
    /// into a single [`BulkResult`].
    pub async fn execute<T, R>(
        &self,
        entities: Vec<T>,
        operation: Operation,
        options: ExecuteOptions,
        request_builder: R,
    ) -> BulkResult
    where
        T: Send + 'static,
        R: RequestBuilder<T> + 'static,
    {
        let started = Instant::now();
        let mut result = BulkResult::default();
        let request_builder = Arc::new(request_builder);

        let mut pending: VecDeque<Batch<T>> = chunk_owned(entities, options.batch_size)
            .into_iter()
            .map(|items| Batch { items, attempt: 0 })
            .collect();

        let mut join_set: JoinSet<BatchTaskResult<T>> = JoinSet::new();
        let mut fatal: Option<ClientError> = None;

        while !pending.is_empty() || !join_set.is_empty() {
            let parallelism = self
                .pool
                .rate_controller()
                .get_parallelism(options.recommended_per_identity, self.pool.identity_count())
                .max(1);

            while fatal.is_none() && join_set.len() < parallelism && !pending.is_empty() {
                let batch = pending.pop_front().expect("checked non-empty above");
                let pool = Arc::clone(&self.pool);
                let backoff = self.backoff.clone();
                let request_builder = Arc::clone(&request_builder);
                let executor_name = self.name.clone();
                let listeners = self.listeners.clone();

                self.listeners.emit(&ExecutorEvent::BatchDispatched {
                    executor_name: executor_name.clone(),
                    batch_size: batch.items.len(),
                    attempt: batch.attempt,
                    timestamp: Instant::now(),
                });

                join_set.spawn(run_batch(
                    pool,
                    batch,
                    operation,
                    request_builder,
                    backoff,
                    executor_name,
                    listeners,
                ));
            }

            let Some(joined) = join_set.join_next().await else {
                break;
            };

            match joined {
                Ok(BatchTaskResult::Done { items, outcomes }) => {
                    merge_success(&mut result, operation, items, outcomes);
                }
                Ok(BatchTaskResult::Exhausted { items, message }) => {
                    self.listeners.emit(&ExecutorEvent::BatchFailed {
                        executor_name: self.name.clone(),
                        message: message.clone(),
                        timestamp: Instant::now(),
                    });
                    for (index, _) in items {
                        result.record_failure(index, "Connection.Transient", message.clone());
                    }
                }
                Ok(BatchTaskResult::Fatal { items, error, identity }) => {
                    if matches!(error, ClientError::AuthExpired) {
                        if let Some(registry) = &self.registry {
                            registry.invalidate_identity(&identity).await;
                        }
                    }
                    if options.continue_on_error {
                        for (index, _) in items {
                            result.record_failure(index, error.code_str(), error.to_string());
                        }
                    } else {
                        self.listeners.emit(&ExecutorEvent::BatchFailed {
                            executor_name: self.name.clone(),
                            message: error.to_string(),
                            timestamp: Instant::now(),
                        });
                        fatal = Some(error);
                        pending.clear();
                        join_set.abort_all();
                    }
                }
                Err(_join_error) => {
                    // The batch task panicked; its items are neither counted as success nor
                    // failure since we no longer have them. Nothing further to do.
                }
            }
        }

        if let Some(error) = fatal {
            result.fatal_error = Some(error.to_string());
        }

        result.duration = started.elapsed();
        result
    }
}

async fn run_batch<T, R>(
    pool: Arc<ConnectionPool>,
    mut batch: Batch<T>,
    operation: Operation,
    request_builder: Arc<R>,
    backoff: ExponentialBackoff,
    executor_name: String,
    listeners: EventListeners<ExecutorEvent>,
) -> BatchTaskResult<T>
where
    T: Send + 'static,
    R: RequestBuilder<T> + 'static,
{
    loop {
        let handle = match pool.checkout().await {
            Ok(handle) => handle,
            Err(err) => {
                return BatchTaskResult::Fatal {
                    items: std::mem::take(&mut batch.items),
                    error: ClientError::Fatal(err.to_string()),
                    identity: String::new(),
                };
            }
        };

        let requests: Vec<BackendRequest> = batch
            .items
            .iter()
            .map(|(_, item)| request_builder.build(item, operation))
            .collect();

        let started = Instant::now();
        let outcome = handle
            .client()
            .execute_multiple(requests, ExecuteMultipleOptions { continue_on_error: true })
            .await;

        match outcome {
            Ok(outcomes) => {
                pool.release(handle, BatchOutcome::Success { duration: started.elapsed() });
                return BatchTaskResult::Done {
                    items: std::mem::take(&mut batch.items),
                    outcomes,
                };
            }
            Err(ClientError::Throttled(retry_after)) => {
                listeners.emit(&ExecutorEvent::BatchThrottled {
                    executor_name: executor_name.clone(),
                    identity: handle.identity().to_string(),
                    timestamp: Instant::now(),
                });
                pool.release(handle, BatchOutcome::Throttled { retry_after });
                // The identity just cooled down; loop to check out a different one.
                continue;
            }
            Err(ClientError::Transient(message)) => {
                pool.release(handle, BatchOutcome::Transient);
                batch.attempt += 1;
                if batch.attempt >= backoff.max_attempts() {
                    return BatchTaskResult::Exhausted {
                        items: std::mem::take(&mut batch.items),
                        message,
                    };
                }
                listeners.emit(&ExecutorEvent::BatchRetried {
                    executor_name: executor_name.clone(),
                    attempt: batch.attempt,
                    timestamp: Instant::now(),
                });
                if let Some(delay) = backoff.delay_for_attempt(batch.attempt) {
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
            Err(fatal) => {
                let identity = handle.identity().to_string();
                pool.release(handle, BatchOutcome::Transient);
                return BatchTaskResult::Fatal {
                    items: std::mem::take(&mut batch.items),
                    error: fatal,
                    identity,
                };
            }
        }
    }
}

fn merge_success<T>(
    result: &mut BulkResult,
    operation: Operation,
    items: Vec<(usize, T)>,
    outcomes: Vec<RequestOutcome>,
) {
    for ((index, _), outcome) in items.into_iter().zip(outcomes) {
        match outcome {
            RequestOutcome::Success(row) => {
                result.record_success(operation, row_indicates_created(&row));
            }
            RequestOutcome::Failure(err) => {
                result.record_failure(index, err.code_str(), err.to_string());
            }
        }
    }
}

/// Upsert results report whether a row was created or matched an existing one via a
/// `meshbatch_created` boolean column set by the backend client implementation.
fn row_indicates_created(row: &QueryRow) -> bool {
    row.get("meshbatch_created")
        .map(|value| matches!(value, meshbatch_core::value::QueryValue::Bool(true)))
        .unwrap_or(false)
}

fn chunk_owned<T>(items: Vec<T>, size: usize) -> Vec<Vec<(usize, T)>> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut iter = items.into_iter().enumerate();
    loop {
        let chunk: Vec<(usize, T)> = iter.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(chunk);
    }
    chunks
}
