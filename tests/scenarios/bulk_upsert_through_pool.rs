//! A bulk upsert against a backend that throttles its first call, then succeeds (spec §8
//! "bulk upsert against a throttled backend"): the executor should retry against the same
//! identity once its cooldown lapses rather than failing the batch.

use crate::support::ThrottlesThenSucceedsClient;
use meshbatch_core::client::{BackendClient, BackendRequest};
use meshbatch_executor::{BulkExecutor, ExecuteOptions, Operation};
use meshbatch_pool::{ConnectionPool, PoolConfig};
use meshbatch_retry::{BackoffConfig, ExponentialBackoff};
use std::sync::Arc;

#[tokio::test]
async fn throttled_batch_succeeds_after_cooldown() {
    let client: Arc<dyn BackendClient> = Arc::new(ThrottlesThenSucceedsClient::new(1));
    let pool = Arc::new(ConnectionPool::new(
        PoolConfig::builder().hard_ceiling_per_identity(4).build(),
        vec![("svc-a".to_string(), client)],
    ));

    let executor = BulkExecutor::new(
        "upsert-accounts",
        Arc::clone(&pool),
        ExponentialBackoff::new(BackoffConfig::default()),
    );

    let records: Vec<u32> = (0..5).collect();
    let result = executor
        .execute(
            records,
            Operation::Upsert,
            ExecuteOptions { batch_size: 5, ..ExecuteOptions::default() },
            |id: &u32, operation| BackendRequest {
                operation: format!("{operation:?}"),
                payload: id.to_le_bytes().to_vec(),
            },
        )
        .await;

    assert_eq!(result.success_count, 5);
    assert_eq!(result.failure_count, 0);
    assert!(result.fatal_error.is_none());
}
