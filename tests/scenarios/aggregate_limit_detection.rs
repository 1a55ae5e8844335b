//! A backend client that detects its own aggregate-limit fault text surfaces
//! `MeshError::AggregateLimitExceeded` from a scan, rather than an opaque fatal error (spec
//! §7, §9 Open Question (a), §8 scenario 6 "aggregate limit detection").

use async_trait::async_trait;
use futures::TryStreamExt;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryRow;
use meshbatch_pool::{ConnectionPool, PoolConfig};
use meshbatch_query::context::QueryPlanContext;
use meshbatch_query::plan::PlanNode;
use meshbatch_query::scan::RemoteScan;
use std::sync::Arc;

/// Simulates a backend whose fault text for an over-limit aggregate query has already been
/// recognized and translated by the client implementation into the dedicated error variant,
/// rather than needing a substring scan further up the stack.
struct AggregateLimitClient;

#[async_trait]
impl BackendClient for AggregateLimitClient {
    async fn execute(&self, _request: BackendRequest) -> Result<QueryRow, ClientError> {
        unimplemented!()
    }

    async fn retrieve_multiple(
        &self,
        _query: &str,
        _page_count: u32,
        _paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError> {
        Err(ClientError::AggregateLimitExceeded { limit: Some(50_000) })
    }

    async fn get_total_count(&self, _entity: &str) -> Result<Option<u64>, ClientError> {
        Ok(None)
    }

    async fn execute_multiple(
        &self,
        _requests: Vec<BackendRequest>,
        _options: ExecuteMultipleOptions,
    ) -> Result<Vec<RequestOutcome>, ClientError> {
        Ok(vec![])
    }
}

fn pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![("svc-a".to_string(), Arc::new(AggregateLimitClient) as Arc<dyn BackendClient>)],
    ))
}

#[tokio::test]
async fn the_scan_surfaces_the_backends_record_limit() {
    let ctx = QueryPlanContext::new(pool());
    let scan = RemoteScan::new("SELECT SUM(amount) FROM opportunity", None);

    let result: Result<Vec<QueryRow>, MeshError> = scan.execute(&ctx).try_collect().await;

    match result {
        Err(MeshError::AggregateLimitExceeded { limit }) => assert_eq!(limit, Some(50_000)),
        other => panic!("expected AggregateLimitExceeded, got {other:?}"),
    }
}
