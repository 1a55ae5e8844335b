//! Shared test doubles used across this crate's unit tests.
#![cfg(test)]

use async_trait::async_trait;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::value::QueryRow;
use meshbatch_pool::{ConnectionPool, PoolConfig};
use std::sync::Arc;

pub struct NoopClient;

#[async_trait]
impl BackendClient for NoopClient {
    async fn execute(&self, _request: BackendRequest) -> Result<QueryRow, ClientError> {
        unimplemented!()
    }
    async fn retrieve_multiple(
        &self,
        _query: &str,
        _page_count: u32,
        _paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError> {
        unimplemented!()
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

pub fn stub_pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![("svc-a".to_string(), Arc::new(NoopClient) as Arc<dyn BackendClient>)],
    ))
}
