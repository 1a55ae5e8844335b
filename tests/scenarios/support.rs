//! Shared test doubles for the scenario suite.

#![allow(dead_code)]

use async_trait::async_trait;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::value::QueryRow;
use std::sync::atomic::{AtomicU32, Ordering};

/// A client that never answers a native query; only useful where a scenario exercises
/// `execute`/`execute_multiple` paths.
pub struct SilentClient;

#[async_trait]
impl BackendClient for SilentClient {
    async fn execute(&self, _request: BackendRequest) -> Result<QueryRow, ClientError> {
        Ok(QueryRow::new("stub", vec![]))
    }

    async fn retrieve_multiple(
        &self,
        _query: &str,
        _page_count: u32,
        _paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError> {
        Ok(RetrieveMultipleResponse {
            records: vec![],
            more_records: false,
            paging_cookie: None,
            page_number: 1,
            total_count: Some(0),
        })
    }

    async fn get_total_count(&self, _entity: &str) -> Result<Option<u64>, ClientError> {
        Ok(None)
    }

    async fn execute_multiple(
        &self,
        requests: Vec<BackendRequest>,
        _options: ExecuteMultipleOptions,
    ) -> Result<Vec<RequestOutcome>, ClientError> {
        Ok(requests
            .into_iter()
            .map(|_| RequestOutcome::Success(QueryRow::new("stub", vec![])))
            .collect())
    }
}

/// A client whose `execute_multiple` throttles its first `throttle_calls` invocations, then
/// succeeds every record after that.
pub struct ThrottlesThenSucceedsClient {
    pub throttle_calls: u32,
    calls_seen: AtomicU32,
}

impl ThrottlesThenSucceedsClient {
    pub fn new(throttle_calls: u32) -> Self {
        Self { throttle_calls, calls_seen: AtomicU32::new(0) }
    }
}

#[async_trait]
impl BackendClient for ThrottlesThenSucceedsClient {
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
        requests: Vec<BackendRequest>,
        _options: ExecuteMultipleOptions,
    ) -> Result<Vec<RequestOutcome>, ClientError> {
        let call = self.calls_seen.fetch_add(1, Ordering::SeqCst);
        if call < self.throttle_calls {
            return Err(ClientError::Throttled(std::time::Duration::from_millis(5)));
        }
        Ok(requests
            .into_iter()
            .map(|_| RequestOutcome::Success(QueryRow::new("stub", vec![])))
            .collect())
    }
}
