//! Resuming a `PagingScan` from a caller-supplied page number and cookie picks up exactly
//! where a prior enumeration left off (spec §4.H, §8 scenario 2 "paging resumption").

use async_trait::async_trait;
use futures::StreamExt;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::value::{QueryRow, QueryValue};
use meshbatch_pool::{ConnectionPool, PoolConfig};
use meshbatch_query::context::QueryPlanContext;
use meshbatch_query::plan::PlanNode;
use meshbatch_query::scan::PagingScan;
use std::sync::Arc;

struct ThreePageClient;

#[async_trait]
impl BackendClient for ThreePageClient {
    async fn execute(&self, _request: BackendRequest) -> Result<QueryRow, ClientError> {
        unimplemented!()
    }

    async fn retrieve_multiple(
        &self,
        _query: &str,
        page_count: u32,
        paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError> {
        match (page_count, paging_cookie) {
            (1, _) => Ok(RetrieveMultipleResponse {
                records: vec![row(1)],
                more_records: true,
                paging_cookie: Some("P1".to_string()),
                page_number: 1,
                total_count: None,
            }),
            (2, Some("P1")) => Ok(RetrieveMultipleResponse {
                records: vec![row(2)],
                more_records: true,
                paging_cookie: Some("P2".to_string()),
                page_number: 2,
                total_count: None,
            }),
            (3, Some("P2")) => Ok(RetrieveMultipleResponse {
                records: vec![row(3)],
                more_records: false,
                paging_cookie: None,
                page_number: 3,
                total_count: None,
            }),
            other => panic!("unexpected page request: {other:?}"),
        }
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

fn row(id: i64) -> QueryRow {
    QueryRow::new("account", vec![("id".into(), QueryValue::Int(id))])
}

fn pool() -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![("svc-a".to_string(), Arc::new(ThreePageClient) as Arc<dyn BackendClient>)],
    ))
}

#[tokio::test]
async fn resuming_from_page_two_skips_the_first_page_entirely() {
    let ctx = QueryPlanContext::new(pool());
    let scan = PagingScan::new("SELECT id FROM account", None).resume_from(2, "P1");

    let rows: Vec<QueryRow> = scan
        .execute(&ctx)
        .map(|row| row.expect("row stream should not fail"))
        .collect()
        .await;

    let ids: Vec<i64> = rows
        .iter()
        .map(|r| match r.get("id").unwrap() {
            QueryValue::Int(i) => *i,
            other => panic!("unexpected value {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(ctx.stats.lock().pages_fetched, 2);
}

#[tokio::test]
async fn a_full_run_from_the_start_visits_every_page() {
    let ctx = QueryPlanContext::new(pool());
    let scan = PagingScan::new("SELECT id FROM account", None);

    let rows: Vec<QueryRow> = scan
        .execute(&ctx)
        .map(|row| row.expect("row stream should not fail"))
        .collect()
        .await;

    assert_eq!(rows.len(), 3);
    assert_eq!(ctx.stats.lock().pages_fetched, 3);
}
