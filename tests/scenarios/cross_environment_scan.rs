//! A `remoteLabel`-qualified scan resolves against a registered cross-environment pool while
//! an unlabeled scan keeps resolving against the default pool (spec §4.H, §8 scenario 5
//! "cross-environment scan").

use async_trait::async_trait;
use futures::TryStreamExt;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::error::MeshError;
use meshbatch_core::value::{QueryRow, QueryValue};
use meshbatch_pool::{ConnectionPool, PoolConfig};
use meshbatch_query::context::QueryPlanContext;
use meshbatch_query::plan::PlanNode;
use meshbatch_query::scan::RemoteScan;
use std::sync::Arc;

struct LabeledClient(&'static str);

#[async_trait]
impl BackendClient for LabeledClient {
    async fn execute(&self, _request: BackendRequest) -> Result<QueryRow, ClientError> {
        unimplemented!()
    }

    async fn retrieve_multiple(
        &self,
        _query: &str,
        _page_count: u32,
        _paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError> {
        Ok(RetrieveMultipleResponse {
            records: vec![QueryRow::new(
                "account",
                vec![("environment".into(), QueryValue::String(self.0.to_string()))],
            )],
            more_records: false,
            paging_cookie: None,
            page_number: 1,
            total_count: Some(1),
        })
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

fn pool_for_environment(name: &'static str) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![(format!("svc-{name}"), Arc::new(LabeledClient(name)) as Arc<dyn BackendClient>)],
    ))
}

#[tokio::test]
async fn unlabeled_and_labeled_scans_resolve_to_different_pools() {
    let ctx = QueryPlanContext::new(pool_for_environment("prod"))
        .with_remote_pool("UAT", pool_for_environment("uat"));

    let default_rows: Vec<QueryRow> = RemoteScan::new("SELECT environment FROM account", None)
        .execute(&ctx)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(default_rows[0].get("environment"), Some(&QueryValue::String("prod".to_string())));

    let uat_rows: Vec<QueryRow> =
        RemoteScan::new("SELECT environment FROM account", Some("UAT".to_string()))
            .execute(&ctx)
            .try_collect()
            .await
            .unwrap();
    assert_eq!(uat_rows[0].get("environment"), Some(&QueryValue::String("uat".to_string())));
}

#[tokio::test]
async fn an_unregistered_label_fails_fatally_without_touching_any_pool() {
    let ctx = QueryPlanContext::new(pool_for_environment("prod"));

    let result: Result<Vec<QueryRow>, MeshError> =
        RemoteScan::new("SELECT environment FROM [STAGING].account", Some("STAGING".to_string()))
            .execute(&ctx)
            .try_collect()
            .await;

    match result {
        Err(MeshError::Fatal { message }) => assert!(message.contains("STAGING")),
        other => panic!("expected a fatal error naming the missing label, got {other:?}"),
    }
}
