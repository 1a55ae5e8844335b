//! `ParallelPartition` fans a scan across N shards; `MergeAggregate` combines their partial
//! SUM/COUNT rows into one group-by result (spec §4.I, §8 scenario 3 "parallel aggregate").

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
use meshbatch_query::transform::{AggregateSpec, MergeAggregate, ParallelPartition};
use std::sync::Arc;

/// Each shard returns one pre-aggregated row per region: `sum`/`count` columns the caller's
/// remote query already computed locally for that shard.
struct ShardClient {
    region: &'static str,
    sum: f64,
    count: i64,
}

#[async_trait]
impl BackendClient for ShardClient {
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
                "opportunity",
                vec![
                    ("region".into(), QueryValue::String(self.region.to_string())),
                    ("partial_sum".into(), QueryValue::Float(self.sum)),
                    ("partial_count".into(), QueryValue::Int(self.count)),
                ],
            )],
            more_records: false,
            paging_cookie: None,
            page_number: 1,
            total_count: None,
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

fn shard_pool(region: &'static str, sum: f64, count: i64) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![(
            format!("svc-{region}"),
            Arc::new(ShardClient { region, sum, count }) as Arc<dyn BackendClient>,
        )],
    ))
}

#[tokio::test]
async fn two_shards_merge_into_one_sum_and_count_per_region() {
    // Both shards happen to report the same region, which is exactly the case MergeAggregate
    // exists for: the merge must combine them into a single group, not two.
    let ctx = QueryPlanContext::new(shard_pool("east", 100.0, 4))
        .with_remote_pool("east", shard_pool("east", 100.0, 4))
        .with_remote_pool("west", shard_pool("east", 50.0, 2));

    let children: Vec<Box<dyn PlanNode>> = vec![
        Box::new(RemoteScan::new(
            "SELECT region, partial_sum, partial_count FROM opportunity",
            Some("east".to_string()),
        )),
        Box::new(RemoteScan::new(
            "SELECT region, partial_sum, partial_count FROM opportunity",
            Some("west".to_string()),
        )),
    ];

    let aggregates = vec![
        AggregateSpec::Sum { column: "partial_sum".to_string(), alias: "total_amount".to_string() },
        AggregateSpec::Count { column: "partial_count".to_string(), alias: "total_count".to_string(), distinct: false },
    ];

    let partition = ParallelPartition::new(children, 4, Some(&aggregates)).expect("no distinct count");
    let merged = MergeAggregate::new(Box::new(partition), vec!["region".to_string()], aggregates);

    let rows: Vec<QueryRow> = merged.execute(&ctx).try_collect().await.expect("merge should not fail");
    assert_eq!(rows.len(), 1, "both shards report the same region, so one merged group");

    let row = &rows[0];
    assert_eq!(row.get("total_amount"), Some(&QueryValue::Float(150.0)));
    assert_eq!(row.get("total_count"), Some(&QueryValue::Int(6)));
}

#[tokio::test]
async fn count_distinct_is_rejected_before_any_child_runs() {
    let children: Vec<Box<dyn PlanNode>> = vec![
        Box::new(RemoteScan::new("SELECT region FROM opportunity", None)),
    ];
    let aggregates = vec![AggregateSpec::Count {
        column: "region".to_string(),
        alias: "distinct_regions".to_string(),
        distinct: true,
    }];

    let err = ParallelPartition::new(children, 2, Some(&aggregates)).unwrap_err();
    assert!(matches!(err, MeshError::UnsupportedFeature { .. }));
}
