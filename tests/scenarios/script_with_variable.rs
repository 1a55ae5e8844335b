//! `DECLARE`/`SET`/`IF` driving which embedded `SELECT` actually runs, with the script's
//! output following control flow rather than textual position (spec §4.J, §8 scenario 4
//! "script with variable").

use async_trait::async_trait;
use futures::TryStreamExt;
use meshbatch_core::client::{
    BackendClient, BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
    RetrieveMultipleResponse,
};
use meshbatch_core::value::{QueryRow, QueryValue};
use meshbatch_pool::{ConnectionPool, PoolConfig};
use meshbatch_query::context::QueryPlanContext;
use meshbatch_query::expr::{BinaryOp, Expr};
use meshbatch_query::plan::PlanNode;
use meshbatch_query::scan::RemoteScan;
use meshbatch_query::script::{ScriptNode, Statement};
use std::sync::Arc;

struct FixedResultClient(&'static str);

#[async_trait]
impl BackendClient for FixedResultClient {
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
                vec![("branch".into(), QueryValue::String(self.0.to_string()))],
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

fn pool(branch: &'static str) -> Arc<ConnectionPool> {
    Arc::new(ConnectionPool::new(
        PoolConfig::builder().build(),
        vec![("svc-a".to_string(), Arc::new(FixedResultClient(branch)) as Arc<dyn BackendClient>)],
    ))
}

/// `DECLARE @threshold = 10; SET @threshold = @threshold + 5; IF @threshold > 12 SELECT
/// 'high' ELSE SELECT 'low'`. The `SET` pushes the variable above the `IF`'s threshold, so the
/// then-branch's SELECT should be the one that actually runs, even though it isn't textually
/// last (the ELSE branch is).
fn build_script() -> ScriptNode {
    ScriptNode::new(vec![
        Statement::Declare { name: "@threshold".to_string(), initializer: Expr::Literal(QueryValue::Int(10)) },
        Statement::Set {
            name: "@threshold".to_string(),
            value: Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Variable("@threshold".to_string())),
                right: Box::new(Expr::Literal(QueryValue::Int(5))),
            },
        },
        Statement::If {
            condition: Expr::Binary {
                op: BinaryOp::Gt,
                left: Box::new(Expr::Variable("@threshold".to_string())),
                right: Box::new(Expr::Literal(QueryValue::Int(12))),
            },
            then_branch: vec![Statement::Select(Box::new(RemoteScan::new("SELECT branch FROM account", Some("high".to_string()))))],
            else_branch: vec![Statement::Select(Box::new(RemoteScan::new("SELECT branch FROM account", Some("low".to_string()))))],
        },
    ])
}

#[tokio::test]
async fn set_pushes_the_variable_past_the_if_threshold_so_the_then_branch_runs() {
    let ctx = QueryPlanContext::new(pool("default"))
        .with_remote_pool("high", pool("high"))
        .with_remote_pool("low", pool("low"));

    let script = build_script();
    let rows: Vec<QueryRow> = script.execute(&ctx).try_collect().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("branch"), Some(&QueryValue::String("high".to_string())));
}

#[tokio::test]
async fn block_scoped_declarations_do_not_leak_past_end() {
    let ctx = QueryPlanContext::new(pool("default"));

    let script = ScriptNode::new(vec![
        Statement::Block(vec![Statement::Declare {
            name: "@inner".to_string(),
            initializer: Expr::Literal(QueryValue::Int(1)),
        }]),
        Statement::Set { name: "@inner".to_string(), value: Expr::Literal(QueryValue::Int(2)) },
    ]);

    let result: Result<Vec<QueryRow>, _> = script.execute(&ctx).try_collect().await;
    assert!(result.is_err(), "@inner went out of scope at END, so the later SET must fail");
}
