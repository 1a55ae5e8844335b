//! `DECLARE`/`SET`/`IF THEN ELSE`/`BEGIN...END` control flow around embedded `SELECT`s (spec
//! §4.J `ScriptNode`).
//!
//! The SQL parser is out of scope (§1); a `Statement` tree is handed to this node already
//! built, with each embedded `SELECT` already lowered to a [`PlanNode`] by the caller.

use crate::context::QueryPlanContext;
use crate::expr::Expr;
use crate::plan::{PlanNode, RowStream};
use futures::future::BoxFuture;
use futures::TryStreamExt;
use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryRow;

/// One statement in a script body.
pub enum Statement {
    Declare { name: String, initializer: Expr },
    Set { name: String, value: Expr },
    If { condition: Expr, then_branch: Vec<Statement>, else_branch: Vec<Statement> },
    /// `BEGIN ... END`: introduces a new variable frame, popped on exit.
    Block(Vec<Statement>),
    /// An embedded `SELECT`, already lowered to a plan tree.
    Select(Box<dyn PlanNode>),
}

/// Runs `statements` against `ctx`, returning the materialized rows of the last
/// row-producing statement actually executed (spec §4.J: output follows control flow, not
/// textual position). Later statements run with whatever variable bindings earlier ones left.
fn run_statements<'a>(
    statements: &'a [Statement],
    ctx: &'a QueryPlanContext,
) -> BoxFuture<'a, Result<Option<Vec<QueryRow>>, MeshError>> {
    Box::pin(async move {
        let mut last = None;
        for statement in statements {
            match statement {
                Statement::Declare { name, initializer } => {
                    let value = {
                        let scope = ctx.variables.lock();
                        ctx.evaluator.evaluate(initializer, &scope)?
                    };
                    ctx.variables.lock().declare(name.clone(), value);
                }
                Statement::Set { name, value } => {
                    let evaluated = {
                        let scope = ctx.variables.lock();
                        ctx.evaluator.evaluate(value, &scope)?
                    };
                    ctx.variables
                        .lock()
                        .set(name, evaluated)
                        .map_err(|e| MeshError::Validation {
                            fields: vec![meshbatch_core::error::FieldError {
                                field: name.clone(),
                                message: e.to_string(),
                            }],
                        })?;
                }
                Statement::If { condition, then_branch, else_branch } => {
                    let condition_value = {
                        let scope = ctx.variables.lock();
                        ctx.evaluator.evaluate(condition, &scope)?
                    };
                    let branch = if crate::expr::truthy(&condition_value) { then_branch } else { else_branch };
                    if let Some(rows) = run_statements(branch, ctx).await? {
                        last = Some(rows);
                    }
                }
                Statement::Block(inner) => {
                    ctx.variables.lock().push_frame();
                    let result = run_statements(inner, ctx).await;
                    ctx.variables.lock().pop_frame();
                    if let Some(rows) = result? {
                        last = Some(rows);
                    }
                }
                Statement::Select(plan) => {
                    let rows: Vec<QueryRow> = plan.execute(ctx).try_collect().await?;
                    last = Some(rows);
                }
            }
        }
        Ok(last)
    })
}

/// Executes a script body, yielding the rows of the last statement that actually produced
/// any (an `IF` with no matching branch, or a script with no `SELECT`, yields nothing).
pub struct ScriptNode {
    statements: Vec<Statement>,
}

impl ScriptNode {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

impl PlanNode for ScriptNode {
    fn description(&self) -> String {
        format!("Script({} statements)", self.statements.len())
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        fn collect_selects<'a>(statements: &'a [Statement], out: &mut Vec<&'a dyn PlanNode>) {
            for statement in statements {
                match statement {
                    Statement::Select(plan) => out.push(plan.as_ref()),
                    Statement::If { then_branch, else_branch, .. } => {
                        collect_selects(then_branch, out);
                        collect_selects(else_branch, out);
                    }
                    Statement::Block(inner) => collect_selects(inner, out),
                    Statement::Declare { .. } | Statement::Set { .. } => {}
                }
            }
        }
        let mut out = Vec::new();
        collect_selects(&self.statements, &mut out);
        out
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        Box::pin(async_stream::try_stream! {
            let last = run_statements(&self.statements, ctx).await?;
            if let Some(rows) = last {
                for row in rows {
                    yield row;
                }
            }
        })
    }
}
