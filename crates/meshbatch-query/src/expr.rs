//! A minimal expression AST and evaluator for `DECLARE`/`SET`/`IF` statements (spec §4.J).
//!
//! Query predicates and the SELECT parser itself are out of scope here (spec §1); this module
//! only covers the small scalar-expression language the script node needs to evaluate
//! conditions and variable initializers.

use meshbatch_core::error::MeshError;
use meshbatch_core::value::QueryValue;
use crate::variables::VariableScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// A scalar expression evaluated against the current variable scope.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(QueryValue),
    Variable(String),
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
}

/// Evaluates [`Expr`] trees against a [`VariableScope`]. A trait rather than a free function so
/// callers can swap in a richer evaluator without changing the script node.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expr: &Expr, scope: &VariableScope) -> Result<QueryValue, MeshError>;
}

/// The evaluator used when no richer one is supplied: literals, variable lookups (undefined
/// reads as `Null`), arithmetic on numerics, and comparison/boolean operators.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEvaluator;

impl ExpressionEvaluator for DefaultEvaluator {
    fn evaluate(&self, expr: &Expr, scope: &VariableScope) -> Result<QueryValue, MeshError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => Ok(scope.get(name).cloned().unwrap_or(QueryValue::Null)),
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left, scope)?;
                let right = self.evaluate(right, scope)?;
                Ok(evaluate_binary(*op, left, right))
            }
        }
    }
}

fn evaluate_binary(op: BinaryOp, left: QueryValue, right: QueryValue) -> QueryValue {
    match op {
        BinaryOp::Add => numeric_binary(left, right, |a, b| a + b),
        BinaryOp::Sub => numeric_binary(left, right, |a, b| a - b),
        BinaryOp::And => QueryValue::Bool(truthy(&left) && truthy(&right)),
        BinaryOp::Or => QueryValue::Bool(truthy(&left) || truthy(&right)),
        BinaryOp::Eq => QueryValue::Bool(values_equal(&left, &right)),
        BinaryOp::Ne => QueryValue::Bool(!values_equal(&left, &right)),
        BinaryOp::Lt => compare(left, right, |a, b| a < b),
        BinaryOp::Le => compare(left, right, |a, b| a <= b),
        BinaryOp::Gt => compare(left, right, |a, b| a > b),
        BinaryOp::Ge => compare(left, right, |a, b| a >= b),
    }
}

fn numeric_binary(left: QueryValue, right: QueryValue, f: impl Fn(f64, f64) -> f64) -> QueryValue {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => QueryValue::Float(f(a, b)),
        _ => QueryValue::Null,
    }
}

fn compare(left: QueryValue, right: QueryValue, f: impl Fn(f64, f64) -> bool) -> QueryValue {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => QueryValue::Bool(f(a, b)),
        _ => QueryValue::Bool(false),
    }
}

fn values_equal(left: &QueryValue, right: &QueryValue) -> bool {
    left == right
}

/// Truthiness for `IF` conditions: `Bool(true)` or any non-zero, non-null numeric.
pub fn truthy(value: &QueryValue) -> bool {
    match value {
        QueryValue::Bool(b) => *b,
        QueryValue::Null => false,
        other => other.as_f64().map(|n| n != 0.0).unwrap_or(false),
    }
}
