//! Combines partial aggregate rows (one group of rows per upstream partition) into the final
//! aggregate result (spec §4.I `MergeAggregate`).
//!
//! Each aggregate is merged from sufficient statistics rather than raw values, since the
//! whole point of partitioning is that no single node ever holds every row: `SUM`/`COUNT`
//! simply add across partitions; `AVG` needs a companion count per partition; `STDEV`/`VAR`
//! need count, sum, and sum-of-squares.

use crate::context::QueryPlanContext;
use crate::events::QueryEvent;
use crate::plan::{PlanNode, RowStream};
use futures::StreamExt;
use meshbatch_core::value::{QueryRow, QueryValue};
use std::collections::HashMap;
use std::time::Instant;

/// One aggregate to compute, naming the input column(s) it merges and the output alias.
#[derive(Debug, Clone)]
pub enum AggregateSpec {
    Count { column: String, alias: String, distinct: bool },
    Sum { column: String, alias: String },
    Min { column: String, alias: String },
    Max { column: String, alias: String },
    Avg { sum_column: String, count_column: Option<String>, alias: String },
    StdDev { count_column: String, sum_column: String, sum_sq_column: String, alias: String },
    Variance { count_column: String, sum_column: String, sum_sq_column: String, alias: String },
    StringAgg { column: String, separator: String, alias: String },
}

impl AggregateSpec {
    pub fn alias(&self) -> &str {
        match self {
            AggregateSpec::Count { alias, .. }
            | AggregateSpec::Sum { alias, .. }
            | AggregateSpec::Min { alias, .. }
            | AggregateSpec::Max { alias, .. }
            | AggregateSpec::Avg { alias, .. }
            | AggregateSpec::StdDev { alias, .. }
            | AggregateSpec::Variance { alias, .. }
            | AggregateSpec::StringAgg { alias, .. } => alias,
        }
    }

    pub fn is_distinct_count(&self) -> bool {
        matches!(self, AggregateSpec::Count { distinct: true, .. })
    }
}

#[derive(Default)]
struct Accumulator {
    group_values: Vec<(String, QueryValue)>,
    count: u64,
    sum: f64,
    sum_sq: f64,
    min: Option<QueryValue>,
    max: Option<QueryValue>,
    string_parts: Vec<String>,
    saw_avg_fallback: bool,
}

/// Null-safe, separator-stable key so rows with a `NULL` group column don't collide with an
/// empty string, and values containing the separator can't forge a collision.
fn group_key(row: &QueryRow, group_by: &[String]) -> String {
    const SEPARATOR: &str = "\u{1}";
    const NULL_SENTINEL: &str = "\u{0}NULL\u{0}";
    group_by
        .iter()
        .map(|column| match row.get(column) {
            None | Some(QueryValue::Null) => NULL_SENTINEL.to_string(),
            Some(value) => value.as_display_string(),
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn numeric_cmp_or_display(a: &QueryValue, b: &QueryValue) -> std::cmp::Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
        _ => a.as_display_string().cmp(&b.as_display_string()),
    }
}

/// Merges partial aggregate rows from `child`, grouped by `group_by`, into one row per group.
pub struct MergeAggregate {
    child: Box<dyn PlanNode>,
    group_by: Vec<String>,
    aggregates: Vec<AggregateSpec>,
}

impl MergeAggregate {
    pub fn new(child: Box<dyn PlanNode>, group_by: Vec<String>, aggregates: Vec<AggregateSpec>) -> Self {
        Self { child, group_by, aggregates }
    }

    fn fold(&self, accumulators: &mut HashMap<String, Accumulator>, row: &QueryRow, ctx: &QueryPlanContext, node_name: &str) {
        let key = group_key(row, &self.group_by);
        let acc = accumulators.entry(key).or_insert_with(|| Accumulator {
            group_values: self.group_by.iter().map(|c| (c.clone(), row.get(c).cloned().unwrap_or(QueryValue::Null))).collect(),
            ..Default::default()
        });

        for spec in &self.aggregates {
            match spec {
                AggregateSpec::Count { column, .. } => {
                    if let Some(value) = row.get(column).and_then(QueryValue::as_f64) {
                        acc.count += value as u64;
                    }
                }
                AggregateSpec::Sum { column, .. } => {
                    if let Some(value) = row.get(column).and_then(QueryValue::as_f64) {
                        acc.sum += value;
                    }
                }
                AggregateSpec::Min { column, .. } => {
                    if let Some(value) = row.get(column) {
                        acc.min = Some(match acc.min.take() {
                            Some(current) if numeric_cmp_or_display(&current, value).is_le() => current,
                            _ => value.clone(),
                        });
                    }
                }
                AggregateSpec::Max { column, .. } => {
                    if let Some(value) = row.get(column) {
                        acc.max = Some(match acc.max.take() {
                            Some(current) if numeric_cmp_or_display(&current, value).is_ge() => current,
                            _ => value.clone(),
                        });
                    }
                }
                AggregateSpec::Avg { sum_column, count_column, .. } => {
                    let Some(partial_sum) = row.get(sum_column).and_then(QueryValue::as_f64) else { continue };
                    let weight = match count_column.as_deref().and_then(|c| row.get(c)).and_then(QueryValue::as_f64) {
                        Some(weight) => weight,
                        None => {
                            acc.saw_avg_fallback = true;
                            1.0
                        }
                    };
                    acc.sum += partial_sum;
                    acc.count += weight as u64;
                }
                AggregateSpec::StdDev { count_column, sum_column, sum_sq_column, .. }
                | AggregateSpec::Variance { count_column, sum_column, sum_sq_column, .. } => {
                    let count = row.get(count_column).and_then(QueryValue::as_f64).unwrap_or(0.0);
                    let sum = row.get(sum_column).and_then(QueryValue::as_f64).unwrap_or(0.0);
                    let sum_sq = row.get(sum_sq_column).and_then(QueryValue::as_f64).unwrap_or(0.0);
                    acc.count += count as u64;
                    acc.sum += sum;
                    acc.sum_sq += sum_sq;
                }
                AggregateSpec::StringAgg { column, .. } => {
                    if let Some(value) = row.get(column) {
                        acc.string_parts.push(value.as_display_string());
                    }
                }
            }
        }

        if acc.saw_avg_fallback {
            ctx.progress.emit(&QueryEvent::Warning {
                node_name: node_name.to_string(),
                message: "AVG merge missing a companion count column; treating each partial row as weight 1".to_string(),
                timestamp: Instant::now(),
            });
        }
    }

    fn emit(&self, accumulators: HashMap<String, Accumulator>) -> Vec<QueryRow> {
        accumulators
            .into_values()
            .map(|acc| {
                let mut columns: Vec<(String, QueryValue)> = acc.group_values.clone();
                for spec in &self.aggregates {
                    let value = match spec {
                        AggregateSpec::Count { .. } => QueryValue::Int(acc.count as i64),
                        AggregateSpec::Sum { .. } => QueryValue::Float(acc.sum),
                        AggregateSpec::Min { .. } => acc.min.clone().unwrap_or(QueryValue::Null),
                        AggregateSpec::Max { .. } => acc.max.clone().unwrap_or(QueryValue::Null),
                        AggregateSpec::Avg { .. } => {
                            if acc.count == 0 {
                                QueryValue::Null
                            } else {
                                QueryValue::Float(acc.sum / acc.count as f64)
                            }
                        }
                        AggregateSpec::StdDev { .. } => variance(&acc).map(f64::sqrt).map(QueryValue::Float).unwrap_or(QueryValue::Null),
                        AggregateSpec::Variance { .. } => variance(&acc).map(QueryValue::Float).unwrap_or(QueryValue::Null),
                        AggregateSpec::StringAgg { separator, .. } => QueryValue::String(acc.string_parts.join(separator)),
                    };
                    columns.push((spec.alias().to_string(), value));
                }
                QueryRow::new("aggregate", columns)
            })
            .collect()
    }
}

/// `variance = (sumOfSquares - sum^2 / n) / (n - 1)`; undefined for `n < 2` (spec §4.I).
fn variance(acc: &Accumulator) -> Option<f64> {
    if acc.count < 2 {
        return None;
    }
    let n = acc.count as f64;
    Some((acc.sum_sq - acc.sum * acc.sum / n) / (n - 1.0))
}

impl PlanNode for MergeAggregate {
    fn description(&self) -> String {
        format!("MergeAggregate({})", self.child.description())
    }

    fn children(&self) -> Vec<&dyn PlanNode> {
        vec![self.child.as_ref()]
    }

    fn execute<'a>(&'a self, ctx: &'a QueryPlanContext) -> RowStream<'a> {
        let node_name = self.description();
        Box::pin(async_stream::try_stream! {
            let mut accumulators: HashMap<String, Accumulator> = HashMap::new();
            let mut stream = self.child.execute(ctx);
            while let Some(row) = stream.next().await {
                let row = row?;
                self.fold(&mut accumulators, &row, ctx, &node_name);
            }
            for row in self.emit(accumulators) {
                yield row;
            }
        })
    }
}
