//! The row/value model shared by every scan and transform node (spec §3, §9 "Nullable numeric
//! columns").

use std::collections::BTreeMap;
use std::fmt;

/// A single backend column value.
///
/// Modeled as an explicit sum type rather than a dynamically-typed nullable scalar so that
/// null propagation in the expression evaluator is a match arm, not an ambient language
/// feature.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(String),
    String(String),
    Timestamp(i64),
    Uuid(uuid::Uuid),
    /// A foreign-key target identifier, plus an optional resolved display value.
    Reference {
        id: uuid::Uuid,
        display: Option<String>,
    },
}

impl QueryValue {
    /// True if this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }

    /// Best-effort numeric coercion, used by aggregate merge and arithmetic expressions.
    /// Returns `None` for non-numeric or null values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Int(i) => Some(*i as f64),
            QueryValue::Float(f) => Some(*f),
            QueryValue::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Best-effort string coercion for display and `STRING_AGG`.
    pub fn as_display_string(&self) -> String {
        match self {
            QueryValue::Null => String::new(),
            QueryValue::Bool(b) => b.to_string(),
            QueryValue::Int(i) => i.to_string(),
            QueryValue::Float(f) => f.to_string(),
            QueryValue::Decimal(s) => s.clone(),
            QueryValue::String(s) => s.clone(),
            QueryValue::Timestamp(t) => t.to_string(),
            QueryValue::Uuid(u) => u.to_string(),
            QueryValue::Reference { id, display } => {
                display.clone().unwrap_or_else(|| id.to_string())
            }
        }
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display_string())
    }
}

/// An immutable, case-insensitively keyed row produced by a plan node (spec §3).
///
/// Column order carries no meaning; lookups normalize to lower case so `Name` and `name`
/// address the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    columns: BTreeMap<String, QueryValue>,
    entity_logical_name: String,
}

impl QueryRow {
    /// Builds a row from an iterator of `(column, value)` pairs and the producing entity.
    pub fn new(
        entity_logical_name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, QueryValue)>,
    ) -> Self {
        let columns = columns
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            columns,
            entity_logical_name: entity_logical_name.into(),
        }
    }

    /// The entity this row originated from.
    pub fn entity_logical_name(&self) -> &str {
        &self.entity_logical_name
    }

    /// Looks up a column by name, case-insensitively. Missing columns are `None`, distinct
    /// from a present column holding `QueryValue::Null`.
    pub fn get(&self, column: &str) -> Option<&QueryValue> {
        self.columns.get(&column.to_ascii_lowercase())
    }

    /// Iterates all columns in unspecified order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns in this row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
