//! Result types returned by [`crate::bulk::BulkExecutor::execute`] (spec §4.F).

use std::time::Duration;

/// The create/update/upsert/delete operation a bulk execution performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Upsert,
    Delete,
}

/// One record's failure, with enough context for a caller to locate and understand it.
#[derive(Debug, Clone)]
pub struct RecordError {
    /// Index of the failing record in the caller's original input.
    pub source_index: usize,
    pub code: String,
    pub message: String,
}

/// The outcome of a full bulk execution.
#[derive(Debug, Clone, Default)]
pub struct BulkResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub created_count: usize,
    pub updated_count: usize,
    pub errors: Vec<RecordError>,
    pub duration: Duration,
    /// Set when a fatal batch error aborted the run early (`continueOnError: false`).
    /// Entities in batches still pending or in flight at that point are neither counted as
    /// successes nor failures.
    pub fatal_error: Option<String>,
}

impl BulkResult {
    pub(crate) fn record_success(&mut self, operation: Operation, created: bool) {
        self.success_count += 1;
        match operation {
            Operation::Create => self.created_count += 1,
            Operation::Update => self.updated_count += 1,
            Operation::Upsert => {
                if created {
                    self.created_count += 1;
                } else {
                    self.updated_count += 1;
                }
            }
            Operation::Delete => {}
        }
    }

    pub(crate) fn record_failure(&mut self, source_index: usize, code: impl Into<String>, message: impl Into<String>) {
        self.failure_count += 1;
        self.errors.push(RecordError {
            source_index,
            code: code.into(),
            message: message.into(),
        });
    }
}
