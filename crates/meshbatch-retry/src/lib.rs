//! Exponential backoff computation used by `BulkExecutor`'s per-batch retry loop (spec §4.F).

pub mod backoff;

pub use backoff::{BackoffConfig, ExponentialBackoff};
