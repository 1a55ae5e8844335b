pub mod client_filter;
pub mod merge_aggregate;
pub mod parallel_partition;

pub use client_filter::ClientFilter;
pub use merge_aggregate::{AggregateSpec, MergeAggregate};
pub use parallel_partition::ParallelPartition;
