//! A concurrent, keyed cache of connection pools with at-most-once async construction
//! (spec §4.E).
//!
//! Repurposes a singleflight-style in-flight map — the same shape used for request
//! coalescing — from deduplicating concurrent identical *requests* to deduplicating
//! concurrent identical *pool constructions*: the cached value is retained on success and the
//! key is evicted on failure so the next caller gets a clean attempt.

pub mod error;
pub mod events;
pub mod registry;

pub use error::RegistryError;
pub use events::RegistryEvent;
pub use registry::{CachedPoolRegistry, PoolConstructor};
