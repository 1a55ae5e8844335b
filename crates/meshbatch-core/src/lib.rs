//! Shared data model, error taxonomy, and event plumbing for meshbatch.
//!
//! This crate has no opinions about rate control, pooling, or query execution; it provides
//! the vocabulary the other crates build on:
//! - [`value`] — the row/value model every scan and transform passes around.
//! - [`identity`] — identity, endpoint, and pool-key types.
//! - [`client`] — the narrow `BackendClient` contract.
//! - [`error`] — the closed error taxonomy surfaced at the core's boundary.
//! - [`events`] — panic-isolating event listener machinery shared by every component.

pub mod client;
pub mod error;
pub mod events;
pub mod identity;
pub mod value;

pub use client::{BackendClient, ClientError};
pub use error::{ErrorCode, ErrorSeverity, MeshError};
pub use events::{EventListener, EventListeners, MeshEvent};
pub use identity::{Endpoint, Identity, PoolKey};
pub use value::{QueryRow, QueryValue};
