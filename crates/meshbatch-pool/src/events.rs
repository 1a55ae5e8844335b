//! Observability events emitted by [`crate::pool::ConnectionPool`].

use meshbatch_core::events::MeshEvent;
use std::time::{Duration, Instant};

/// An event emitted as clients are checked out of and released to a pool.
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A checkout succeeded and a client was handed to the caller.
    CheckoutPermitted {
        pool_name: String,
        identity: String,
        in_flight: usize,
        timestamp: Instant,
    },
    /// A client was released back to the pool.
    Released {
        pool_name: String,
        identity: String,
        duration: Duration,
        timestamp: Instant,
    },
    /// A release carried a throttle signal; the identity was placed in cooldown.
    IdentityCooledDown {
        pool_name: String,
        identity: String,
        until: Instant,
        timestamp: Instant,
    },
}

impl MeshEvent for PoolEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            PoolEvent::CheckoutPermitted { .. } => "checkout_permitted",
            PoolEvent::Released { .. } => "released",
            PoolEvent::IdentityCooledDown { .. } => "identity_cooled_down",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PoolEvent::CheckoutPermitted { timestamp, .. }
            | PoolEvent::Released { timestamp, .. }
            | PoolEvent::IdentityCooledDown { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            PoolEvent::CheckoutPermitted { pool_name, .. }
            | PoolEvent::Released { pool_name, .. }
            | PoolEvent::IdentityCooledDown { pool_name, .. } => pool_name,
        }
    }
}
