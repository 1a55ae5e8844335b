//! Observability events emitted by [`crate::registry::CachedPoolRegistry`].

use meshbatch_core::events::MeshEvent;
use std::time::Instant;

/// An event emitted as registry entries are constructed or invalidated.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A caller became the leader constructing a new entry.
    ConstructionStarted { key_summary: String, timestamp: Instant },
    /// Construction completed successfully and the entry was cached.
    ConstructionSucceeded { key_summary: String, timestamp: Instant },
    /// Construction failed; the key was removed so the next caller retries fresh.
    ConstructionFailed {
        key_summary: String,
        message: String,
        timestamp: Instant,
    },
    /// An identity or endpoint invalidation removed one or more entries.
    EntriesInvalidated {
        reason: String,
        count: usize,
        timestamp: Instant,
    },
}

impl MeshEvent for RegistryEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            RegistryEvent::ConstructionStarted { .. } => "construction_started",
            RegistryEvent::ConstructionSucceeded { .. } => "construction_succeeded",
            RegistryEvent::ConstructionFailed { .. } => "construction_failed",
            RegistryEvent::EntriesInvalidated { .. } => "entries_invalidated",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RegistryEvent::ConstructionStarted { timestamp, .. }
            | RegistryEvent::ConstructionSucceeded { timestamp, .. }
            | RegistryEvent::ConstructionFailed { timestamp, .. }
            | RegistryEvent::EntriesInvalidated { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RegistryEvent::ConstructionStarted { key_summary, .. }
            | RegistryEvent::ConstructionSucceeded { key_summary, .. }
            | RegistryEvent::ConstructionFailed { key_summary, .. } => key_summary,
            RegistryEvent::EntriesInvalidated { reason, .. } => reason,
        }
    }
}
