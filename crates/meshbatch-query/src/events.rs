//! Progress events emitted while a plan tree enumerates (spec §3 "progress sink").

use meshbatch_core::events::MeshEvent;
use std::time::Instant;

#[derive(Debug, Clone)]
pub enum QueryEvent {
    PageFetched {
        node_name: String,
        page_number: u32,
        timestamp: Instant,
    },
    /// Emitted once per metadata query that loops over every entity (spec §4.K).
    Warning {
        node_name: String,
        message: String,
        timestamp: Instant,
    },
}

impl MeshEvent for QueryEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            QueryEvent::PageFetched { .. } => "page_fetched",
            QueryEvent::Warning { .. } => "warning",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            QueryEvent::PageFetched { timestamp, .. } => *timestamp,
            QueryEvent::Warning { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            QueryEvent::PageFetched { node_name, .. } => node_name,
            QueryEvent::Warning { node_name, .. } => node_name,
        }
    }
}
