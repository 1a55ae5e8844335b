//! Observability events emitted by [`crate::controller::AdaptiveRateController`].

use meshbatch_core::events::MeshEvent;
use std::time::Instant;

/// An event emitted by the rate controller as its state transitions.
#[derive(Debug, Clone)]
pub enum RateControlEvent {
    /// The controller (re)initialized, resetting derived ceilings and the EMA.
    Initialized {
        pool_name: String,
        floor: usize,
        hard_ceiling: usize,
        timestamp: Instant,
    },
    /// `current` increased via additive increase.
    Increased {
        pool_name: String,
        from: usize,
        to: usize,
        timestamp: Instant,
    },
    /// A throttle signal was recorded and `current` decreased multiplicatively.
    Throttled {
        pool_name: String,
        from: usize,
        to: usize,
        throttle_ceiling: usize,
        timestamp: Instant,
    },
    /// The idle-reset period elapsed and the controller returned to `floor`.
    IdleReset {
        pool_name: String,
        timestamp: Instant,
    },
}

impl MeshEvent for RateControlEvent {
    fn event_kind(&self) -> &'static str {
        match self {
            RateControlEvent::Initialized { .. } => "rate_control_initialized",
            RateControlEvent::Increased { .. } => "rate_control_increased",
            RateControlEvent::Throttled { .. } => "rate_control_throttled",
            RateControlEvent::IdleReset { .. } => "rate_control_idle_reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateControlEvent::Initialized { timestamp, .. }
            | RateControlEvent::Increased { timestamp, .. }
            | RateControlEvent::Throttled { timestamp, .. }
            | RateControlEvent::IdleReset { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RateControlEvent::Initialized { pool_name, .. }
            | RateControlEvent::Increased { pool_name, .. }
            | RateControlEvent::Throttled { pool_name, .. }
            | RateControlEvent::IdleReset { pool_name, .. } => pool_name,
        }
    }
}
