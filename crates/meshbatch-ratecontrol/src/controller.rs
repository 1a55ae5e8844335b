//! The AIMD loop with three independent ceilings (spec §4.D).

use crate::events::RateControlEvent;
use meshbatch_core::events::EventListeners;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Tunables for [`AdaptiveRateController`] (spec §6 configuration table).
#[derive(Debug, Clone)]
pub struct RateControllerConfig {
    pub configured_min: usize,
    pub hard_ceiling_per_identity: usize,
    pub increase_step: usize,
    pub decrease_factor: f64,
    pub stabilization_batches: u32,
    pub min_increase_interval: Duration,
    pub recovery_multiplier: f64,
    pub last_known_good_ttl: Duration,
    pub idle_reset_period: Duration,
    pub exec_time_factor: f64,
    pub request_rate_factor: f64,
    pub slow_batch_threshold: Duration,
    pub batch_duration_smoothing_factor: f64,
    pub min_batch_samples_for_ceiling: u32,
}

impl Default for RateControllerConfig {
    fn default() -> Self {
        Self {
            configured_min: 1,
            hard_ceiling_per_identity: 52,
            increase_step: 2,
            decrease_factor: 0.5,
            stabilization_batches: 3,
            min_increase_interval: Duration::ZERO,
            recovery_multiplier: 2.0,
            last_known_good_ttl: Duration::from_secs(15 * 60),
            idle_reset_period: Duration::from_secs(5 * 60),
            exec_time_factor: 60.0,
            request_rate_factor: 10.0,
            slow_batch_threshold: Duration::from_millis(500),
            batch_duration_smoothing_factor: 0.2,
            min_batch_samples_for_ceiling: 5,
        }
    }
}

#[derive(Debug, Clone)]
struct ThrottleCeiling {
    value: usize,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct LastKnownGood {
    value: usize,
    recorded_at: Instant,
}

struct ControllerState {
    initialized: bool,
    identity_count: usize,
    current: usize,
    floor: usize,
    hard_ceiling: usize,
    throttle_ceiling: Option<ThrottleCeiling>,
    exec_time_ceiling: Option<usize>,
    request_rate_ceiling: Option<usize>,
    duration_ema_seconds: Option<f64>,
    sample_count: u32,
    last_known_good: Option<LastKnownGood>,
    batches_since_throttle: u32,
    total_throttle_events: u64,
    last_activity: Instant,
    last_increase: Instant,
}

impl ControllerState {
    fn uninitialized(now: Instant) -> Self {
        Self {
            initialized: false,
            identity_count: 0,
            current: 0,
            floor: 0,
            hard_ceiling: 0,
            throttle_ceiling: None,
            exec_time_ceiling: None,
            request_rate_ceiling: None,
            duration_ema_seconds: None,
            sample_count: 0,
            last_known_good: None,
            batches_since_throttle: 0,
            total_throttle_events: 0,
            last_activity: now,
            last_increase: now,
        }
    }
}

/// Converges on the maximum parallelism the backend will accept without throttling
/// (spec §4.D). Bounded below by `floor` and above by the minimum of `hardCeiling` and
/// whichever derived ceilings are currently active.
pub struct AdaptiveRateController {
    name: String,
    config: RateControllerConfig,
    state: Mutex<ControllerState>,
    listeners: EventListeners<RateControlEvent>,
}

impl AdaptiveRateController {
    /// Creates a controller in its uninitialized state; the first call to
    /// [`AdaptiveRateController::get_parallelism`] performs lazy initialization.
    pub fn new(name: impl Into<String>, config: RateControllerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(ControllerState::uninitialized(Instant::now())),
            listeners: EventListeners::new(),
        }
    }

    /// Registers a listener for rate-control events.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: meshbatch_core::events::EventListener<RateControlEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Returns the currently permitted parallelism, lazily (re)initializing if this is the
    /// first call, the identity count changed, or the idle-reset period has elapsed.
    pub fn get_parallelism(&self, recommended_per_identity: usize, identity_count: usize) -> usize {
        let mut state = self.state.lock();
        let now = Instant::now();

        let idle = state.initialized && now.duration_since(state.last_activity) >= self.config.idle_reset_period;
        let identity_count_changed = state.initialized && state.identity_count != identity_count;

        if !state.initialized || identity_count_changed || idle {
            if idle {
                self.listeners.emit(&RateControlEvent::IdleReset {
                    pool_name: self.name.clone(),
                    timestamp: now,
                });
            }
            self.initialize_locked(&mut state, recommended_per_identity, identity_count, now);
        }

        state.current
    }

    fn initialize_locked(
        &self,
        state: &mut ControllerState,
        recommended_per_identity: usize,
        identity_count: usize,
        now: Instant,
    ) {
        let floor = self
            .config
            .configured_min
            .max(recommended_per_identity.saturating_mul(identity_count));
        let hard_ceiling = self
            .config
            .hard_ceiling_per_identity
            .saturating_mul(identity_count)
            .max(floor);

        state.initialized = true;
        state.identity_count = identity_count;
        state.floor = floor;
        state.hard_ceiling = hard_ceiling;
        state.current = floor;
        state.throttle_ceiling = None;
        state.exec_time_ceiling = None;
        state.request_rate_ceiling = None;
        state.duration_ema_seconds = None;
        state.sample_count = 0;
        state.batches_since_throttle = 0;
        state.last_activity = now;
        state.last_increase = now;

        self.listeners.emit(&RateControlEvent::Initialized {
            pool_name: self.name.clone(),
            floor,
            hard_ceiling,
            timestamp: now,
        });
    }

    /// Records a completed batch's duration, updating the EMA, derived ceilings, and
    /// attempting an additive increase.
    pub fn record_batch_completion(&self, duration: Duration) {
        let mut state = self.state.lock();
        let now = Instant::now();
        state.last_activity = now;
        state.batches_since_throttle = state.batches_since_throttle.saturating_add(1);

        let duration_secs = duration.as_secs_f64().max(0.0);
        let alpha = self.config.batch_duration_smoothing_factor;
        state.duration_ema_seconds = Some(match state.duration_ema_seconds {
            Some(ema) => alpha * duration_secs + (1.0 - alpha) * ema,
            None => duration_secs,
        });
        state.sample_count = state.sample_count.saturating_add(1);

        if state.sample_count >= self.config.min_batch_samples_for_ceiling {
            self.recompute_derived_ceilings_locked(&mut state);
        }

        if let Some(ref lkg) = state.last_known_good {
            if now.duration_since(lkg.recorded_at) >= self.config.last_known_good_ttl {
                let current = state.current;
                state.last_known_good = Some(LastKnownGood {
                    value: current,
                    recorded_at: now,
                });
            }
        }

        self.try_additive_increase_locked(&mut state, now);
    }

    fn recompute_derived_ceilings_locked(&self, state: &mut ControllerState) {
        let Some(ema) = state.duration_ema_seconds else {
            return;
        };
        if ema <= 0.0 {
            return;
        }

        if Duration::from_secs_f64(ema) >= self.config.slow_batch_threshold {
            let raw = self.config.exec_time_factor / ema;
            state.exec_time_ceiling = Some(clamp_usize(raw, state.floor, state.hard_ceiling));
        } else {
            state.exec_time_ceiling = None;
        }

        let raw_rate = self.config.request_rate_factor * ema;
        state.request_rate_ceiling = Some(clamp_usize(raw_rate, state.floor, state.hard_ceiling));
    }

    /// Records a throttle signal, applying multiplicative decrease and a time-bounded
    /// throttle ceiling.
    pub fn record_throttle(&self, retry_after: Duration) {
        let mut state = self.state.lock();
        let now = Instant::now();
        state.last_activity = now;
        state.total_throttle_events = state.total_throttle_events.saturating_add(1);

        let lkg_value = state.current.saturating_sub(self.config.increase_step).max(state.floor);
        state.last_known_good = Some(LastKnownGood {
            value: lkg_value,
            recorded_at: now,
        });

        let five_minutes = Duration::from_secs(5 * 60);
        let overshoot = (retry_after.as_secs_f64() / five_minutes.as_secs_f64()).clamp(0.0, 1.0);
        let reduction_factor = (1.0 - overshoot / 2.0).clamp(0.5, 1.0);

        let ceiling_base = state
            .current
            .max(state.throttle_ceiling.as_ref().map(|c| c.value).unwrap_or(0));
        let throttle_ceiling_value =
            ((ceiling_base as f64 * reduction_factor).floor() as usize).max(state.floor);

        state.throttle_ceiling = Some(ThrottleCeiling {
            value: throttle_ceiling_value,
            expires_at: now + retry_after + Duration::from_secs(5 * 60),
        });

        let from = state.current;
        let decreased = ((state.current as f64) * self.config.decrease_factor).floor() as usize;
        state.current = decreased.max(state.floor);
        state.batches_since_throttle = 0;

        self.listeners.emit(&RateControlEvent::Throttled {
            pool_name: self.name.clone(),
            from,
            to: state.current,
            throttle_ceiling: throttle_ceiling_value,
            timestamp: now,
        });
    }

    fn try_additive_increase_locked(&self, state: &mut ControllerState, now: Instant) {
        if state.batches_since_throttle < self.config.stabilization_batches {
            return;
        }
        if now.duration_since(state.last_increase) < self.config.min_increase_interval {
            return;
        }

        let ceiling = self.effective_ceiling_locked(state, now);
        if state.current >= ceiling {
            return;
        }

        let recovering = state
            .last_known_good
            .as_ref()
            .map(|lkg| {
                state.current < lkg.value
                    && now.duration_since(lkg.recorded_at) < self.config.last_known_good_ttl
            })
            .unwrap_or(false);

        let base_step = self.config.increase_step.max(state.floor);
        let step = if recovering {
            ((base_step as f64) * self.config.recovery_multiplier).round() as usize
        } else {
            base_step
        };

        let from = state.current;
        state.current = (state.current + step).min(ceiling);
        if state.current != from {
            state.batches_since_throttle = 0;
            state.last_increase = now;
            self.listeners.emit(&RateControlEvent::Increased {
                pool_name: self.name.clone(),
                from,
                to: state.current,
                timestamp: now,
            });
        }
    }

    fn effective_ceiling_locked(&self, state: &ControllerState, now: Instant) -> usize {
        let mut ceiling = state.hard_ceiling;

        if let Some(ref tc) = state.throttle_ceiling {
            if now < tc.expires_at {
                ceiling = ceiling.min(tc.value);
            }
        }
        if let Some(rrc) = state.request_rate_ceiling {
            ceiling = ceiling.min(rrc);
        }
        if let Some(etc) = state.exec_time_ceiling {
            ceiling = ceiling.min(etc);
        }

        ceiling.max(state.floor)
    }

    /// A point-in-time snapshot of internal state, for tests and diagnostics.
    pub fn snapshot(&self) -> RateControllerSnapshot {
        let state = self.state.lock();
        let now = Instant::now();
        RateControllerSnapshot {
            current: state.current,
            floor: state.floor,
            hard_ceiling: state.hard_ceiling,
            effective_ceiling: self.effective_ceiling_locked(&state, now),
            batches_since_throttle: state.batches_since_throttle,
            total_throttle_events: state.total_throttle_events,
        }
    }
}

fn clamp_usize(value: f64, min: usize, max: usize) -> usize {
    if value.is_nan() || value < 0.0 {
        return min;
    }
    (value.floor() as usize).clamp(min, max)
}

/// A point-in-time view of [`AdaptiveRateController`] state, used by tests and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateControllerSnapshot {
    pub current: usize,
    pub floor: usize,
    pub hard_ceiling: usize,
    pub effective_ceiling: usize,
    pub batches_since_throttle: u32,
    pub total_throttle_events: u64,
}
