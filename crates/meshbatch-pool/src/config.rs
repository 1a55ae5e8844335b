//! Configuration for [`crate::pool::ConnectionPool`].

use crate::events::PoolEvent;
use meshbatch_core::events::EventListeners;

/// Configuration for a connection pool over one (identity-set, endpoint).
pub struct PoolConfig {
    pub(crate) hard_ceiling_per_identity: usize,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }
}

/// Builder for [`PoolConfig`].
pub struct PoolConfigBuilder {
    hard_ceiling_per_identity: usize,
    name: String,
    event_listeners: EventListeners<PoolEvent>,
}

impl PoolConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            hard_ceiling_per_identity: 52,
            name: "pool".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the per-identity hard ceiling; the pool's absolute concurrency bound is this
    /// times the number of identities in the pool.
    ///
    /// Default: 52
    pub fn hard_ceiling_per_identity(mut self, max: usize) -> Self {
        self.hard_ceiling_per_identity = max;
        self
    }

    /// Sets this pool instance's name, used in events and logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a listener invoked on every checkout permitted.
    pub fn on_checkout_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(meshbatch_core::events::FnListener::new(move |event: &PoolEvent| {
                if matches!(event, PoolEvent::CheckoutPermitted { .. }) {
                    f(event);
                }
            }));
        self
    }

    /// Registers a listener invoked on every release.
    pub fn on_released<F>(mut self, f: F) -> Self
    where
        F: Fn(&PoolEvent) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(meshbatch_core::events::FnListener::new(move |event: &PoolEvent| {
                if matches!(event, PoolEvent::Released { .. }) {
                    f(event);
                }
            }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> PoolConfig {
        PoolConfig {
            hard_ceiling_per_identity: self.hard_ceiling_per_identity,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
