//! Observability event system shared by every meshbatch subsystem.
//!
//! Every component (pool, rate controller, registry, executor, query engine) emits a
//! component-specific event enum through this shared listener machinery instead of a
//! stringly-typed progress callback.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a meshbatch component.
pub trait MeshEvent: Send + Sync + fmt::Debug {
    /// Machine-readable event kind, e.g. "checkout_permitted".
    fn event_kind(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// Name of the component instance that emitted this event (pool name, script name, ...).
    fn source_name(&self) -> &str;
}

/// Listens for events of a given type.
pub trait EventListener<E: MeshEvent>: Send + Sync {
    /// Called synchronously when an event occurs.
    fn on_event(&self, event: &E);
}

/// Boxed listener handle.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of listeners for one event type.
#[derive(Clone)]
pub struct EventListeners<E: MeshEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: MeshEvent> EventListeners<E> {
    /// Creates an empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Registers a listener.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every registered listener.
    ///
    /// A panicking listener is caught and logged/counted so that one misbehaving
    /// observer cannot prevent the others from running or poison the caller's task.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(feature = "metrics")]
                record_listener_panic_metric(event);

                #[cfg(not(feature = "tracing"))]
                let _ = index;

                #[cfg(not(any(feature = "tracing", feature = "metrics")))]
                let _ = _panic_payload;
            }
        }
    }

    /// True if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: MeshEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A closure-backed listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps a closure as a listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: MeshEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: MeshEvent>(index: usize, event: &E, panic_payload: &(dyn Any + Send)) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        source = event.source_name(),
        event_kind = event.event_kind(),
        panic_message = %panic_message,
        "meshbatch event listener panicked"
    );
}

#[cfg(feature = "metrics")]
fn record_listener_panic_metric<E: MeshEvent>(event: &E) {
    metrics::counter!(
        "meshbatch_event_listener_panics_total",
        "source" => event.source_name().to_string(),
        "event_kind" => event.event_kind().to_string()
    )
    .increment(1);
}
