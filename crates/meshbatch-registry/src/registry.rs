//! Keyed, at-most-once-constructed cache of connection pools (spec §4.E).

use crate::error::RegistryError;
use crate::events::RegistryEvent;
use futures::future::BoxFuture;
use meshbatch_core::events::EventListeners;
use meshbatch_core::identity::{Endpoint, PoolKey};
use meshbatch_pool::ConnectionPool;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

type ConstructResult = Result<Arc<ConnectionPool>, RegistryError>;

/// Builds a new pool for a key. Called at most once concurrently per key; all callers racing
/// on the same key share the single in-flight construction.
pub type PoolConstructor =
    Arc<dyn Fn(PoolKey) -> BoxFuture<'static, ConstructResult> + Send + Sync>;

enum Entry {
    InFlight(broadcast::Sender<ConstructResult>),
    Ready(Arc<ConnectionPool>),
}

/// A concurrent map of `(identity-list, endpoint) -> Pool`, keyed by [`PoolKey`] (spec §4.E
/// `CachedPoolRegistry`).
///
/// The first caller for a new key starts construction; every other caller for that key awaits
/// the same in-flight attempt instead of racing a second construction. On construction
/// failure the key is removed so the next caller gets a fresh attempt rather than a cached
/// error.
pub struct CachedPoolRegistry {
    entries: Mutex<hashbrown::HashMap<PoolKey, Entry>>,
    constructor: PoolConstructor,
    listeners: EventListeners<RegistryEvent>,
}

impl CachedPoolRegistry {
    /// Creates an empty registry using `constructor` to build new pools.
    pub fn new(constructor: PoolConstructor) -> Self {
        Self {
            entries: Mutex::new(hashbrown::HashMap::new()),
            constructor,
            listeners: EventListeners::new(),
        }
    }

    /// Registers a listener for registry events.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: meshbatch_core::events::EventListener<RegistryEvent> + 'static,
    {
        self.listeners.add(listener);
    }

    /// Returns the pool for `key`, constructing it if this is the first request for it.
    pub async fn get_or_create(&self, key: PoolKey) -> ConstructResult {
        loop {
            enum Role {
                Cached(Arc<ConnectionPool>),
                Join(broadcast::Receiver<ConstructResult>),
                Lead(broadcast::Sender<ConstructResult>),
            }

            let role = {
                let mut entries = self.entries.lock();
                match entries.get(&key) {
                    Some(Entry::Ready(pool)) => Role::Cached(Arc::clone(pool)),
                    Some(Entry::InFlight(sender)) => Role::Join(sender.subscribe()),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        entries.insert(key.clone(), Entry::InFlight(sender.clone()));
                        Role::Lead(sender)
                    }
                }
            };

            match role {
                Role::Cached(pool) => return Ok(pool),
                Role::Join(mut receiver) => match receiver.recv().await {
                    Ok(result) => return result,
                    // Leader vanished (panicked) without resolving; retry as leader ourselves.
                    Err(_) => continue,
                },
                Role::Lead(sender) => return self.lead_construction(key, sender).await,
            }
        }
    }

    async fn lead_construction(&self, key: PoolKey, sender: broadcast::Sender<ConstructResult>) -> ConstructResult {
        let key_summary = format!("{:?}@{}", key.identity_names(), key.endpoint().url());
        self.listeners.emit(&RegistryEvent::ConstructionStarted {
            key_summary: key_summary.clone(),
            timestamp: Instant::now(),
        });

        let mut guard = LeaderGuard {
            entries: &self.entries,
            sender: sender.clone(),
            key: key.clone(),
            armed: false,
        };

        let result = (self.constructor)(key.clone()).await;

        {
            let mut entries = self.entries.lock();
            match &result {
                Ok(pool) => {
                    entries.insert(key.clone(), Entry::Ready(Arc::clone(pool)));
                }
                Err(_) => {
                    entries.remove(&key);
                }
            }
        }
        guard.armed = true;

        match &result {
            Ok(_) => self.listeners.emit(&RegistryEvent::ConstructionSucceeded {
                key_summary,
                timestamp: Instant::now(),
            }),
            Err(e) => self.listeners.emit(&RegistryEvent::ConstructionFailed {
                key_summary,
                message: e.to_string(),
                timestamp: Instant::now(),
            }),
        }

        let _ = sender.send(result.clone());
        result
    }

    /// Removes every key whose identity-list contains `name`, disposing the removed pools
    /// asynchronously.
    pub async fn invalidate_identity(&self, name: &str) {
        let name = name.to_string();
        self.invalidate_where(move |key| key.contains_identity(&name), "identity")
            .await;
    }

    /// Removes every key whose endpoint matches the normalized `url`.
    pub async fn invalidate_endpoint(&self, url: &str) {
        let normalized = Endpoint::new(url);
        self.invalidate_where(move |key| key.endpoint() == &normalized, "endpoint")
            .await;
    }

    /// Removes and disposes every entry, awaiting disposal before returning.
    pub async fn dispose_all(&self) {
        let removed: Vec<Entry> = {
            let mut entries = self.entries.lock();
            entries.drain().map(|(_, v)| v).collect()
        };
        let count = removed.len();
        let handle = tokio::spawn(async move { drop(removed) });
        let _ = handle.await;
        self.listeners.emit(&RegistryEvent::EntriesInvalidated {
            reason: "dispose_all".to_string(),
            count,
            timestamp: Instant::now(),
        });
    }

    async fn invalidate_where(&self, predicate: impl Fn(&PoolKey) -> bool, reason: &str) {
        let removed: Vec<Entry> = {
            let mut entries = self.entries.lock();
            let matching: Vec<PoolKey> = entries
                .keys()
                .filter(|key| predicate(key))
                .cloned()
                .collect();
            matching
                .into_iter()
                .filter_map(|key| entries.remove(&key))
                .collect()
        };
        let count = removed.len();
        let handle = tokio::spawn(async move { drop(removed) });
        let _ = handle.await;
        self.listeners.emit(&RegistryEvent::EntriesInvalidated {
            reason: reason.to_string(),
            count,
            timestamp: Instant::now(),
        });
    }
}

/// Ensures that if leader construction is cancelled (its future dropped) before the entry is
/// resolved, the `InFlight` placeholder is removed and joiners are released rather than left
/// awaiting a channel that will never send — mirrors the in-flight-cancels-on-drop discipline
/// used for singleflight request coalescing.
struct LeaderGuard<'a> {
    entries: &'a Mutex<hashbrown::HashMap<PoolKey, Entry>>,
    sender: broadcast::Sender<ConstructResult>,
    key: PoolKey,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            self.entries.lock().remove(&self.key);
            let _ = self.sender.send(Err(RegistryError::ConstructionCancelled));
        }
    }
}
