//! Per-identity cooldown tracking (spec §4.B).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Instant;

/// Records, per identity, the earliest time at which work may resume.
///
/// Expiry is compared against a monotonic clock (`Instant`), never wall-clock time, so
/// cooldowns are unaffected by system clock adjustments. The pool filters candidates by
/// [`ThrottleTracker::is_available`] at checkout time; nothing here polls on a timer.
pub struct ThrottleTracker {
    cooldowns: Mutex<HashMap<String, Instant>>,
}

impl ThrottleTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// True if `identity` has no active cooldown.
    pub fn is_available(&self, identity: &str) -> bool {
        let cooldowns = self.cooldowns.lock();
        match cooldowns.get(identity) {
            Some(until) => Instant::now() >= *until,
            None => true,
        }
    }

    /// Records that `identity` may not be used again until `until`.
    pub fn record_cooldown(&self, identity: &str, until: Instant) {
        let mut cooldowns = self.cooldowns.lock();
        cooldowns
            .entry(identity.to_string())
            .and_modify(|existing| {
                if until > *existing {
                    *existing = until;
                }
            })
            .or_insert(until);
    }

    /// Number of identities currently tracked, expired or not. Exposed for tests and metrics.
    pub fn tracked_count(&self) -> usize {
        self.cooldowns.lock().len()
    }
}

impl Default for ThrottleTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn identity_with_no_record_is_available() {
        let tracker = ThrottleTracker::new();
        assert!(tracker.is_available("svc-a"));
    }

    #[test]
    fn identity_under_cooldown_is_unavailable() {
        let tracker = ThrottleTracker::new();
        tracker.record_cooldown("svc-a", Instant::now() + Duration::from_secs(60));
        assert!(!tracker.is_available("svc-a"));
    }

    #[test]
    fn expired_cooldown_is_available_again() {
        let tracker = ThrottleTracker::new();
        tracker.record_cooldown("svc-a", Instant::now() - Duration::from_secs(1));
        assert!(tracker.is_available("svc-a"));
    }

    #[test]
    fn later_cooldown_does_not_shrink_an_existing_longer_one() {
        let tracker = ThrottleTracker::new();
        let far_future = Instant::now() + Duration::from_secs(300);
        tracker.record_cooldown("svc-a", far_future);
        tracker.record_cooldown("svc-a", Instant::now() + Duration::from_secs(1));
        assert!(!tracker.is_available("svc-a"));
    }
}
