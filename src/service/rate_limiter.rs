use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Identifier shared by every client whose address could not be determined.
/// All such clients count against the same bucket.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateLimitRecord {
    count: u32,
    window_reset_at: Instant,
}

/// Fixed-window request counter keyed by client identifier.
///
/// The whole read-modify-write runs under one lock so simultaneous requests
/// from the same identifier cannot undercount. State is per-process only.
#[derive(Clone, Default)]
pub struct RateLimiter {
    clients: Arc<Mutex<HashMap<String, RateLimitRecord>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the request is allowed and counts it.
    pub fn allow(&self, identifier: &str, limit: u32, window: Duration) -> bool {
        self.allow_at(identifier, limit, window, Instant::now())
    }

    fn allow_at(&self, identifier: &str, limit: u32, window: Duration, now: Instant) -> bool {
        let mut clients = self.lock();

        if let Some(record) = clients.get(identifier) {
            if now > record.window_reset_at {
                clients.remove(identifier);
            }
        }

        match clients.get_mut(identifier) {
            None => {
                clients.insert(
                    identifier.to_string(),
                    RateLimitRecord {
                        count: 1,
                        window_reset_at: now + window,
                    },
                );
                true
            }
            Some(record) if record.count >= limit => false,
            Some(record) => {
                record.count += 1;
                true
            }
        }
    }

    /// Drops every record whose window has already closed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    fn prune_expired_at(&self, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, record| now <= record.window_reset_at);
        before - clients.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        // A panic while holding the lock cannot leave a record half-written.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn denies_after_limit_within_window() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..3 {
            assert!(limiter.allow_at("1.2.3.4", 3, WINDOW, start), "call {i} should pass");
        }
        assert!(!limiter.allow_at("1.2.3.4", 3, WINDOW, start));
        assert!(!limiter.allow_at("1.2.3.4", 3, WINDOW, start + Duration::from_secs(59)));
    }

    #[test]
    fn allows_again_once_window_has_passed() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        assert!(limiter.allow_at("1.2.3.4", 1, WINDOW, start));
        assert!(!limiter.allow_at("1.2.3.4", 1, WINDOW, start + WINDOW));
        assert!(limiter.allow_at("1.2.3.4", 1, WINDOW, start + WINDOW + Duration::from_millis(1)));
        // The fresh window counts the request that reopened it.
        assert!(!limiter.allow_at("1.2.3.4", 1, WINDOW, start + WINDOW + Duration::from_millis(2)));
    }

    #[test]
    fn identifiers_are_counted_independently() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.allow_at("a", 1, WINDOW, now));
        assert!(!limiter.allow_at("a", 1, WINDOW, now));
        assert!(limiter.allow_at("b", 1, WINDOW, now));
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[test]
    fn unknown_clients_share_one_bucket() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.allow_at(UNKNOWN_CLIENT, 2, WINDOW, now));
        assert!(limiter.allow_at(UNKNOWN_CLIENT, 2, WINDOW, now));
        assert!(!limiter.allow_at(UNKNOWN_CLIENT, 2, WINDOW, now));
    }

    #[test]
    fn zero_limit_still_admits_the_opening_request() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.allow_at("x", 0, WINDOW, now));
        assert!(!limiter.allow_at("x", 0, WINDOW, now));
    }

    #[test]
    fn prune_removes_only_expired_records() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter.allow_at("old", 5, Duration::from_secs(1), start);
        limiter.allow_at("fresh", 5, WINDOW, start);

        let removed = limiter.prune_expired_at(start + Duration::from_secs(2));
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn concurrent_callers_never_exceed_limit() {
        let limiter = RateLimiter::new();
        let allowed = std::sync::atomic::AtomicU32::new(0);

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..25 {
                        if limiter.allow("shared", 50, WINDOW) {
                            allowed.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(allowed.into_inner(), 50);
    }
}
