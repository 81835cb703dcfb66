//! Process-local fixed-window rate limiter.
//!
//! Counts requests per client key inside a window; the counter resets when
//! the window elapses. State lives in this process only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of an admitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Maximum requests per window
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

/// Thread-safe rate limiter using dashmap
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a request from `key`.
    ///
    /// Returns `Err(retry_after_seconds)` once the window's budget is spent.
    pub fn check(&self, key: &str) -> Result<RateLimitInfo, u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<RateLimitInfo, u64> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: now,
            });

        let mut elapsed = now.saturating_duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.count = 0;
            entry.window_start = now;
            elapsed = Duration::ZERO;
        }

        let reset_after = self.window.saturating_sub(elapsed).as_secs().max(1);

        if entry.count >= self.max_requests {
            return Err(reset_after);
        }

        entry.count += 1;
        Ok(RateLimitInfo {
            limit: self.max_requests,
            remaining: self.max_requests - entry.count,
            reset_after,
        })
    }

    /// Drop entries whose window has elapsed.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < self.window);
    }

    /// Number of tracked clients
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Spawn a background task that periodically evicts expired entries.
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    let period = rate_limiter.window().max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                entries = rate_limiter.entry_count(),
                "Rate limiter cleanup complete"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_requests_under_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let info = limiter.check("10.0.0.1").unwrap();
            assert_eq!(info.remaining, expected_remaining);
            assert_eq!(info.limit, 3);
        }
    }

    #[test]
    fn test_blocks_after_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let _ = limiter.check("10.0.0.1");
        let _ = limiter.check("10.0.0.1");

        let retry_after = limiter.check("10.0.0.1").unwrap_err();
        assert!(retry_after > 0 && retry_after <= 60);
    }

    #[test]
    fn test_different_clients_have_separate_limits() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());
        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("c", start).is_ok());
        assert!(limiter.check_at("c", start + Duration::from_secs(30)).is_err());
        assert!(limiter.check_at("c", start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_live_entries() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let _ = limiter.check("c");
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_cleanup_drops_expired_entries() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        let _ = limiter.check("c");
        std::thread::sleep(Duration::from_millis(20));
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 0);
    }
}
