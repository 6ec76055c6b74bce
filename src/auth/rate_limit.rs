use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    /// Requests allowed per window, keyed by `users.rate_limit_tier`.
    pub limits: HashMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut limits = HashMap::new();
        limits.insert("standard".to_string(), 120);
        limits.insert("premium".to_string(), 600);

        Self {
            window_size: Duration::minutes(1),
            limits,
        }
    }
}

/// Sliding-window request limiter keyed by user id. Unknown tiers fall back
/// to the standard limit.
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<Uuid, Vec<DateTime<Utc>>>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn check_rate_limit(&self, user_id: Uuid, tier: &str) -> bool {
        let cutoff = Utc::now() - self.config.window_size;
        let mut windows = self.windows.write().await;

        let window = windows.entry(user_id).or_default();
        window.retain(|ts| *ts > cutoff);

        let limit = self
            .config
            .limits
            .get(tier)
            .or_else(|| self.config.limits.get("standard"))
            .copied()
            .unwrap_or(0);

        if window.len() < limit as usize {
            window.push(Utc::now());
            true
        } else {
            false
        }
    }

    /// Drops windows with no requests inside the current window.
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.config.window_size;
        let mut windows = self.windows.write().await;

        windows.retain(|_, window| {
            window.retain(|ts| *ts > cutoff);
            !window.is_empty()
        });
    }

    pub async fn tracked_users(&self) -> usize {
        self.windows.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test]
    async fn test_rate_limiter_enforces_window() {
        let mut config = RateLimitConfig::default();
        config.window_size = Duration::seconds(1);
        config.limits.insert("standard".to_string(), 5);
        let limiter = RateLimiter::new(config);
        let user_id = Uuid::new_v4();

        for _ in 0..5 {
            assert!(limiter.check_rate_limit(user_id, "standard").await);
        }
        assert!(!limiter.check_rate_limit(user_id, "standard").await);

        // Wait for the window to slide past
        sleep(TokioDuration::from_millis(1100)).await;
        assert!(limiter.check_rate_limit(user_id, "standard").await);
    }

    #[tokio::test]
    async fn test_unknown_tier_uses_standard_limit() {
        let mut config = RateLimitConfig::default();
        config.limits.insert("standard".to_string(), 2);
        let limiter = RateLimiter::new(config);
        let user_id = Uuid::new_v4();

        assert!(limiter.check_rate_limit(user_id, "mystery").await);
        assert!(limiter.check_rate_limit(user_id, "mystery").await);
        assert!(!limiter.check_rate_limit(user_id, "mystery").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_windows() {
        let mut config = RateLimitConfig::default();
        config.window_size = Duration::seconds(1);
        let limiter = RateLimiter::new(config);

        limiter.check_rate_limit(Uuid::new_v4(), "standard").await;
        assert_eq!(limiter.tracked_users().await, 1);

        sleep(TokioDuration::from_millis(1100)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_users().await, 0);
    }
}
