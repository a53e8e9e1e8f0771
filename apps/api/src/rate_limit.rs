//! Fixed-window rate limiting keyed by client IP.
//!
//! Uses Redis (INCR + EXPIRE) when configured so limits hold across
//! replicas; falls back to an in-process window map otherwise, and on any
//! Redis error. The fallback is advisory traffic shaping only — no
//! entitlement state ever lives in process memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use redis::AsyncCommands;
use tracing::warn;

use crate::errors::AppError;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    count: u32,
    reset_at: Instant,
}

pub struct RateLimiter {
    redis: Option<redis::Client>,
    fallback: Mutex<HashMap<String, Window>>,
    window: Duration,
}

impl RateLimiter {
    pub fn new(redis: Option<redis::Client>) -> Self {
        Self {
            redis,
            fallback: Mutex::new(HashMap::new()),
            window: WINDOW,
        }
    }

    #[cfg(test)]
    fn with_window(window: Duration) -> Self {
        Self {
            redis: None,
            fallback: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Errors with `RateLimited` when `key` has exceeded `limit` calls in
    /// the current window; otherwise records the call and returns Ok.
    pub async fn check(&self, key: &str, limit: u32) -> Result<(), AppError> {
        if let Some(client) = &self.redis {
            match self.check_redis(client, key, limit).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!("Redis rate limit error, falling back to in-memory: {e}");
                }
            }
        }
        self.check_in_memory(key, limit)
    }

    async fn check_redis(
        &self,
        client: &redis::Client,
        key: &str,
        limit: u32,
    ) -> redis::RedisResult<Result<(), AppError>> {
        let mut conn = client.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(key, 1u32).await?;
        if count == 1 {
            let _: () = conn.expire(key, self.window.as_secs() as i64).await?;
        }

        if count > limit {
            let ttl: i64 = conn.ttl(key).await?;
            return Ok(Err(AppError::RateLimited {
                retry_after: ttl.max(1) as u64,
            }));
        }
        Ok(Ok(()))
    }

    fn check_in_memory(&self, key: &str, limit: u32) -> Result<(), AppError> {
        let now = Instant::now();
        let mut windows = self.fallback.lock().expect("rate limit map poisoned");

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if now > window.reset_at {
            window.count = 0;
            window.reset_at = now + self.window;
        }

        if window.count >= limit {
            let retry_after = window.reset_at.saturating_duration_since(now).as_secs();
            return Err(AppError::RateLimited {
                retry_after: retry_after.max(1),
            });
        }

        window.count += 1;
        Ok(())
    }
}

/// Client IP from proxy headers, for rate-limit keying only.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.trim().to_string();
    }
    "127.0.0.1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(None);
        for _ in 0..10 {
            assert!(limiter.check("analyze:1.2.3.4", 10).await.is_ok());
        }
        let err = limiter.check("analyze:1.2.3.4", 10).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(None);
        assert!(limiter.check("analyze:a", 1).await.is_ok());
        assert!(limiter.check("analyze:a", 1).await.is_err());
        assert!(limiter.check("analyze:b", 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::with_window(Duration::from_millis(20));
        assert!(limiter.check("k", 1).await.is_ok());
        assert!(limiter.check("k", 1).await.is_err());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(limiter.check("k", 1).await.is_ok());
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_falls_back_to_real_ip_then_loopback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.2");
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }
}
