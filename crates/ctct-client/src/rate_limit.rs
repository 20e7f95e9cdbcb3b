//! Process-wide request rate limiting.
//!
//! Constant Contact enforces its request budget per account, so every clone
//! of a client shares one [`RateLimiter`]. Callers wait for capacity instead
//! of failing.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Configuration for rate limiting behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum requests per second (vendor default: 4).
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_second() -> u32 {
    4
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            requests_per_second,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Token bucket refilled continuously at `refill_rate` tokens per second.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(tokens_per_second: u32) -> Self {
        let rate = f64::from(tokens_per_second.max(1));
        Self {
            tokens: rate,
            max_tokens: rate,
            refill_rate: rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Take a token, or report how long until one is available.
    fn try_acquire(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let needed = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(needed / self.refill_rate))
        }
    }
}

/// Shared token-bucket limiter. Cloning shares the bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    bucket: Arc<Mutex<TokenBucket>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = TokenBucket::new(config.requests_per_second);
        Self {
            config,
            bucket: Arc::new(Mutex::new(bucket)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        if !self.config.enabled {
            return;
        }
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                bucket.try_acquire().err()
            };
            match wait {
                None => {
                    trace!("Rate limit token acquired");
                    return;
                }
                Some(wait) => {
                    trace!(wait_ms = wait.as_millis() as u64, "Waiting for rate limit token");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Parse a `Retry-After` header value given in seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
