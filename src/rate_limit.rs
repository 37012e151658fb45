//! Proactive quota backoff
//!
//! GitHub enforces a rolling request quota (5000/hour for tokens). A full scan
//! of a couple hundred repositories costs a few thousand calls and cannot be
//! resumed, so the enumerator checks quota before every quota-consuming call and
//! waits for the window to reset once it drops below the threshold.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::hosting::{HostingApi, RateStatus};

pub const DEFAULT_THRESHOLD: u64 = 100;
pub const DEFAULT_BUFFER: Duration = Duration::from_secs(10);

/// Gate placed in front of every quota-consuming hosting call
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    threshold: u64,
    buffer: Duration,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            threshold: DEFAULT_THRESHOLD,
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn from_config(clock: Arc<dyn Clock>, config: &RateLimitConfig) -> Self {
        Self {
            clock,
            threshold: config.threshold,
            buffer: Duration::from_secs(config.buffer_secs),
        }
    }

    /// Make sure quota is available, sleeping until reset when it is not.
    ///
    /// Returns the remaining quota observed before any sleep. A failure to
    /// query the quota is propagated: nothing can proceed without it.
    pub async fn ensure_capacity(&self, api: &dyn HostingApi) -> Result<u64> {
        let status = api
            .rate_status()
            .await
            .context("Failed to query API rate limit")?;

        if let Some(wait) = self.backoff_for(&status) {
            warn!(
                "Rate limit low ({} remaining). Sleeping for {} seconds.",
                status.remaining,
                wait.as_secs()
            );
            self.clock.sleep(wait).await;
        } else {
            debug!("Rate limit ok: {} remaining", status.remaining);
        }

        Ok(status.remaining)
    }

    /// How long to wait for `status`, or `None` when quota is sufficient
    pub fn backoff_for(&self, status: &RateStatus) -> Option<Duration> {
        if status.remaining >= self.threshold {
            return None;
        }

        let until_reset = (status.reset_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        Some(until_reset + self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    struct FixedClock(DateTime<Utc>);

    #[async_trait]
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }

        async fn sleep(&self, _duration: Duration) {}
    }

    fn limiter() -> (RateLimiter, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2025, 7, 2, 15, 58, 0).unwrap();
        (RateLimiter::new(Arc::new(FixedClock(now))), now)
    }

    #[test]
    fn test_no_backoff_above_threshold() {
        let (limiter, now) = limiter();
        let status = RateStatus {
            remaining: 100,
            reset_at: now + chrono::Duration::seconds(30),
        };
        assert_eq!(limiter.backoff_for(&status), None);
    }

    #[test]
    fn test_backoff_until_reset_plus_buffer() {
        let (limiter, now) = limiter();
        let status = RateStatus {
            remaining: 50,
            reset_at: now + chrono::Duration::seconds(30),
        };
        assert_eq!(limiter.backoff_for(&status), Some(Duration::from_secs(40)));
    }

    #[test]
    fn test_backoff_when_reset_already_passed() {
        let (limiter, now) = limiter();
        let status = RateStatus {
            remaining: 0,
            reset_at: now - chrono::Duration::seconds(5),
        };
        assert_eq!(limiter.backoff_for(&status), Some(DEFAULT_BUFFER));
    }

    #[test]
    fn test_from_config() {
        let now = Utc.with_ymd_and_hms(2025, 7, 2, 0, 0, 0).unwrap();
        let config = RateLimitConfig {
            threshold: 500,
            buffer_secs: 1,
        };
        let limiter = RateLimiter::from_config(Arc::new(FixedClock(now)), &config);
        let status = RateStatus {
            remaining: 499,
            reset_at: now + chrono::Duration::seconds(9),
        };
        assert_eq!(limiter.backoff_for(&status), Some(Duration::from_secs(10)));
    }
}
