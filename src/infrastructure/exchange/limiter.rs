//! Per-account request budget using Governor (GCRA).
//!
//! Each account may burst `limit` calls, then earns one call back every
//! `window / limit`. A caller over budget is suspended until a cell frees
//! instead of failing.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter as GovernorLimiter};
use tracing::debug;

use crate::domain::AccountId;
use crate::infrastructure::config::workers::RateLimitConfig;

type KeyedLimiter = GovernorLimiter<AccountId, DashMapStateStore<AccountId>, DefaultClock>;

pub struct RateLimiter {
    limiter: KeyedLimiter,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .map_or_else(|| Quota::per_second(burst), |quota| quota.allow_burst(burst));
        Self {
            limiter: GovernorLimiter::dashmap(quota),
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, config.window())
    }

    /// Take one call from the account's budget if any is left.
    pub fn try_acquire(&self, account: &AccountId) -> bool {
        self.limiter.check_key(account).is_ok()
    }

    /// Wait until the account has budget left, then take one call.
    pub async fn acquire(&self, account: &AccountId) {
        if self.try_acquire(account) {
            return;
        }
        debug!(account = %account, "Rate limit reached, waiting");
        self.limiter.until_key_ready(account).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn budget_is_per_account() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let (a, b) = (AccountId::new("a"), AccountId::new("b"));

        assert!(limiter.try_acquire(&a));
        assert!(limiter.try_acquire(&a));
        assert!(!limiter.try_acquire(&a));
        assert!(limiter.try_acquire(&b));
    }

    #[tokio::test]
    async fn exhausted_budget_suspends_until_a_cell_frees() {
        let limiter = RateLimiter::new(1, Duration::from_millis(200));
        let account = AccountId::new("a");
        let start = Instant::now();

        limiter.acquire(&account).await;
        limiter.acquire(&account).await;

        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn zero_limit_still_allows_one_call() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        let account = AccountId::new("a");
        assert!(limiter.try_acquire(&account));
        assert!(!limiter.try_acquire(&account));
    }
}
