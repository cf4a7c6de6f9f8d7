//! Per-user flood control for inbound chat events.
//!
//! Each chat user holds an allowance of `flood_burst` events that refills
//! at `flood_rate` events per second. A user who runs dry is told how long
//! to wait before the next event would be accepted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use souq_shared::UserId;

use crate::config::ServerConfig;

/// What one user has left to spend.
#[derive(Debug, Clone)]
struct Allowance {
    credit: f64,
    last_seen: Instant,
}

impl Allowance {
    fn full(burst: f64, now: Instant) -> Self {
        Self {
            credit: burst,
            last_seen: now,
        }
    }

    /// Spend one event, or return how long until one is available.
    fn spend(&mut self, now: Instant, rate: f64, burst: f64) -> Result<(), Duration> {
        let idle = now.saturating_duration_since(self.last_seen).as_secs_f64();
        self.last_seen = now;
        self.credit = (self.credit + idle * rate).min(burst);

        if self.credit >= 1.0 {
            self.credit -= 1.0;
            Ok(())
        } else {
            Err(Duration::try_from_secs_f64((1.0 - self.credit) / rate).unwrap_or(Duration::MAX))
        }
    }
}

#[derive(Clone)]
pub struct FloodGuard {
    allowances: Arc<Mutex<HashMap<UserId, Allowance>>>,
    rate: f64,
    burst: f64,
    idle_ttl: Duration,
}

impl FloodGuard {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            allowances: Arc::new(Mutex::new(HashMap::new())),
            rate: config.flood_rate,
            burst: config.flood_burst,
            idle_ttl: config.flood_idle_ttl,
        }
    }

    /// Charge one event to `user_id`. `Err` carries the wait before the
    /// next event would be accepted.
    pub async fn check(&self, user_id: UserId) -> Result<(), Duration> {
        let now = Instant::now();
        let mut allowances = self.allowances.lock().await;
        let allowance = allowances
            .entry(user_id)
            .or_insert_with(|| Allowance::full(self.burst, now));
        allowance.spend(now, self.rate, self.burst)
    }

    /// Forget users idle for longer than the configured TTL. Their next
    /// event starts from a full allowance.
    pub async fn forget_idle(&self) -> usize {
        let now = Instant::now();
        let mut allowances = self.allowances.lock().await;
        let before = allowances.len();
        allowances.retain(|_, a| now.saturating_duration_since(a.last_seen) < self.idle_ttl);
        before - allowances.len()
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(rate: f64, burst: f64) -> FloodGuard {
        FloodGuard::from_config(&ServerConfig {
            flood_rate: rate,
            flood_burst: burst,
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn burst_comes_from_config() {
        let guard = guard(0.001, 3.0);
        for _ in 0..3 {
            assert!(guard.check(UserId(1)).await.is_ok());
        }
        assert!(guard.check(UserId(1)).await.is_err());
    }

    #[tokio::test]
    async fn throttled_user_is_told_when_to_retry() {
        let guard = guard(0.5, 1.0);
        assert!(guard.check(UserId(1)).await.is_ok());

        let wait = guard.check(UserId(1)).await.unwrap_err();
        // One event at half an event per second is about two seconds away.
        assert!(wait > Duration::from_millis(1900), "{wait:?}");
        assert!(wait <= Duration::from_secs(2), "{wait:?}");
    }

    #[tokio::test]
    async fn users_are_independent() {
        let guard = guard(0.001, 1.0);
        assert!(guard.check(UserId(1)).await.is_ok());
        assert!(guard.check(UserId(1)).await.is_err());
        assert!(guard.check(UserId(2)).await.is_ok());
    }

    #[test]
    fn allowance_refills_at_rate_up_to_burst() {
        let start = Instant::now();
        let mut allowance = Allowance::full(2.0, start);
        assert!(allowance.spend(start, 1.0, 2.0).is_ok());
        assert!(allowance.spend(start, 1.0, 2.0).is_ok());
        assert!(allowance.spend(start, 1.0, 2.0).is_err());

        // A long pause refills to the burst, not beyond it.
        let later = start + Duration::from_secs(60);
        assert!(allowance.spend(later, 1.0, 2.0).is_ok());
        assert!(allowance.spend(later, 1.0, 2.0).is_ok());
        assert!(allowance.spend(later, 1.0, 2.0).is_err());
    }

    #[tokio::test]
    async fn idle_users_are_forgotten() {
        let guard = FloodGuard::from_config(&ServerConfig {
            flood_idle_ttl: Duration::ZERO,
            ..ServerConfig::default()
        });
        assert!(guard.check(UserId(9)).await.is_ok());

        assert_eq!(guard.forget_idle().await, 1);
        assert!(guard.allowances.lock().await.is_empty());
    }
}
