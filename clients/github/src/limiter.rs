use async_trait::async_trait;
use chrono::Utc;
use contributors::api::{Budget, Error, RateState, Result};
use log::debug;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Longest accepted wait for a quota reset.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

/// Keeps the latest reported rate state and sleeps until reset when the budget runs out.
pub struct RateLimiter {
    rate: Arc<Mutex<Option<RateState>>>,
    max_wait: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(MAX_WAIT)
    }
}

impl RateLimiter {
    pub fn new(max_wait: Duration) -> Self {
        RateLimiter {
            rate: Arc::new(Mutex::new(None)),
            max_wait,
        }
    }

    pub async fn rate(&self) -> Option<RateState> {
        *self.rate.lock().await
    }

    async fn time_to_wait(&self, min_calls: i64) -> Result<Option<Duration>> {
        let rate = match *self.rate.lock().await {
            Some(rate) => rate,
            None => return Ok(None),
        };
        if rate.remaining >= min_calls {
            debug!("Remaining limit {}. Not waiting.", rate.remaining);
            return Ok(None);
        }
        let until_reset = (rate.reset_at - Utc::now()).num_seconds().max(0) as u64;
        let delay = Duration::from_secs(until_reset + 1);
        if delay > self.max_wait + Duration::from_secs(1) {
            return Err(Error::BudgetExhausted(format!(
                "{} call(s) remaining, reset in {} sec is too far away",
                rate.remaining, until_reset
            )));
        }
        Ok(Some(delay))
    }
}

#[async_trait]
impl Budget for RateLimiter {
    async fn ensure_budget(&self, min_calls: i64) -> Result<()> {
        if let Some(delay) = self.time_to_wait(min_calls).await? {
            info!("Rate limiting wait: {} sec", delay.as_secs());
            tokio::time::sleep(delay).await;
            if let Some(rate) = self.rate.lock().await.as_mut() {
                debug!("Reset passed. Resetting remaining to limit.");
                rate.remaining = rate.limit;
            }
        }
        Ok(())
    }

    async fn observe(&self, rate: &RateState) -> Result<()> {
        if rate.remaining < 0 {
            return Err(Error::BudgetExhausted(format!("negative remaining quota ({})", rate.remaining)));
        }
        let until_reset = (rate.reset_at - Utc::now()).num_seconds();
        if until_reset > self.max_wait.as_secs() as i64 {
            return Err(Error::BudgetExhausted(format!(
                "quota reset at {} is more than {} sec away",
                rate.reset_at,
                self.max_wait.as_secs()
            )));
        }
        *self.rate.lock().await = Some(*rate);
        debug!("Updated limits: {:?}", rate);
        Ok(())
    }
}
