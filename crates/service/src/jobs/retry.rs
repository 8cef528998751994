use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::ServiceError;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff_base, backoff_max }
    }

    pub fn from_config(cfg: &configs::JobsConfig) -> Self {
        Self::new(
            cfg.retry_max_attempts,
            Duration::from_millis(cfg.backoff_base_ms),
            Duration::from_millis(cfg.backoff_max_ms),
        )
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self { Self::new(1, Duration::ZERO, Duration::ZERO) }

    pub fn max_attempts(&self) -> u32 { self.max_attempts }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    pub async fn wait_before_retry(&self, attempt: u32) {
        let delay = self.backoff(attempt);
        debug!("Retrying in {:?} (attempt {})", delay, attempt);
        sleep(delay).await;
    }

    /// Only storage failures are transient; validation and lookup errors repeat identically.
    pub fn should_retry(&self, attempt: u32, error: &ServiceError) -> bool {
        if attempt >= self.max_attempts {
            debug!("Max retry attempts ({}) reached", self.max_attempts);
            return false;
        }
        matches!(error, ServiceError::Db(_) | ServiceError::Model(models::errors::ModelError::Db(_)))
    }
}

pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("Operation succeeded after {} retries", attempt - 1);
                }
                return Ok(result);
            }
            Err(error) => {
                warn!("Operation failed on attempt {}: {}", attempt, error);
                if !policy.should_retry(attempt, &error) {
                    return Err(error);
                }
                policy.wait_before_retry(attempt).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max: u32) -> RetryPolicy { RetryPolicy::new(max, Duration::from_millis(1), Duration::from_millis(5)) }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_with_policy(&fast(3), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ServiceError::Db("connection reset".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_at_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result: Result<(), _> = retry_with_policy(&fast(2), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Db("down".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_storage_errors_are_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result: Result<(), _> = retry_with_policy(&fast(5), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::Validation("bad input".into()))
            }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
