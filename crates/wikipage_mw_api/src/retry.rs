use crate::error::MwApiError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;
use wikipage_domain::profile::ThrottlePolicy;

/// Exponential backoff for transient transport failures (lag, rate limits,
/// unavailable backends, network errors).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_secs(2), max_delay: Duration::from_secs(60) }
    }
}

impl RetryPolicy {
    pub fn from_throttle(policy: &ThrottlePolicy) -> Self {
        Self { max_retries: policy.max_retries, base_delay: policy.backoff_base, ..Default::default() }
    }

    fn delay_for(&self, attempt: u32, err: &MwApiError) -> Duration {
        let backoff = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let hinted = match err {
            MwApiError::MaxLag { retry_after } | MwApiError::RateLimited { retry_after } => *retry_after as f64,
            _ => 0.0,
        };
        Duration::from_secs_f64(backoff.max(hinted).min(self.max_delay.as_secs_f64()))
    }

    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, MwApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MwApiError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(val) => return Ok(val),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt, &e);
                    warn!(attempt, ?delay, error = %e, "Retrying after transient error");
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5) }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(MwApiError::ServiceUnavailable)
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(2)
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MwApiError::ServiceUnavailable)
            })
            .await;
        assert!(matches!(result, Err(MwApiError::ServiceUnavailable)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_token_is_returned_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(MwApiError::api("badtoken", "Invalid token"))
            })
            .await;
        assert!(result.unwrap_err().is_bad_token());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped_and_honours_hint() {
        let policy = fast_policy(3);
        let delay = policy.delay_for(0, &MwApiError::MaxLag { retry_after: 30 });
        assert_eq!(delay, Duration::from_millis(5));

        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(60) };
        assert_eq!(policy.delay_for(0, &MwApiError::MaxLag { retry_after: 7 }), Duration::from_secs(7));
        assert_eq!(policy.delay_for(2, &MwApiError::ServiceUnavailable), Duration::from_secs(4));
    }
}
