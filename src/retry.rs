//! Bounded retry loop for gateway requests.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::gateway::GatewayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay grows linearly with the number of failures so far.
    Escalating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// `failures` is 1-based: the delay slept after the first failed attempt is `delay_for(1)`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Escalating => self.delay.saturating_mul(failures.max(1)),
        }
    }
}

pub(crate) async fn retry_async<T, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut op: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                error!(
                    component = "gateway",
                    event = "gateway.exhausted",
                    url,
                    attempts,
                    error = %err
                );
                return Err(GatewayError::Exhausted {
                    url: url.to_string(),
                    attempts,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    component = "gateway",
                    event = "gateway.retry",
                    url,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transport(url: &str) -> GatewayError {
        GatewayError::Transport {
            url: url.to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[test]
    fn fixed_backoff_keeps_delay_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(5));
    }

    #[test]
    fn escalating_backoff_grows_with_failures() {
        let policy = RetryPolicy {
            attempts: 4,
            delay: Duration::from_millis(250),
            backoff: Backoff::Escalating,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));

        let value = retry_async(&policy, "http://gw/companies/", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(transport("http://gw/companies/"))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_wraps_last_error_and_skips_final_sleep() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        let err = retry_async::<(), _, _>(&policy, "http://gw/analysis/SNTS", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transport("http://gw/analysis/SNTS"))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        match err {
            GatewayError::Exhausted {
                attempts, last, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, GatewayError::Transport { .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_policy_never_sleeps() {
        let policy = RetryPolicy::fixed(1, Duration::from_secs(60));
        let started = tokio::time::Instant::now();

        let err = retry_async::<(), _, _>(&policy, "http://gw/screener/", || async {
            Err(transport("http://gw/screener/"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::Exhausted { attempts: 1, .. }));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
