//! Bounded exponential-backoff retry for venue calls.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::core::config::HttpConfig;
use crate::core::{Error, Result};

/// Retry bounds. `max_attempts` counts the first try.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
        }
    }
}

impl From<&HttpConfig> for RetryConfig {
    fn from(http: &HttpConfig) -> Self {
        Self {
            max_attempts: http.max_attempts.max(1),
            initial_delay: Duration::from_millis(http.initial_backoff_ms),
            max_delay: Duration::from_millis(http.max_backoff_ms),
            ..Self::default()
        }
    }
}

impl RetryConfig {
    /// No sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_factor: 2.0,
        }
    }

    /// Delay after the given failed attempt (0-indexed), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Run `op` until it succeeds, fails permanently, or the attempt bound is hit.
///
/// `op` receives the 1-based attempt number and must rebuild its request on
/// every call (signed requests need a fresh nonce). Only
/// [`Error::is_transient`] errors are retried.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay = config.delay_for_attempt(attempt - 1);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "{} failed, backing off",
                    label
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last_error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_from_half_second() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0).as_millis(), 500);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 2000);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(5).as_millis(), 5000);
    }

    #[test]
    fn test_from_http_config() {
        let config = RetryConfig::from(&HttpConfig::default());
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::immediate(3), "test", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(Error::Transport("timeout".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&RetryConfig::immediate(3), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(Error::Venue("EGeneral:Invalid arguments".into())) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Venue(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&RetryConfig::immediate(3), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(Error::Http {
                    status: 503,
                    body: "unavailable".into(),
                })
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
