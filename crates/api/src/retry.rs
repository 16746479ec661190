use crate::error::{ApiError, Result};
use backoff::{backoff::Backoff, ExponentialBackoff};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

/// Tuning for the rate-limit retry loop.
///
/// The delay before zero-indexed retry `n` is
/// `min(base_delay * 2^n, max_delay)` perturbed by `randomization_factor`
/// in both directions.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            randomization_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// Exponential delay for `attempt`, capped at `max_delay`, before jitter.
    pub fn capped_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.min(i32::MAX as usize) as i32;
        let raw = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Jittered delay for the zero-indexed retry `attempt`.
    pub fn calculate_backoff(&self, attempt: usize) -> Duration {
        let interval = self.capped_delay(attempt);
        let mut backoff = ExponentialBackoff {
            current_interval: interval,
            initial_interval: interval,
            randomization_factor: self.randomization_factor,
            multiplier: 1.0,
            max_interval: interval,
            max_elapsed_time: None,
            ..Default::default()
        };
        backoff.next_backoff().unwrap_or(interval)
    }
}

/// Parse a `Retry-After` header value.
///
/// Accepts delta-seconds first, then an HTTP-date (IMF-fixdate, RFC 850 or
/// asctime). Dates that are not in the future and unparsable values yield
/// `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = parse_http_date(value)?;
    let delta = date - now;
    if delta <= chrono::Duration::zero() {
        return None;
    }
    delta.to_std().ok()
}

/// Obsolete HTTP-date layouts still accepted from servers, both in GMT.
const LEGACY_HTTP_DATE_FORMATS: [&str; 2] = [
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date.with_timezone(&Utc));
    }

    LEGACY_HTTP_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Run `operation`, retrying while it reports [`ApiError::RateLimitExceeded`].
///
/// Any other outcome is returned as-is. Once `max_retries` retries have all
/// been rate limited the call fails with [`ApiError::RateLimitExhausted`].
pub async fn retry_on_rate_limit<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        debug!(attempt = retries + 1, "Executing request");

        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    debug!(retries, "Request succeeded after retries");
                }
                return Ok(result);
            }
            Err(ApiError::RateLimitExceeded { retry_after }) => {
                if retries >= config.max_retries {
                    warn!(retries, "Rate limit persisted through all retries");
                    return Err(ApiError::RateLimitExhausted { retries });
                }

                let (wait, source) = match retry_after {
                    Some(hint) => (hint, "retry-after"),
                    None => (config.calculate_backoff(retries), "backoff"),
                };
                warn!(
                    attempt = retries + 1,
                    wait_ms = wait.as_millis() as u64,
                    source,
                    "Rate limited, retrying"
                );
                tokio::time::sleep(wait).await;
                retries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    #[test]
    fn test_capped_delay_doubles_until_max() {
        let config = RetryConfig::default();
        assert_eq!(config.capped_delay(0), Duration::from_secs(1));
        assert_eq!(config.capped_delay(1), Duration::from_secs(2));
        assert_eq!(config.capped_delay(3), Duration::from_secs(8));
        assert_eq!(config.capped_delay(5), Duration::from_secs(30));
        assert_eq!(config.capped_delay(500), Duration::from_secs(30));
    }

    #[test]
    fn test_calculate_backoff_within_jitter_bounds() {
        let config = RetryConfig::default();
        for attempt in 0..=3 {
            let expected = config.capped_delay(attempt).as_secs_f64();
            for _ in 0..200 {
                let delay = config.calculate_backoff(attempt).as_secs_f64();
                assert!(
                    delay >= expected * 0.8 - 1e-6 && delay <= expected * 1.2 + 1e-6,
                    "attempt {attempt}: {delay} outside [{}, {}]",
                    expected * 0.8,
                    expected * 1.2
                );
            }
        }
    }

    #[test]
    fn test_calculate_backoff_respects_max() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.calculate_backoff(10);
            assert!(delay <= Duration::from_secs(36));
            assert!(delay >= Duration::from_secs(24));
        }
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(
            parse_retry_after("5", Utc::now()),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            parse_retry_after(" 0 ", Utc::now()),
            Some(Duration::from_secs(0))
        );
    }

    #[test]
    fn test_parse_retry_after_future_date() {
        let now = Utc::now();
        let header = (now + chrono::Duration::seconds(5))
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let delay = parse_retry_after(&header, now).unwrap();
        assert!(delay >= Duration::from_secs(4) && delay <= Duration::from_secs(6));
    }

    #[test]
    fn test_parse_retry_after_legacy_date_formats() {
        let now = DateTime::parse_from_rfc2822("Sun, 06 Nov 1994 08:49:30 GMT")
            .unwrap()
            .with_timezone(&Utc);

        for header in [
            "Sun, 06 Nov 1994 08:49:37 GMT",
            "Sunday, 06-Nov-94 08:49:37 GMT",
            "Sun Nov  6 08:49:37 1994",
        ] {
            assert_eq!(
                parse_retry_after(header, now),
                Some(Duration::from_secs(7)),
                "{header}"
            );
        }
    }

    #[test]
    fn test_parse_retry_after_past_date_is_no_hint() {
        let now = Utc::now();
        let header = (now - chrono::Duration::seconds(30)).to_rfc2822();
        assert!(parse_retry_after(&header, now).is_none());
    }

    #[test]
    fn test_parse_retry_after_garbage() {
        assert!(parse_retry_after("soon", Utc::now()).is_none());
        assert!(parse_retry_after("-5", Utc::now()).is_none());
        assert!(parse_retry_after("", Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_retry_exhausts_after_max_retries() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_rate_limit(&fast_config(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::RateLimitExceeded { retry_after: None })
        })
        .await;

        assert!(matches!(
            result,
            Err(ApiError::RateLimitExhausted { retries: 3 })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_rate_limits() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = retry_on_rate_limit(&fast_config(), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ApiError::RateLimitExceeded {
                    retry_after: Some(Duration::from_millis(1)),
                })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_on_rate_limit(&fast_config(), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::ServerError {
                status: 503,
                message: "unavailable".to_string(),
            })
        })
        .await;

        assert!(matches!(
            result,
            Err(ApiError::ServerError { status: 503, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_overrides_backoff() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let start = tokio::time::Instant::now();
        let result = retry_on_rate_limit(&RetryConfig::default(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::RateLimitExceeded {
                    retry_after: Some(Duration::from_secs(5)),
                })
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_millis(5_100));
    }
}
