//! Bounded retries with exponential backoff
//!
//! Every network call in the pipeline goes through [`RetryPolicy::execute_with_retry`]:
//! listing pages, detail records and batch posts alike.
//!
//! | outcome                         | class      |
//! |---------------------------------|------------|
//! | 2xx                             | success    |
//! | transport failure               | retryable  |
//! | 500, 502, 503, 504              | retryable  |
//! | anything else (3xx, 4xx, 5xx)   | terminal   |
//!
//! Between attempt `n` and `n + 1` the policy waits `backoff_factor ^ n`
//! seconds. There is no wait after the last attempt.

use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use std::time::Duration;
use tracing::{debug, warn};

/// Status codes that are retried instead of returned
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

/// How a response status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Retryable,
    Terminal,
}

impl StatusClass {
    pub fn of(status: u16) -> Self {
        if (200..300).contains(&status) {
            StatusClass::Success
        } else if RETRYABLE_STATUS_CODES.contains(&status) {
            StatusClass::Retryable
        } else {
            StatusClass::Terminal
        }
    }
}

/// Wait before the attempt following `attempt` (1-based)
pub fn backoff_delay(backoff_factor: f64, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    Duration::try_from_secs_f64(backoff_factor.powi(exponent)).unwrap_or(Duration::MAX)
}

/// Executes requests over a [`Transport`] with bounded retries
#[derive(Debug, Clone)]
pub struct RetryPolicy<T> {
    transport: T,
    max_attempts: u32,
    backoff_factor: f64,
}

impl<T: Transport> RetryPolicy<T> {
    /// `max_attempts` below 1 is raised to 1
    pub fn new(transport: T, max_attempts: u32, backoff_factor: f64) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            backoff_factor,
        }
    }

    pub fn from_config(transport: T, config: &EtlConfig) -> Self {
        Self::new(transport, config.max_attempts, config.backoff_factor)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor
    }

    /// Send `request` until it succeeds, fails terminally, or runs out of attempts
    ///
    /// # Errors
    ///
    /// - [`EtlError::UnexpectedStatus`] as soon as a non-retryable status arrives
    /// - [`EtlError::RetryExhausted`] once every attempt failed retryably
    pub async fn execute_with_retry(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.attempt(request).await {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        status = response.status,
                        attempt,
                        "Request succeeded"
                    );
                    return Ok(response);
                }
                Err(err) if err.is_retryable() => {
                    if attempt < self.max_attempts {
                        let wait = backoff_delay(self.backoff_factor, attempt);
                        warn!(
                            "{}. Retrying in {:?} (attempt {}/{})...",
                            err, wait, attempt, self.max_attempts
                        );
                        tokio::time::sleep(wait).await;
                    } else {
                        warn!("{}. Giving up (attempt {}/{})", err, attempt, self.max_attempts);
                    }
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(EtlError::RetryExhausted {
            method: request.method.clone(),
            url: request.url.clone(),
            attempts: self.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self.transport.send(request).await?;

        match StatusClass::of(response.status) {
            StatusClass::Success => Ok(response),
            StatusClass::Retryable => Err(EtlError::ServerError {
                method: request.method.clone(),
                url: request.url.clone(),
                status: response.status,
            }),
            StatusClass::Terminal => Err(EtlError::UnexpectedStatus {
                method: request.method.clone(),
                url: request.url.clone(),
                status: response.status,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_support::{LogCapture, MockTransport, Scripted};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn request() -> HttpRequest {
        HttpRequest::get("http://animals/1", Duration::from_secs(5))
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(201), StatusClass::Success);
        for status in RETRYABLE_STATUS_CODES {
            assert_eq!(StatusClass::of(status), StatusClass::Retryable);
        }
        assert_eq!(StatusClass::of(301), StatusClass::Terminal);
        assert_eq!(StatusClass::of(400), StatusClass::Terminal);
        assert_eq!(StatusClass::of(404), StatusClass::Terminal);
        assert_eq!(StatusClass::of(501), StatusClass::Terminal);
    }

    #[test]
    fn test_backoff_is_factor_to_the_attempt() {
        let waits: Vec<u64> = (1..=4).map(|n| backoff_delay(2.0, n).as_secs()).collect();
        assert_eq!(waits, vec![2, 4, 8, 16]);

        assert_eq!(backoff_delay(0.0, 3), Duration::ZERO);
        assert_eq!(backoff_delay(1.5, 2), Duration::from_secs_f64(2.25));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_makes_every_attempt_then_gives_up() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let policy = RetryPolicy::new(transport.clone(), 5, 2.0);

        let started = Instant::now();
        let err = policy.execute_with_retry(&request()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert_eq!(transport.call_count(), 5);
        // 2 + 4 + 8 + 16: four waits between five attempts
        assert!(elapsed >= Duration::from_secs(30), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(31), "elapsed {elapsed:?}");
        match err {
            EtlError::RetryExhausted {
                method,
                url,
                attempts,
                ..
            } => {
                assert_eq!(method, reqwest::Method::GET);
                assert_eq!(url, "http://animals/1");
                assert_eq!(attempts, 5);
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_then_success() {
        let transport = Arc::new(MockTransport::new(vec![
            Scripted::status(503),
            Scripted::status(502),
            Scripted::json(200, json!({"id": 1})),
        ]));
        let policy = RetryPolicy::new(transport.clone(), 5, 2.0);

        let started = Instant::now();
        let response = policy.execute_with_retry(&request()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.call_count(), 3);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let transport = Arc::new(MockTransport::new(vec![Scripted::json(
            404,
            json!({"err": "missing"}),
        )]));
        let policy = RetryPolicy::new(transport.clone(), 5, 0.0);

        let err = policy.execute_with_retry(&request()).await.unwrap_err();

        assert!(matches!(err, EtlError::UnexpectedStatus { status: 404, .. }));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_one_warning_per_failed_attempt() {
        let capture = LogCapture::start();
        let transport = Arc::new(MockTransport::new(vec![
            Scripted::status(500),
            Scripted::TransportError,
        ]));
        let policy = RetryPolicy::new(transport, 3, 0.0);

        let err = policy.execute_with_retry(&request()).await.unwrap_err();

        assert!(matches!(err, EtlError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(capture.count_level("WARN"), 3);
        assert_eq!(capture.count_level("INFO"), 0);
    }

    #[test]
    fn test_from_config_reads_attempts_and_backoff() {
        let mut config = EtlConfig::new("http://animals", "http://home");
        config.max_attempts = 3;
        config.backoff_factor = 1.5;

        let policy = RetryPolicy::from_config(MockTransport::new(vec![]), &config);

        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff_factor(), 1.5);
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        let policy = RetryPolicy::new(MockTransport::new(vec![]), 0, 2.0);
        assert_eq!(policy.max_attempts(), 1);
    }
}
