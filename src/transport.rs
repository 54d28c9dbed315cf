use std::thread;
use std::time::Duration;

use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::AfError;

/// Minimal view of an HTTP response: status plus raw body bytes. Upstream
/// components never touch reqwest types directly.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The seam the resolver and the structure client are generic over. The
/// production implementation is [`Transport`]; tests substitute mocks.
pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, AfError>;
}

impl<T: HttpGet + ?Sized> HttpGet for &T {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, AfError> {
        (**self).get(url, params)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Geometric backoff with random jitter so contending clients do not
    /// synchronize their retries against the same endpoint.
    fn delay_for(&self, attempt: usize) -> Duration {
        let factor = 1u32 << attempt.min(10) as u32;
        let exp = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = rand::rng().random_range(0..=(exp.as_millis() as u64) / 2);
        exp + Duration::from_millis(jitter_ms)
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

/// A single failed attempt, before the retry policy has been applied.
pub(crate) struct AttemptError {
    pub retryable: bool,
    pub message: String,
}

/// Runs `attempt` under `policy`. Responses with a retryable status and
/// retryable transport failures are re-issued after a backoff delay until the
/// attempt budget is spent; anything else is returned to the caller as-is.
/// Non-retryable statuses (404 and friends) count as a completed transport
/// call, not an error.
pub(crate) fn send_with_retries<F>(
    policy: &RetryPolicy,
    url: &str,
    mut attempt: F,
) -> Result<HttpResponse, AfError>
where
    F: FnMut() -> Result<HttpResponse, AttemptError>,
{
    let mut tries = 0usize;
    loop {
        tries += 1;
        match attempt() {
            Ok(response) if is_retryable_status(response.status) => {
                if tries >= policy.max_attempts {
                    return Err(AfError::TransportStatus {
                        status: response.status,
                        url: url.to_string(),
                    });
                }
                tracing::debug!(
                    url,
                    status = response.status,
                    attempt = tries,
                    "transient status, retrying"
                );
                thread::sleep(policy.delay_for(tries - 1));
            }
            Ok(response) => return Ok(response),
            Err(err) if err.retryable && tries < policy.max_attempts => {
                tracing::debug!(url, attempt = tries, error = %err.message, "transport failure, retrying");
                thread::sleep(policy.delay_for(tries - 1));
            }
            Err(err) => {
                return Err(AfError::Transport(format!("{url}: {}", err.message)));
            }
        }
    }
}

/// Shared HTTP client with a bounded per-request timeout and a uniform retry
/// policy. Built once per run and cloned into every component that goes over
/// the wire, so all requests share one connection pool.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

impl Transport {
    pub fn new(timeout: Duration) -> Result<Self, AfError> {
        Self::with_policy(timeout, RetryPolicy::default())
    }

    pub fn with_policy(timeout: Duration, policy: RetryPolicy) -> Result<Self, AfError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("alphafetch/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AfError::Transport(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| AfError::Transport(err.to_string()))?;
        Ok(Self { client, policy })
    }
}

impl HttpGet for Transport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse, AfError> {
        send_with_retries(&self.policy, url, || {
            let response = self
                .client
                .get(url)
                .query(params)
                .send()
                .map_err(|err| AttemptError {
                    retryable: err.is_timeout() || err.is_connect() || err.is_request(),
                    message: err.to_string(),
                })?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .map_err(|err| AttemptError {
                    retryable: err.is_timeout(),
                    message: err.to_string(),
                })?
                .to_vec();
            Ok(HttpResponse { status, body })
        })
    }
}
