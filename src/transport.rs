//! Shared HTTP transport with retry and backoff.
//!
//! [`TransportClient`] wraps a blocking [`reqwest`] client with connection
//! pooling and applies a [`RetryPolicy`] beneath every request: retry-eligible
//! statuses and connection/timeout failures are retried with exponential
//! backoff until the budget runs out, and only then surface as errors.
//!
//! Build one client at startup and hand out `&TransportClient` to every
//! download. The client is immutable after construction and opens no
//! connection until the first request.

use std::{error::Error as StdError, thread, time::Duration};

use reqwest::{
    blocking::{Client, Response},
    header::RETRY_AFTER,
};

use crate::{
    configuration::{RetryPolicy, TransportOptions},
    error::VidgrabError,
};

/// Process-wide HTTP client shared by all downloads.
#[derive(Debug, Clone)]
pub struct TransportClient {
    client: Client,
    retry: RetryPolicy,
}

impl TransportClient {
    /// Build a client from `options`.
    ///
    /// The overall request timeout is disabled so large bodies can stream for
    /// as long as they need; only the connect phase is bounded.
    ///
    /// # Errors
    ///
    /// Returns [`VidgrabError::HttpClient`] if the TLS backend or the
    /// underlying runtime cannot be initialised.
    pub fn new(options: &TransportOptions) -> Result<Self, VidgrabError> {
        let mut builder = Client::builder()
            .pool_max_idle_per_host(options.max_idle_per_host)
            .user_agent(options.user_agent.clone())
            .timeout(None::<Duration>);

        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|error| VidgrabError::HttpClient(error_chain(&error)))?;

        log::debug!(
            "HTTP client ready (retries={}, statuses={:?}, idle_per_host={})",
            options.retry.max_retries,
            options.retry.retry_statuses,
            options.max_idle_per_host,
        );

        Ok(Self {
            client,
            retry: options.retry.clone(),
        })
    }

    /// The retry policy applied to every request.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send a GET request, retrying transient failures.
    ///
    /// The returned response has a 2xx status and an unread body, so the
    /// caller can stream it.
    ///
    /// # Errors
    ///
    /// - [`VidgrabError::HttpStatus`] for a non-retryable status, or a
    ///   retry-eligible one once the budget is exhausted.
    /// - [`VidgrabError::Request`] for transport failures (after retrying
    ///   connect and timeout errors).
    pub fn get(&self, url: &str) -> Result<Response, VidgrabError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let can_retry = attempt <= self.retry.max_retries;

            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        log::debug!("GET {url} -> {status} (attempt {attempt})");
                        return Ok(response);
                    }

                    let code = status.as_u16();
                    if !(can_retry && self.retry.is_retry_status(code)) {
                        return Err(VidgrabError::HttpStatus {
                            url: url.to_string(),
                            status: code,
                            attempts: attempt,
                        });
                    }

                    let delay = self.retry_delay(attempt, &response);
                    log::warn!(
                        "GET {url} returned HTTP {code}; retry {attempt}/{} in {:.1}s",
                        self.retry.max_retries,
                        delay.as_secs_f64(),
                    );
                    drop(response);
                    thread::sleep(delay);
                }
                Err(error) if can_retry && (error.is_connect() || error.is_timeout()) => {
                    let delay = self.retry.backoff(attempt);
                    log::warn!(
                        "GET {url} failed ({}); retry {attempt}/{} in {:.1}s",
                        error_chain(&error),
                        self.retry.max_retries,
                        delay.as_secs_f64(),
                    );
                    thread::sleep(delay);
                }
                Err(error) => {
                    return Err(VidgrabError::Request {
                        url: url.to_string(),
                        reason: error_chain(&error),
                    });
                }
            }
        }
    }

    /// Delay before the next attempt, honouring `Retry-After` when allowed.
    fn retry_delay(&self, attempt: u32, response: &Response) -> Duration {
        let computed = self.retry.backoff(attempt);
        if !self.retry.respect_retry_after {
            return computed;
        }

        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after)
            .map(|delay| delay.min(self.retry.max_backoff))
            .unwrap_or(computed)
    }
}

/// Parse the delay-seconds form of a `Retry-After` header.
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Render an error together with its `source()` chain.
pub(crate) fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
