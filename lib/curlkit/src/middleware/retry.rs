//! Retry middleware for HTTP requests.
//!
//! [`RetryAttempts`] adapts a [`RetryPolicy`] to tower's retry [`Policy`].
//! Attempts are strictly sequential: the next one starts only after the
//! previous outcome is known and the backoff delay has elapsed. When the
//! budget runs out on a retryable outcome, the result is replaced with
//! [`Error::RetryExhausted`] wrapping the last failure.

use std::sync::Arc;

use bytes::Bytes;
use curlkit_core::RetryPolicy;
use tokio::time::Sleep;
use tower::retry::{Policy, RetryLayer};
use tracing::debug;

use crate::{Error, Request, Response};

/// Per-request retry state over a shared [`RetryPolicy`].
///
/// Tower clones the policy for every request, so each call starts at
/// attempt 1.
///
/// # Example
///
/// ```ignore
/// use curlkit::middleware::RetryAttempts;
/// use curlkit::RetryPolicy;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// let service = ServiceBuilder::new()
///     .layer(RetryAttempts::layer(RetryPolicy::fixed(3, Duration::from_secs(1))))
///     .service(transport);
/// ```
#[derive(Debug, Clone)]
pub struct RetryAttempts {
    policy: Arc<RetryPolicy>,
    /// 1-based number of the attempt whose outcome is pending.
    attempt: u32,
}

impl RetryAttempts {
    /// Create retry state for the given policy.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            attempt: 1,
        }
    }

    /// Tower layer retrying with the given policy.
    #[must_use]
    pub fn layer(policy: RetryPolicy) -> RetryLayer<Self> {
        RetryLayer::new(Self::new(policy))
    }

    /// Returns `true` if the outcome warrants another attempt.
    fn should_retry(&self, result: &Result<Response<Bytes>, Error>) -> bool {
        match result {
            Ok(response) => self.policy.should_retry_status(response.status()),
            Err(error) => error.is_retryable() && self.policy.retries_transport_errors(),
        }
    }
}

/// Turn the final outcome into the error wrapped by `RetryExhausted`.
fn into_last_error(result: Result<Response<Bytes>, Error>) -> Error {
    match result {
        Ok(response) => {
            let (status, _, body) = response.into_parts();
            Error::http(status, Some(body))
        }
        Err(error) => error,
    }
}

impl Policy<Request<Bytes>, Response<Bytes>, Error> for RetryAttempts {
    type Future = Sleep;

    fn retry(
        &mut self,
        _req: &mut Request<Bytes>,
        result: &mut Result<Response<Bytes>, Error>,
    ) -> Option<Self::Future> {
        if !self.should_retry(result) {
            return None;
        }

        if self.attempt >= self.policy.max_attempts() {
            let last = std::mem::replace(result, Err(Error::Cancelled));
            let last = into_last_error(last);
            debug!(attempts = self.attempt, error = %last, "retries exhausted");
            *result = Err(Error::RetryExhausted {
                attempts: self.attempt,
                last: Box::new(last),
            });
            return None;
        }

        let delay = self.policy.delay_for(self.attempt);
        debug!(
            attempt = self.attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "retrying request"
        );
        self.attempt += 1;
        Some(tokio::time::sleep(delay))
    }

    fn clone_request(&mut self, req: &Request<Bytes>) -> Option<Request<Bytes>> {
        // bodies are buffered `Bytes`, so a clone replays the same payload
        Some(req.clone())
    }
}
