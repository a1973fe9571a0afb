//! Execution logging through `tracing`.
//!
//! Each execution runs inside an `http_request` span that carries the method
//! and the URL with its query string, fragment and userinfo removed. Header
//! values never reach the log: the detailed mode lists header names only.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, debug, info, info_span, warn};
use url::Url;

use crate::{Error, Headers, Request, Response, Result};

/// How much the logging middleware records per execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// One `info` line with status, size and elapsed time.
    #[default]
    Summary,
    /// The summary plus `debug` lines with header names and body sizes.
    Detailed,
}

/// Layer that logs every execution.
///
/// The engine always installs one in summary mode as the outermost layer.
/// Adding a detailed one with [`ClientBuilder::layer`](crate::ClientBuilder::layer)
/// logs each retry attempt separately.
///
/// # Example
///
/// ```ignore
/// use curlkit::Client;
/// use curlkit::middleware::LoggingLayer;
///
/// let client = Client::builder().layer(LoggingLayer::detailed()).build();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    verbosity: Verbosity,
}

impl LoggingLayer {
    /// Summary logging.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            verbosity: Verbosity::Summary,
        }
    }

    /// Summary logging plus request and response details at `debug`.
    #[must_use]
    pub const fn detailed() -> Self {
        Self {
            verbosity: Verbosity::Detailed,
        }
    }

    /// The configured verbosity.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            verbosity: self.verbosity,
        }
    }
}

/// Service produced by [`LoggingLayer`].
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    verbosity: Verbosity,
}

/// The URL as it appears in logs.
fn loggable_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.set_fragment(None);
    // only fails for URLs that cannot carry credentials in the first place
    let _ = shown.set_username("");
    let _ = shown.set_password(None);
    shown.to_string()
}

fn header_names(headers: &Headers) -> String {
    let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
    names.join(", ")
}

fn record_outcome(result: &Result<Response<Bytes>>, started: Instant, verbosity: Verbosity) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(response) => {
            let status = response.status();
            let bytes = response.body().len();
            if verbosity == Verbosity::Detailed {
                debug!(headers = %header_names(response.headers()), "response headers");
            }
            if response.is_success() {
                info!(status, bytes, elapsed_ms, "request completed");
            } else {
                warn!(status, bytes, elapsed_ms, "request completed with non-success status");
            }
        }
        Err(err) => warn!(kind = %err.kind(), error = %err, elapsed_ms, "request failed"),
    }
}

impl<S> Service<Request<Bytes>> for Logging<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let span = info_span!(
            "http_request",
            method = %request.method(),
            url = %loggable_url(request.url()),
        );

        match self.verbosity {
            Verbosity::Summary => span.in_scope(|| debug!("sending request")),
            Verbosity::Detailed => span.in_scope(|| {
                debug!(
                    headers = %header_names(request.headers()),
                    body_bytes = request.body().map_or(0, Bytes::len),
                    "sending request"
                );
            }),
        }

        let verbosity = self.verbosity;
        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let started = Instant::now();
                let result = inner.call(request).await;
                record_outcome(&result, started, verbosity);
                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_defaults_to_summary() {
        assert_eq!(LoggingLayer::new().verbosity(), Verbosity::Summary);
        assert_eq!(LoggingLayer::default().verbosity(), Verbosity::Summary);
        assert_eq!(LoggingLayer::detailed().verbosity(), Verbosity::Detailed);
    }

    #[test]
    fn logged_url_hides_query_and_credentials() {
        let url = Url::parse("https://user:pw@api.example.com:8443/v1/items?token=abc#top")
            .expect("url");
        assert_eq!(loggable_url(&url), "https://api.example.com:8443/v1/items");
    }

    #[test]
    fn header_names_only() {
        let headers: Headers = [("Authorization", "Bearer secret"), ("Accept", "*/*")]
            .into_iter()
            .collect();
        let names = header_names(&headers);
        assert_eq!(names, "Authorization, Accept");
        assert!(!names.contains("secret"));
    }
}
