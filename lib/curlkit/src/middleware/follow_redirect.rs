//! Follow redirect middleware.
//!
//! This middleware follows HTTP redirects (3xx responses with a Location
//! header), the way `curl -L` does. Relative and absolute locations are both
//! resolved against the current URL.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::debug;
use url::Url;

use crate::{Error, Method, Request, Response, Result};

/// Default maximum number of redirects to follow, as curl.
pub const DEFAULT_MAX_REDIRECTS: usize = 50;

/// Layer that follows HTTP redirects.
///
/// # Example
///
/// ```ignore
/// use curlkit::middleware::FollowRedirectLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(FollowRedirectLayer::with_max_redirects(5))
///     .service(transport);
/// ```
#[derive(Debug, Clone)]
pub struct FollowRedirectLayer {
    max_redirects: usize,
}

impl Default for FollowRedirectLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FollowRedirectLayer {
    /// Create a new follow redirect layer with default max redirects (50).
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Create a new follow redirect layer with a custom max redirects.
    #[must_use]
    pub fn with_max_redirects(max_redirects: usize) -> Self {
        Self { max_redirects }
    }
}

impl<S> Layer<S> for FollowRedirectLayer {
    type Service = FollowRedirect<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FollowRedirect {
            inner,
            max_redirects: self.max_redirects,
        }
    }
}

/// Service that follows HTTP redirects.
#[derive(Debug, Clone)]
pub struct FollowRedirect<S> {
    inner: S,
    max_redirects: usize,
}

/// Check if a status code is a redirect.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 301, 302, 303: GET (HEAD stays HEAD)
/// - 307, 308: Preserve original method
fn redirect_method(status: u16, original: Method) -> Method {
    match (status, original) {
        (307 | 308, method) | (_, method @ Method::Head) => method,
        _ => Method::Get,
    }
}

/// Resolve a redirect Location URL relative to the current request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    base_url.join(location).map_err(Error::InvalidUrl)
}

/// Build the follow-up request for a redirect.
fn redirected(request: Request<Bytes>, status: u16, location: Url) -> Request<Bytes> {
    let (method, url, mut headers, body, extensions) = request.into_parts();
    let new_method = redirect_method(status, method);

    let same_origin = location.host_str() == url.host_str()
        && location.port_or_known_default() == url.port_or_known_default();
    if !same_origin {
        headers.remove("Authorization");
        headers.remove("Cookie");
    }

    let body = if new_method == method { body } else { None };
    if body.is_none() {
        headers.remove("Content-Type");
        headers.remove("Content-Length");
    }

    let builder = Request::builder(new_method, location)
        .headers(headers)
        .extensions(extensions);
    match body {
        Some(body) => builder.body(body).build(),
        None => builder.build(),
    }
}

impl<S> Service<Request<Bytes>> for FollowRedirect<S>
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
        let mut inner = self.inner.clone();
        let max_redirects = self.max_redirects;

        Box::pin(async move {
            let mut current_request = request;
            let mut redirects = 0;

            loop {
                let response = inner.call(current_request.clone()).await?;
                let status = response.status();

                if !is_redirect(status) {
                    return Ok(response);
                }

                if redirects >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        count: redirects,
                        max: max_redirects,
                    });
                }

                let location = response.header("Location").ok_or_else(|| {
                    Error::InvalidRedirect(format!("{status} response missing Location header"))
                })?;
                let new_url = resolve_redirect_url(current_request.url(), location)?;
                debug!(status, from = %current_request.url(), to = %new_url, "following redirect");

                current_request = redirected(current_request, status, new_url);
                redirects += 1;
            }
        })
    }
}
