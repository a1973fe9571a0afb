//! Authentication middleware.
//!
//! Adds `Authorization: Basic <base64(user:pass)>` or
//! `Authorization: Bearer <token>` to outgoing requests. An `Authorization`
//! header already on the request wins, as with curl's `-H`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use base64::Engine;
use bytes::Bytes;
use curlkit_core::Auth;
use tower::{Layer, Service};

use crate::{Error, Request, Response, Result};

/// Layer that adds credentials to requests.
///
/// # Example
///
/// ```ignore
/// use curlkit::middleware::AuthLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(AuthLayer::basic("username", Some("password")))
///     .service(transport);
/// ```
#[derive(Clone)]
pub struct AuthLayer {
    /// Full `Authorization` value, or `None` for [`Auth::None`].
    value: Option<Arc<str>>,
}

impl std::fmt::Debug for AuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthLayer")
            .field("enabled", &self.value.is_some())
            .finish()
    }
}

impl AuthLayer {
    /// Create a layer for the given credentials.
    #[must_use]
    pub fn new(auth: &Auth) -> Self {
        let value = match auth {
            Auth::None => None,
            Auth::Basic { username, password } => {
                let credentials = format!("{username}:{}", password.as_deref().unwrap_or_default());
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(Arc::from(format!("Basic {encoded}")))
            }
            Auth::Bearer { token } => Some(Arc::from(format!("Bearer {token}"))),
        };
        Self { value }
    }

    /// Basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: Option<&str>) -> Self {
        Self::new(&Auth::Basic {
            username: username.into(),
            password: password.map(str::to_string),
        })
    }

    /// Bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(&Auth::Bearer {
            token: token.into(),
        })
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            value: self.value.clone(),
        }
    }
}

/// Service that adds credentials to requests.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    value: Option<Arc<str>>,
}

impl<S> Service<Request<Bytes>> for AuthService<S>
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

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        if let Some(value) = &self.value
            && !request.headers().contains("Authorization")
        {
            request.headers_mut().set("Authorization", value.as_ref());
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}
