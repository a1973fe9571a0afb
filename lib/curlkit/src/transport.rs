//! The default transport: a pooled hyper-util client over rustls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use curlkit_core::{
    Error, Headers, Request, Response, ResponseLimit, Result, Transport, TransportFuture,
};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::config::PoolConfig;
use crate::connector::{Route, https_connector};
use crate::pool::TransportSettings;

/// Type-erased service for middleware composition.
///
/// This type allows storing and composing arbitrary Tower layers without
/// exposing complex generic types to users.
pub type BoxedService = BoxCloneService<Request<Bytes>, Response<Bytes>, Error>;

/// Future type for Tower Service implementations.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// HTTP transport using hyper-util, with its own connection pool.
///
/// One instance exists per distinct [`TransportSettings`]; the
/// [`ClientPool`](crate::ClientPool) creates and caches them.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<Route>, Full<Bytes>>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport for the given settings.
    ///
    /// # Errors
    ///
    /// Fails when TLS material cannot be loaded or the proxy URL is invalid.
    pub fn new(settings: &TransportSettings, pool: &PoolConfig) -> Result<Self> {
        let connector = https_connector(
            &settings.tls,
            settings.proxy.as_ref(),
            settings.connect_timeout,
        )?;

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(pool.idle_timeout)
            .pool_max_idle_per_host(pool.max_idle_per_host)
            .pool_timer(TokioTimer::new())
            .build(connector);

        Ok(Self { inner })
    }

    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body, extensions) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str());

        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = builder
            .body(body)
            .map_err(|e| Error::connection(format!("invalid request: {e}")))?;

        *http_request.extensions_mut() = extensions;

        Ok(http_request)
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let limit = request.extensions().get::<ResponseLimit>().copied();
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let status = response.status().as_u16();
        let headers = Headers::from(response.headers());
        let body = response.into_body();

        let body = match limit {
            Some(ResponseLimit(max)) => {
                let max = usize::try_from(max).unwrap_or(usize::MAX);
                Limited::new(body, max)
                    .collect()
                    .await
                    .map_err(|e| {
                        if e.downcast_ref::<LengthLimitError>().is_some() {
                            Error::response(format!("response body exceeds {max} bytes"))
                        } else {
                            Error::response(e.to_string())
                        }
                    })?
                    .to_bytes()
            }
            None => body
                .collect()
                .await
                .map_err(|e| Error::response(e.to_string()))?
                .to_bytes(),
        };

        Ok(Response::new(status, headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = chain(&err);
        let lower = msg.to_lowercase();

        if lower.contains("ssl")
            || lower.contains("tls")
            || lower.contains("certificate")
            || lower.contains("handshake")
        {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

/// An error and its sources, joined with `: `.
fn chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

impl Transport for HyperTransport {
    fn execute(&self, request: Request<Bytes>) -> TransportFuture {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}

/// Adapts a shared [`Transport`] into the innermost Tower service.
#[derive(Clone)]
pub(crate) struct TransportService(Arc<dyn Transport>);

impl TransportService {
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Self {
        Self(transport)
    }
}

impl Service<Request<Bytes>> for TransportService {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = TransportFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        self.0.execute(request)
    }
}
