//! The execution engine.
//!
//! [`Client`] validates a [`RequestConfiguration`], picks a transport (the
//! configuration's own override, or a pooled [`HyperTransport`]), wraps it in
//! the middleware the configuration asks for, and runs the request under the
//! configured overall timeout and an optional cancellation signal.
//!
//! [`HyperTransport`]: crate::HyperTransport

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use curlkit_core::{Validator, Variables, parse_args, parse_command};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;
use tracing::debug;

use crate::config::PoolConfigBuilder;
use crate::middleware::{
    AuthLayer, DecompressionLayer, FollowRedirectLayer, LoggingLayer, RetryAttempts,
};
use crate::pool::ClientPool;
use crate::transport::{BoxedService, TransportService};
use crate::{Error, Request, RequestConfiguration, Response, Result};

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Runs curl commands and request configurations.
///
/// Cloning is cheap; clones share the client pool.
///
/// # Example
///
/// ```ignore
/// use curlkit::{Client, Variables};
///
/// let client = Client::new();
/// let vars = Variables::new().with("token", "s3cr3t");
/// let response = client
///     .run(r#"curl -H "Authorization: Bearer $token" https://api.example.com/me"#, &vars)
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    pool: ClientPool,
    validator: Arc<Validator>,
    layers: Arc<[LayerFn]>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("pool", &self.pool)
            .field("validator", &self.validator)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with its own default pool and the standard validator.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The client pool.
    #[must_use]
    pub const fn pool(&self) -> &ClientPool {
        &self.pool
    }

    /// The validator run before every execution.
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Parse a curl command, expand `variables`, and execute it.
    ///
    /// # Errors
    ///
    /// Any parse, expansion, validation, transport or HTTP failure.
    pub async fn run(&self, command: &str, variables: &Variables) -> Result<Response<Bytes>> {
        let config = parse_command(command, variables)?;
        self.execute(&config).await
    }

    /// Execute a pre-split curl argument list.
    ///
    /// # Errors
    ///
    /// See [`Client::run`].
    pub async fn run_args<I, S>(&self, args: I, variables: &Variables) -> Result<Response<Bytes>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = parse_args(args, variables)?;
        self.execute(&config).await
    }

    /// Execute a configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] when a rule fails; nothing is sent
    /// - [`Error::Timeout`] when the overall timeout (`-m`) elapses
    /// - [`Error::RetryExhausted`] when every allowed attempt failed
    /// - [`Error::Http`] for a status >= 400 with `--fail`
    /// - transport and response errors otherwise
    pub async fn execute(&self, config: &RequestConfiguration) -> Result<Response<Bytes>> {
        self.execute_with_cancel(config, std::future::pending::<()>())
            .await
    }

    /// Execute a configuration, aborting when `cancel` completes.
    ///
    /// Cancellation interrupts both in-flight I/O and a pending retry delay,
    /// and reports [`Error::Cancelled`], which is never retried.
    ///
    /// # Errors
    ///
    /// See [`Client::execute`], plus [`Error::Cancelled`].
    pub async fn execute_with_cancel<F>(
        &self,
        config: &RequestConfiguration,
        cancel: F,
    ) -> Result<Response<Bytes>>
    where
        F: Future<Output = ()>,
    {
        let call = self.call(config);
        tokio::select! {
            biased;
            () = cancel => {
                debug!(url = config.url(), "request cancelled");
                Err(Error::Cancelled)
            }
            result = call => result,
        }
    }

    /// Execute a configuration, aborting at `deadline`.
    ///
    /// Reaching the deadline is a cancellation: it reports [`Error::Cancelled`].
    ///
    /// # Errors
    ///
    /// See [`Client::execute_with_cancel`].
    pub async fn execute_until(
        &self,
        config: &RequestConfiguration,
        deadline: tokio::time::Instant,
    ) -> Result<Response<Bytes>> {
        self.execute_with_cancel(config, tokio::time::sleep_until(deadline))
            .await
    }

    async fn call(&self, config: &RequestConfiguration) -> Result<Response<Bytes>> {
        self.validator.validate(config)?;
        let request = self.prepare(config)?;
        let service = self.service(config)?;

        let response = match config.timeout() {
            Some(timeout) => send_within(service, request, timeout).await?,
            None => service.oneshot(request).await?,
        };

        if config.fail_on_error() && response.fails() {
            let (status, _, body) = response.into_parts();
            return Err(Error::http(status, Some(body)));
        }
        Ok(response)
    }

    fn prepare(&self, config: &RequestConfiguration) -> Result<Request<Bytes>> {
        let mut request = config.to_request()?;
        if !request.headers().contains("User-Agent") {
            request
                .headers_mut()
                .set("User-Agent", self.pool.config().user_agent.as_str());
        }
        Ok(request)
    }

    /// Assemble the middleware stack for one execution.
    fn service(&self, config: &RequestConfiguration) -> Result<BoxedService> {
        let transport = match config.transport() {
            Some(handle) => Arc::clone(handle.as_arc()),
            None => self.pool.get(config)?,
        };

        let mut service: BoxedService = BoxCloneService::new(TransportService::new(transport));

        if config.compressed() {
            service = BoxCloneService::new(DecompressionLayer::new().layer(service));
        }

        let redirect = config.redirect();
        if redirect.follow {
            service = BoxCloneService::new(
                FollowRedirectLayer::with_max_redirects(redirect.max_redirects).layer(service),
            );
        }

        if config.auth().is_some() {
            service = BoxCloneService::new(AuthLayer::new(config.auth()).layer(service));
        }

        for layer_fn in self.layers.iter() {
            service = layer_fn(service);
        }

        if config.retry().is_enabled() {
            let retry = RetryAttempts::layer(config.retry().clone());
            service = BoxCloneService::new(retry.layer(service));
        }

        Ok(BoxCloneService::new(LoggingLayer::new().layer(service)))
    }
}

async fn send_within<S>(
    service: S,
    request: Request<Bytes>,
    timeout: Duration,
) -> Result<S::Response>
where
    S: Service<Request<Bytes>, Error = Error>,
{
    tokio::time::timeout(timeout, service.oneshot(request))
        .await
        .map_err(|_| Error::Timeout)?
}

/// Builder for [`Client`].
///
/// # Example
///
/// ```ignore
/// use curlkit::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .idle_timeout(Duration::from_secs(30))
///     .user_agent("my-tool/1.0")
///     .build();
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: PoolConfigBuilder,
    pool: Option<ClientPool>,
    validator: Option<Validator>,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("validator", &self.validator)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl ClientBuilder {
    // ========================================================================
    // Pool Configuration
    // ========================================================================

    /// Set how long unused pooled transports are kept.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.idle_timeout(timeout);
        self
    }

    /// Set the idle sweep period.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.sweep_interval(interval);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn max_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.max_idle_per_host(count);
        self
    }

    /// Set the user agent added to requests that carry none.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config = self.config.user_agent(user_agent);
        self
    }

    /// Share an existing pool. Pool settings on this builder are then ignored.
    #[must_use]
    pub fn pool(mut self, pool: ClientPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Replace the standard validator.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    // ========================================================================
    // Generic Middleware API
    // ========================================================================

    /// Add a Tower layer to every execution.
    ///
    /// Layers sit inside retry and logging, and outside authentication,
    /// redirects and decompression. First added = outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request<Bytes>>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let pool = self
            .pool
            .unwrap_or_else(|| ClientPool::new(self.config.build()));
        // innermost first, so the first layer added ends up outermost
        let layers: Vec<LayerFn> = self.layers.into_iter().rev().collect();

        Client {
            pool,
            validator: Arc::new(self.validator.unwrap_or_default()),
            layers: layers.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use curlkit_core::{Headers, Limits, RequestBuilder, TransportHandle, ValidationError};

    use super::*;

    fn echo_transport() -> TransportHandle {
        TransportHandle::new(|request: Request<Bytes>| async move {
            let mut headers = Headers::new();
            for (name, value) in request.headers().iter() {
                headers.append(format!("echo-{name}"), value);
            }
            let body = request.body().cloned().unwrap_or_default();
            Ok::<_, Error>(Response::new(200, headers, body))
        })
    }

    #[test]
    fn client_default() {
        let client = Client::new();
        assert!(client.pool().is_empty());
        assert!(client.pool().config().user_agent.starts_with("curlkit/"));
    }

    #[test]
    fn client_builder() {
        let client = Client::builder()
            .idle_timeout(Duration::from_secs(5))
            .max_idle_per_host(4)
            .user_agent("curlkit-test/1.0")
            .build();

        assert_eq!(client.pool().config().idle_timeout, Duration::from_secs(5));
        assert_eq!(client.pool().config().max_idle_per_host, 4);
        assert_eq!(client.pool().config().user_agent, "curlkit-test/1.0");
    }

    #[test]
    fn client_is_debug() {
        let debug = format!("{:?}", Client::new());
        assert!(debug.contains("Client"));
    }

    #[tokio::test]
    async fn adds_default_user_agent() {
        let client = Client::builder().user_agent("curlkit-test/1.0").build();
        let config = RequestBuilder::default()
            .url("https://example.com")
            .transport(echo_transport())
            .build();

        let response = client.execute(&config).await.expect("response");
        assert_eq!(response.header("echo-User-Agent"), Some("curlkit-test/1.0"));
    }

    #[tokio::test]
    async fn explicit_user_agent_wins() {
        let config = RequestBuilder::default()
            .url("https://example.com")
            .header("User-Agent", "mine")
            .transport(echo_transport())
            .build();

        let response = Client::new().execute(&config).await.expect("response");
        assert_eq!(response.header("echo-User-Agent"), Some("mine"));
    }

    #[tokio::test]
    async fn transport_override_bypasses_the_pool() {
        let client = Client::new();
        let config = RequestBuilder::default()
            .url("https://example.com")
            .transport(echo_transport())
            .build();

        client.execute(&config).await.expect("response");
        assert!(client.pool().is_empty());
    }

    #[tokio::test]
    async fn validation_runs_before_sending() {
        let client = Client::builder()
            .validator(Validator::new(Limits {
                max_url_len: 16,
                ..Limits::default()
            }))
            .build();
        let config = RequestBuilder::default()
            .url("https://example.com/a/long/path")
            .transport(echo_transport())
            .build();

        let err = client.execute(&config).await.expect_err("url too long");
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::UrlTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn auth_is_applied() {
        let config = RequestBuilder::default()
            .url("https://example.com")
            .bearer_auth("t0k3n")
            .transport(echo_transport())
            .build();

        let response = Client::new().execute(&config).await.expect("response");
        assert_eq!(response.header("echo-Authorization"), Some("Bearer t0k3n"));
    }

    #[tokio::test]
    async fn custom_layers_run_first_added_outermost() {
        let tag = |value: &'static str| {
            tower::util::MapRequestLayer::new(move |mut request: Request<Bytes>| {
                request.headers_mut().append("X-Order", value);
                request
            })
        };
        let client = Client::builder().layer(tag("outer")).layer(tag("inner")).build();
        let config = RequestBuilder::default()
            .url("https://example.com")
            .transport(echo_transport())
            .build();

        let response = client.execute(&config).await.expect("response");
        let order: Vec<&str> = response.headers().get_all("echo-X-Order").collect();
        assert_eq!(order, ["outer", "inner"]);
    }
}
