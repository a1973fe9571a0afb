//! Fluent construction of [`RequestConfiguration`]s.
//!
//! Setters named after a single value replace it; `header`, `query`,
//! `form_*` and `cookie` append. [`RequestBuilder::build`] takes `&self` and
//! returns an independent copy, so one builder can serve as a shared base:
//!
//! ```
//! use curlkit_core::{Method, RequestConfiguration};
//!
//! let base = RequestConfiguration::builder()
//!     .url("https://api.example.com/items")
//!     .bearer_auth("token");
//!
//! let list = base.build();
//! let create = base.clone().json(&serde_json::json!({"name": "x"})).unwrap().build();
//!
//! assert_eq!(list.method(), Method::Get);
//! assert_eq!(create.method(), Method::Post);
//! assert_eq!(create.headers().get("content-type"), Some("application/json"));
//! ```

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::body::OneShotBody;
use crate::client::TransportHandle;
use crate::config::{Auth, FormField, FormValue, ProxyOptions, RequestConfiguration};
use crate::validate::Validator;
use crate::{Body, Headers, Method, Result, RetryPolicy};

/// Builder for [`RequestConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    config: RequestConfiguration,
}

impl RequestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration built so far.
    #[must_use]
    pub const fn config(&self) -> &RequestConfiguration {
        &self.config
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.config.method = Some(method);
        self
    }

    /// Sets the URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Appends a header value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.append(name, value);
        self
    }

    /// Replaces every value of a header.
    #[must_use]
    pub fn set_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.set(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.config.headers = headers;
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.query.push((name.into(), value.into()));
        self
    }

    /// Appends a text form field.
    #[must_use]
    pub fn form_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.form.push(FormField {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    /// Appends a file form field; the file is read at send time.
    #[must_use]
    pub fn form_file(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.config.form.push(FormField {
            name: name.into(),
            value: FormValue::File(path.into()),
        });
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.config.body = body.into();
        self
    }

    /// Sets a one-shot body read from `reader` at send time.
    ///
    /// Such a body cannot be retried; see [`RequestBuilder::buffer_body`].
    #[must_use]
    pub fn body_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.config.body = Body::Stream(OneShotBody::new(reader));
        self
    }

    /// Drain a stream body into a replayable buffer now.
    ///
    /// # Errors
    ///
    /// Fails if the reader errors, was already drained, or exceeds the body limit.
    pub fn buffer_body(mut self) -> Result<Self> {
        if let Body::Stream(stream) = &self.config.body {
            let bytes = stream.read_to_bytes(self.config.effective_max_body_size())?;
            self.config.body = Body::from(bytes);
        }
        Ok(self)
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.config.body = Body::Text(serde_json::to_string(value)?);
        self.config.headers.set("Content-Type", "application/json");
        Ok(self)
    }

    /// HTTP Basic credentials.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.auth = Auth::Basic {
            username: username.into(),
            password: Some(password.into()),
        };
        self
    }

    /// Bearer token credentials.
    #[must_use]
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.config.auth = Auth::Bearer {
            token: token.into(),
        };
        self
    }

    /// Sets the authentication mode.
    #[must_use]
    pub fn auth(mut self, auth: Auth) -> Self {
        self.config.auth = auth;
        self
    }

    /// Appends a cookie.
    #[must_use]
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.cookies.push((name.into(), value.into()));
        self
    }

    /// Overall timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Connection establishment timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Follow redirects, up to `max` hops.
    #[must_use]
    pub fn follow_redirects(mut self, max: usize) -> Self {
        self.config.redirect.follow = true;
        self.config.redirect.max_redirects = max;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Up to `max_attempts` attempts with a fixed delay.
    #[must_use]
    pub fn retry_fixed(self, max_attempts: u32, delay: Duration) -> Self {
        let codes = self.config.retry.retry_on().to_vec();
        self.retry(RetryPolicy::fixed(max_attempts, delay).with_status_codes(codes))
    }

    /// Up to `max_attempts` attempts with a doubling delay.
    #[must_use]
    pub fn retry_exponential(self, max_attempts: u32, initial: Duration, max: Duration) -> Self {
        let codes = self.config.retry.retry_on().to_vec();
        self.retry(RetryPolicy::exponential(max_attempts, initial, max).with_status_codes(codes))
    }

    /// Replaces the retryable status codes.
    #[must_use]
    pub fn retry_on(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retry = self.config.retry.with_status_codes(codes);
        self
    }

    /// Request body size limit.
    #[must_use]
    pub fn max_body_size(mut self, max: usize) -> Self {
        self.config.max_body_size = Some(max);
        self
    }

    /// Response body size limit.
    #[must_use]
    pub fn max_response_size(mut self, max: u64) -> Self {
        self.config.max_response_size = Some(max);
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.config.tls.insecure = insecure;
        self
    }

    /// Extra CA bundle.
    #[must_use]
    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tls.ca_cert = Some(path.into());
        self
    }

    /// Client certificate and private key.
    #[must_use]
    pub fn client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.config.tls.client_cert = Some(cert.into());
        self.config.tls.client_key = Some(key.into());
        self
    }

    /// Send through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<ProxyOptions>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Permit credentials over plaintext HTTP.
    #[must_use]
    pub fn allow_insecure_credentials(mut self, allow: bool) -> Self {
        self.config.allow_insecure_credentials = allow;
        self
    }

    /// Request and decode compressed responses.
    #[must_use]
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.config.compressed = compressed;
        self
    }

    /// Treat HTTP status >= 400 as an error.
    #[must_use]
    pub fn fail_on_error(mut self, fail: bool) -> Self {
        self.config.fail_on_error = fail;
        self
    }

    /// Output file reference.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = Some(path.into());
        self
    }

    /// Replace the pooled client with a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: TransportHandle) -> Self {
        self.config.transport = Some(transport);
        self
    }

    /// An independent copy of the configuration, with the method resolved.
    #[must_use]
    pub fn build(&self) -> RequestConfiguration {
        let mut config = self.config.clone();
        config.resolve_method();
        config
    }

    /// [`RequestBuilder::build`], then the standard validation rules.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Validation`] for the first failing rule.
    pub fn try_build(&self) -> Result<RequestConfiguration> {
        self.try_build_with(&Validator::default())
    }

    /// [`RequestBuilder::build`], then a custom validator.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Validation`] for the first failing rule.
    pub fn try_build_with(&self, validator: &Validator) -> Result<RequestConfiguration> {
        let config = self.build();
        validator.validate(&config)?;
        Ok(config)
    }
}

impl From<RequestConfiguration> for RequestBuilder {
    fn from(config: RequestConfiguration) -> Self {
        Self { config }
    }
}
