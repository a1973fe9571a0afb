//! The canonical request description.
//!
//! A [`RequestConfiguration`] is produced by the converter or by a
//! [`RequestBuilder`] and treated as read-only afterwards. Cloning is deep,
//! except for a one-shot stream body and the transport override: clones
//! point at the same reader and the same transport.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::TransportHandle;
use crate::validate::{DEFAULT_MAX_BODY_SIZE, Validator};
use crate::{Body, Headers, Method, RequestBuilder, Result, RetryPolicy};

// ============================================================================
// Authentication
// ============================================================================

/// Authentication mode.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Auth {
    /// No credentials.
    #[default]
    None,
    /// HTTP Basic.
    Basic {
        /// User name.
        username: String,
        /// Password, if any.
        password: Option<String>,
    },
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// Token.
        token: String,
    },
}

impl Auth {
    /// Returns `true` unless this is [`Auth::None`].
    #[must_use]
    pub const fn is_some(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, password } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &password.as_ref().map(|_| "***"))
                .finish(),
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

// ============================================================================
// Transport-relevant options
// ============================================================================

/// TLS settings. File paths are opaque references; the transport loads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Skip certificate verification (`-k`).
    pub insecure: bool,
    /// Extra CA bundle (`--cacert`).
    pub ca_cert: Option<PathBuf>,
    /// Client certificate (`-E`).
    pub client_cert: Option<PathBuf>,
    /// Client private key (`--key`).
    pub client_key: Option<PathBuf>,
}

/// Proxy settings.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyOptions {
    /// Proxy URL.
    pub url: String,
    /// Proxy user name.
    pub username: Option<String>,
    /// Proxy password.
    pub password: Option<String>,
}

impl ProxyOptions {
    /// Proxy without credentials.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Adds proxy credentials.
    #[must_use]
    pub fn with_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }
}

impl From<&str> for ProxyOptions {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for ProxyOptions {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl fmt::Debug for ProxyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyOptions")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Hop limit used for `--max-redirs -1`, so a redirect loop still ends.
pub const MAX_REDIRECTS_CEILING: usize = 1000;

/// Redirect handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPolicy {
    /// Follow 3xx responses (`-L`).
    pub follow: bool,
    /// Maximum hops when following, at most [`MAX_REDIRECTS_CEILING`] when
    /// parsed from a command.
    pub max_redirects: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: false,
            max_redirects: 50,
        }
    }
}

// ============================================================================
// Form fields
// ============================================================================

/// A multipart form value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FormValue {
    /// Inline text.
    Text(String),
    /// File contents, read when the request is sent.
    File(PathBuf),
}

/// One multipart form field. Names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: FormValue,
}

// ============================================================================
// Request Configuration
// ============================================================================

/// Everything needed to execute one HTTP request.
///
/// The method is resolved lazily: see [`RequestConfiguration::method`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfiguration {
    pub(crate) method: Option<Method>,
    pub(crate) url: String,
    pub(crate) headers: Headers,
    #[serde(skip_serializing_if = "Body::is_stream")]
    pub(crate) body: Body,
    pub(crate) form: Vec<FormField>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) auth: Auth,
    pub(crate) tls: TlsOptions,
    pub(crate) proxy: Option<ProxyOptions>,
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) redirect: RedirectPolicy,
    pub(crate) retry: RetryPolicy,
    pub(crate) cookies: Vec<(String, String)>,
    pub(crate) max_body_size: Option<usize>,
    pub(crate) max_response_size: Option<u64>,
    pub(crate) allow_insecure_credentials: bool,
    pub(crate) compressed: bool,
    pub(crate) fail_on_error: bool,
    pub(crate) output: Option<PathBuf>,
    #[serde(skip)]
    pub(crate) transport: Option<TransportHandle>,
}

impl RequestConfiguration {
    /// Start a fluent [`RequestBuilder`].
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// A builder seeded with a copy of this configuration.
    #[must_use]
    pub fn to_builder(&self) -> RequestBuilder {
        RequestBuilder::from(self.clone())
    }

    /// Effective method: the explicit one, else POST when a body or form is
    /// present, else GET.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method.unwrap_or_else(|| {
            if self.body.is_empty() && self.form.is_empty() {
                Method::Get
            } else {
                Method::Post
            }
        })
    }

    /// The method as set, without inference.
    #[must_use]
    pub const fn explicit_method(&self) -> Option<Method> {
        self.method
    }

    /// Pin the effective method so later body changes do not affect it.
    pub fn resolve_method(&mut self) {
        self.method = Some(self.method());
    }

    /// Target URL, without the extra query parameters.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Multipart form fields.
    #[must_use]
    pub fn form(&self) -> &[FormField] {
        &self.form
    }

    /// Query parameters appended to the URL.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Authentication mode.
    #[must_use]
    pub const fn auth(&self) -> &Auth {
        &self.auth
    }

    /// TLS settings.
    #[must_use]
    pub const fn tls(&self) -> &TlsOptions {
        &self.tls
    }

    /// Proxy settings.
    #[must_use]
    pub const fn proxy(&self) -> Option<&ProxyOptions> {
        self.proxy.as_ref()
    }

    /// Connection establishment timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Overall timeout, covering every attempt.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Redirect handling.
    #[must_use]
    pub const fn redirect(&self) -> RedirectPolicy {
        self.redirect
    }

    /// Retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Cookies sent in a `Cookie` header.
    #[must_use]
    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    /// Explicit body size limit.
    #[must_use]
    pub const fn max_body_size(&self) -> Option<usize> {
        self.max_body_size
    }

    /// Explicit limit, or [`DEFAULT_MAX_BODY_SIZE`].
    #[must_use]
    pub fn effective_max_body_size(&self) -> usize {
        self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE)
    }

    /// Response body size limit.
    #[must_use]
    pub const fn max_response_size(&self) -> Option<u64> {
        self.max_response_size
    }

    /// Returns `true` if credentials may travel over plaintext HTTP.
    #[must_use]
    pub const fn allow_insecure_credentials(&self) -> bool {
        self.allow_insecure_credentials
    }

    /// Returns `true` if compressed responses are requested and decoded.
    #[must_use]
    pub const fn compressed(&self) -> bool {
        self.compressed
    }

    /// Returns `true` if HTTP error statuses become [`crate::Error::Http`].
    #[must_use]
    pub const fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// Output file reference. Writing it is up to the caller.
    #[must_use]
    pub fn output(&self) -> Option<&std::path::Path> {
        self.output.as_deref()
    }

    /// Transport override.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportHandle> {
        self.transport.as_ref()
    }

    /// Run the standard validation rules with default limits.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Validation`] for the first failing rule.
    pub fn validate(&self) -> Result<()> {
        Validator::default().validate(self)?;
        Ok(())
    }

    /// Serialize a snapshot, without the transport override or a stream body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a configuration from [`RequestConfiguration::to_json`] output.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
