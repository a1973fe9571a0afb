//! Request configuration validation.
//!
//! A [`Validator`] runs a list of independent [`Rule`]s against a
//! [`RequestConfiguration`] and stops at the first failure. Each rule is a
//! plain function, so callers can compose their own list with
//! [`Validator::with_rule`] or call the `check_*` functions directly.
//!
//! # Example
//!
//! ```
//! use curlkit_core::{RequestConfiguration, ValidationError, Validator};
//!
//! let config = RequestConfiguration::builder()
//!     .url("http://example.com")
//!     .basic_auth("user", "secret")
//!     .build();
//!
//! let err = Validator::default().validate(&config).unwrap_err();
//! assert!(matches!(err, ValidationError::InsecureCredentials { .. }));
//! ```

use derive_more::{Display, Error};

use crate::config::{Auth, RequestConfiguration};
use crate::{Body, Method};

/// Default cap on request body size (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Header names managed by the transport; users may never set them.
pub const FORBIDDEN_HEADERS: [&str; 3] = ["host", "content-length", "transfer-encoding"];

// ============================================================================
// Validation Error
// ============================================================================

/// A configuration rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ValidationError {
    /// No URL was given.
    #[display("missing URL")]
    MissingUrl,

    /// URL longer than the limit.
    #[display("URL is {length} bytes long, limit is {max}")]
    UrlTooLong {
        /// Actual length.
        length: usize,
        /// Limit.
        max: usize,
    },

    /// URL that does not parse.
    #[display("invalid URL `{url}`: {reason}")]
    InvalidUrl {
        /// The URL as given.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// URL scheme other than http or https.
    #[display("unsupported URL scheme `{scheme}`")]
    UnsupportedScheme {
        /// The scheme.
        scheme: String,
    },

    /// A method name that is not an HTTP method this client knows.
    #[display("unsupported method `{method}`")]
    UnsupportedMethod {
        /// The method as written.
        method: String,
    },

    /// A known method excluded by the allow-list.
    #[display("method {method} is not allowed")]
    MethodNotAllowed {
        /// The method.
        method: Method,
    },

    /// More headers than the limit.
    #[display("{count} headers exceed the limit of {max}")]
    TooManyHeaders {
        /// Header count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// One header line larger than the limit.
    #[display("header `{name}` is {size} bytes, limit is {max}")]
    HeaderTooLarge {
        /// Header name.
        name: String,
        /// Size of `name: value`.
        size: usize,
        /// Limit.
        max: usize,
    },

    /// A transport-managed header.
    #[display("header `{name}` is managed by the transport and cannot be set")]
    ForbiddenHeader {
        /// Header name.
        name: String,
    },

    /// A header name or value that is not valid on the wire.
    #[display("invalid header `{name}`")]
    InvalidHeader {
        /// Header name.
        name: String,
    },

    /// Body larger than the effective limit.
    #[display("body is {size} bytes, limit is {max}")]
    BodyTooLarge {
        /// Body size.
        size: usize,
        /// Effective limit.
        max: usize,
    },

    /// A one-shot body was already sent.
    #[display("stream body was already consumed")]
    BodyConsumed,

    /// A one-shot body combined with a retry policy.
    #[display("stream body cannot be resent across {attempts} attempts; buffer it first")]
    UnrewindableBody {
        /// Configured maximum attempts.
        attempts: u32,
    },

    /// More form fields than the limit.
    #[display("{count} form fields exceed the limit of {max}")]
    TooManyFormFields {
        /// Field count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// More query parameters than the limit.
    #[display("{count} query parameters exceed the limit of {max}")]
    TooManyQueryParams {
        /// Parameter count.
        count: usize,
        /// Limit.
        max: usize,
    },

    /// Both a body and form fields were given.
    #[display("a request cannot carry both a body and form fields")]
    ConflictingBody,

    /// Credentials over plaintext HTTP.
    #[display("refusing to send {auth} credentials over plaintext {scheme}")]
    InsecureCredentials {
        /// Authentication scheme (`basic` or `bearer`).
        auth: &'static str,
        /// URL scheme.
        scheme: String,
    },

    /// A retry policy that can never run.
    #[display("invalid retry policy: {reason}")]
    InvalidRetryPolicy {
        /// What is wrong.
        reason: String,
    },

    /// An option value that could not be interpreted.
    #[display("invalid value `{value}` for {flag}: {reason}")]
    InvalidOptionValue {
        /// The option as written.
        flag: String,
        /// The value as written.
        value: String,
        /// What is wrong.
        reason: String,
    },
}

impl ValidationError {
    /// Create an invalid option value error.
    #[must_use]
    pub fn invalid_option(
        flag: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOptionValue {
            flag: flag.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Limits
// ============================================================================

/// Size and count limits enforced by the standard rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum URL length in bytes.
    pub max_url_len: usize,
    /// Maximum number of header entries.
    pub max_headers: usize,
    /// Maximum size of one `name: value` header line.
    pub max_header_size: usize,
    /// Body limit used when the configuration sets none.
    pub max_body_size: usize,
    /// Maximum number of form fields.
    pub max_form_fields: usize,
    /// Maximum number of query parameters.
    pub max_query_params: usize,
    /// Methods accepted by [`check_method`].
    pub allowed_methods: Vec<Method>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_url_len: 8192,
            max_headers: 100,
            max_header_size: 8192,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_form_fields: 1000,
            max_query_params: 1000,
            allowed_methods: Method::ALL.to_vec(),
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

/// One validation rule.
pub type Rule = fn(&RequestConfiguration, &Limits) -> Result<(), ValidationError>;

/// The standard rules, in evaluation order.
pub const STANDARD_RULES: [Rule; 8] = [
    check_url,
    check_method,
    check_headers,
    check_body,
    check_form,
    check_query,
    check_credentials,
    check_retry,
];

/// Ordered, fail-fast list of rules plus the limits they read.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: Limits,
    rules: Vec<Rule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(Limits::default())
    }
}

impl Validator {
    /// The standard rules with custom limits.
    #[must_use]
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            rules: STANDARD_RULES.to_vec(),
        }
    }

    /// No rules at all.
    #[must_use]
    pub fn empty(limits: Limits) -> Self {
        Self {
            limits,
            rules: Vec::new(),
        }
    }

    /// Appends a rule, run after the existing ones.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Limits passed to every rule.
    #[must_use]
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Run every rule, returning the first failure.
    ///
    /// # Errors
    ///
    /// The [`ValidationError`] of the first failing rule.
    pub fn validate(&self, config: &RequestConfiguration) -> Result<(), ValidationError> {
        self.rules
            .iter()
            .try_for_each(|rule| rule(config, &self.limits))
    }
}

// ============================================================================
// Rules
// ============================================================================

/// An explicit method must be in the allow-list; no method passes.
///
/// # Errors
///
/// [`ValidationError::MethodNotAllowed`].
pub fn check_method(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    match config.explicit_method() {
        Some(method) if !limits.allowed_methods.contains(&method) => {
            Err(ValidationError::MethodNotAllowed { method })
        }
        _ => Ok(()),
    }
}

/// The URL must be present, short enough, parsable, and http(s).
///
/// # Errors
///
/// [`ValidationError::MissingUrl`], [`ValidationError::UrlTooLong`],
/// [`ValidationError::InvalidUrl`] or [`ValidationError::UnsupportedScheme`].
pub fn check_url(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    let url = config.url();
    if url.is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if url.len() > limits.max_url_len {
        return Err(ValidationError::UrlTooLong {
            length: url.len(),
            max: limits.max_url_len,
        });
    }
    let parsed = url::Url::parse(url).map_err(|err| ValidationError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ValidationError::UnsupportedScheme {
            scheme: scheme.to_string(),
        }),
    }
}

/// Header count and size limits, forbidden names, wire validity.
///
/// # Errors
///
/// [`ValidationError::TooManyHeaders`], [`ValidationError::ForbiddenHeader`],
/// [`ValidationError::InvalidHeader`] or [`ValidationError::HeaderTooLarge`].
pub fn check_headers(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    let headers = config.headers();
    if headers.len() > limits.max_headers {
        return Err(ValidationError::TooManyHeaders {
            count: headers.len(),
            max: limits.max_headers,
        });
    }
    for (name, value) in headers.iter() {
        if FORBIDDEN_HEADERS
            .iter()
            .any(|forbidden| forbidden.eq_ignore_ascii_case(name))
        {
            return Err(ValidationError::ForbiddenHeader {
                name: name.to_string(),
            });
        }
        if http::HeaderName::from_bytes(name.as_bytes()).is_err()
            || http::HeaderValue::from_str(value).is_err()
        {
            return Err(ValidationError::InvalidHeader {
                name: name.to_string(),
            });
        }
        let size = name.len() + value.len() + 2;
        if size > limits.max_header_size {
            return Err(ValidationError::HeaderTooLarge {
                name: name.to_string(),
                size,
                max: limits.max_header_size,
            });
        }
    }
    Ok(())
}

/// Body size, body/form exclusivity, and rewindability under retries.
///
/// # Errors
///
/// [`ValidationError::BodyTooLarge`], [`ValidationError::ConflictingBody`] or
/// [`ValidationError::UnrewindableBody`].
pub fn check_body(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    let body = config.body();
    let max = config.max_body_size().unwrap_or(limits.max_body_size);
    if let Some(size) = body.len()
        && size > max
    {
        return Err(ValidationError::BodyTooLarge { size, max });
    }
    if !body.is_empty() && !config.form().is_empty() {
        return Err(ValidationError::ConflictingBody);
    }
    if matches!(body, Body::Stream(_)) && config.retry().max_attempts() > 1 {
        return Err(ValidationError::UnrewindableBody {
            attempts: config.retry().max_attempts(),
        });
    }
    Ok(())
}

/// Form field count.
///
/// # Errors
///
/// [`ValidationError::TooManyFormFields`].
pub fn check_form(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    let count = config.form().len();
    if count > limits.max_form_fields {
        return Err(ValidationError::TooManyFormFields {
            count,
            max: limits.max_form_fields,
        });
    }
    Ok(())
}

/// Query parameter count.
///
/// # Errors
///
/// [`ValidationError::TooManyQueryParams`].
pub fn check_query(config: &RequestConfiguration, limits: &Limits) -> Result<(), ValidationError> {
    let count = config.query().len();
    if count > limits.max_query_params {
        return Err(ValidationError::TooManyQueryParams {
            count,
            max: limits.max_query_params,
        });
    }
    Ok(())
}

/// Basic or bearer credentials require https unless explicitly overridden.
///
/// # Errors
///
/// [`ValidationError::InsecureCredentials`].
pub fn check_credentials(
    config: &RequestConfiguration,
    _limits: &Limits,
) -> Result<(), ValidationError> {
    let auth = match config.auth() {
        Auth::None => return Ok(()),
        Auth::Basic { .. } => "basic",
        Auth::Bearer { .. } => "bearer",
    };
    if config.allow_insecure_credentials() {
        return Ok(());
    }
    match url::Url::parse(config.url()) {
        Ok(url) if url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::InsecureCredentials {
            auth,
            scheme: url.scheme().to_string(),
        }),
        // an unparsable URL is reported by check_url
        Err(_) => Ok(()),
    }
}

/// At least one attempt.
///
/// # Errors
///
/// [`ValidationError::InvalidRetryPolicy`].
pub fn check_retry(config: &RequestConfiguration, _limits: &Limits) -> Result<(), ValidationError> {
    if config.retry().max_attempts() == 0 {
        return Err(ValidationError::InvalidRetryPolicy {
            reason: "max attempts must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{OneShotBody, RetryPolicy};

    fn base() -> crate::RequestBuilder {
        RequestConfiguration::builder().url("https://example.com/api")
    }

    #[test]
    fn valid_configuration_passes() {
        let config = base()
            .header("Accept", "application/json")
            .body("x=1")
            .build();
        check!(Validator::default().validate(&config) == Ok(()));
    }

    #[test]
    fn missing_url() {
        let config = RequestConfiguration::default();
        check!(check_url(&config, &Limits::default()) == Err(ValidationError::MissingUrl));
    }

    #[test]
    fn url_length_limit() {
        let limits = Limits {
            max_url_len: 20,
            ..Limits::default()
        };
        let config = base().url("https://example.com/a/long/path").build();
        let_assert!(Err(ValidationError::UrlTooLong { max: 20, .. }) = check_url(&config, &limits));
    }

    #[test]
    fn unsupported_scheme() {
        let config = base().url("ftp://example.com/file").build();
        let_assert!(Err(err) = check_url(&config, &Limits::default()));
        insta::assert_snapshot!(err, @"unsupported URL scheme `ftp`");
    }

    #[test]
    fn method_allow_list() {
        let limits = Limits {
            allowed_methods: vec![Method::Get],
            ..Limits::default()
        };
        let config = base().method(Method::Delete).build();
        check!(
            check_method(&config, &limits)
                == Err(ValidationError::MethodNotAllowed {
                    method: Method::Delete
                })
        );

        let unset = RequestConfiguration::default();
        check!(check_method(&unset, &limits) == Ok(()));
    }

    #[test]
    fn forbidden_headers_are_rejected_in_any_case() {
        for name in ["Host", "content-length", "Transfer-Encoding"] {
            let config = base().header(name, "x").build();
            let_assert!(
                Err(ValidationError::ForbiddenHeader { .. }) =
                    check_headers(&config, &Limits::default())
            );
        }
    }

    #[test]
    fn header_limits() {
        let limits = Limits {
            max_headers: 1,
            max_header_size: 16,
            ..Limits::default()
        };
        let config = base().header("A", "1").header("B", "2").build();
        let_assert!(Err(ValidationError::TooManyHeaders { count: 2, max: 1 }) = check_headers(&config, &limits));

        let config = base().header("X-Long", "0123456789").build();
        let_assert!(Err(err) = check_headers(&config, &limits));
        insta::assert_snapshot!(err, @"header `X-Long` is 18 bytes, limit is 16");
    }

    #[test]
    fn invalid_header_name() {
        let config = base().header("Bad Name", "x").build();
        let_assert!(
            Err(ValidationError::InvalidHeader { .. }) = check_headers(&config, &Limits::default())
        );
    }

    #[test]
    fn body_limit_prefers_explicit_override() {
        let config = base().body("0123456789").max_body_size(4).build();
        check!(
            check_body(&config, &Limits::default())
                == Err(ValidationError::BodyTooLarge { size: 10, max: 4 })
        );

        let limits = Limits {
            max_body_size: 4,
            ..Limits::default()
        };
        let config = base().body("0123456789").build();
        let_assert!(Err(ValidationError::BodyTooLarge { max: 4, .. }) = check_body(&config, &limits));
    }

    #[test]
    fn stream_with_retries_is_rejected() {
        let config = base()
            .body_reader(Cursor::new(b"abc".to_vec()))
            .retry(RetryPolicy::fixed(3, Duration::ZERO))
            .build();
        check!(
            check_body(&config, &Limits::default())
                == Err(ValidationError::UnrewindableBody { attempts: 3 })
        );
    }

    #[test]
    fn stream_without_retries_is_accepted() {
        let config = base()
            .body(crate::Body::Stream(OneShotBody::new(Cursor::new(b"abc".to_vec()))))
            .build();
        check!(check_body(&config, &Limits::default()) == Ok(()));
    }

    #[test]
    fn body_and_form_conflict() {
        let config = base().body("a=1").form_text("b", "2").build();
        check!(check_body(&config, &Limits::default()) == Err(ValidationError::ConflictingBody));
    }

    #[test]
    fn field_counts() {
        let limits = Limits {
            max_form_fields: 1,
            max_query_params: 1,
            ..Limits::default()
        };
        let config = base().form_text("a", "1").form_text("b", "2").build();
        let_assert!(Err(ValidationError::TooManyFormFields { count: 2, .. }) = check_form(&config, &limits));

        let config = base().query("a", "1").query("a", "2").build();
        let_assert!(Err(ValidationError::TooManyQueryParams { count: 2, .. }) = check_query(&config, &limits));
    }

    #[test]
    fn credentials_over_plaintext() {
        let config = base()
            .url("http://example.com")
            .basic_auth("user", "pass")
            .build();
        let_assert!(Err(err) = Validator::default().validate(&config));
        insta::assert_snapshot!(err, @"refusing to send basic credentials over plaintext http");

        let config = base()
            .url("http://example.com")
            .bearer_auth("token")
            .build();
        let_assert!(Err(ValidationError::InsecureCredentials { auth: "bearer", .. }) = check_credentials(&config, &Limits::default()));
    }

    #[test]
    fn insecure_override_and_https_pass() {
        let config = base()
            .url("http://example.com")
            .basic_auth("user", "pass")
            .allow_insecure_credentials(true)
            .build();
        check!(check_credentials(&config, &Limits::default()) == Ok(()));

        let config = base().basic_auth("user", "pass").build();
        check!(check_credentials(&config, &Limits::default()) == Ok(()));
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let config = base().retry(RetryPolicy::fixed(0, Duration::ZERO)).build();
        let_assert!(Err(ValidationError::InvalidRetryPolicy { .. }) = check_retry(&config, &Limits::default()));
    }

    #[test]
    fn validation_is_fail_fast() {
        // URL is checked before headers, so the forbidden header is never reported
        let config = RequestConfiguration::builder().header("Host", "x").build();
        check!(Validator::default().validate(&config) == Err(ValidationError::MissingUrl));
    }

    #[test]
    fn custom_rules_run_after_standard_ones() {
        fn no_delete(config: &RequestConfiguration, _: &Limits) -> Result<(), ValidationError> {
            if config.method() == Method::Delete {
                return Err(ValidationError::MethodNotAllowed {
                    method: Method::Delete,
                });
            }
            Ok(())
        }

        let validator = Validator::default().with_rule(no_delete);
        let config = base().method(Method::Delete).build();
        let_assert!(Err(ValidationError::MethodNotAllowed { .. }) = validator.validate(&config));

        let empty = Validator::empty(Limits::default());
        check!(empty.validate(&RequestConfiguration::default()) == Ok(()));
    }
}
