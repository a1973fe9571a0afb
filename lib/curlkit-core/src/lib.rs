//! Core types for curlkit: from curl command text to a validated request.
//!
//! This crate is synchronous and does no I/O beyond reading `@file`
//! arguments. It provides:
//! - [`tokenize`] / [`tokenize_args`] - curl command lexing into [`Token`]s
//! - [`Variables`] - explicit `$name` / `${name}` substitution
//! - [`Converter`] / [`convert`] - tokens to a [`RequestConfiguration`]
//! - [`RequestBuilder`] - fluent construction of configurations
//! - [`Validator`] and [`Limits`] - composable, fail-fast rule checks
//! - [`Request`] / [`Response`] - wire-level types exchanged with a [`Transport`]
//! - [`Error`] and [`Result`] - error handling
//!
//! # Example
//!
//! ```
//! use curlkit_core::{Method, Variables, parse_command};
//!
//! let vars = Variables::new().with("host", "api.example.com");
//! let config = parse_command(
//!     r#"curl -H "Accept: application/json" -d 'name=x' https://$host/items"#,
//!     &vars,
//! )
//! .unwrap();
//!
//! assert_eq!(config.method(), Method::Post);
//! assert_eq!(config.url(), "https://api.example.com/items");
//! ```

mod body;
mod builder;
mod client;
mod config;
mod convert;
mod error;
mod flag;
mod headers;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod retry;
mod token;
mod tokenizer;
mod validate;
mod variables;

pub use body::{Body, OneShotBody, ReplayableBody};
pub use builder::RequestBuilder;
pub use client::{Transport, TransportFuture, TransportHandle};
pub use config::{
    Auth, FormField, FormValue, MAX_REDIRECTS_CEILING, ProxyOptions, RedirectPolicy,
    RequestConfiguration, TlsOptions,
};
pub use convert::{Converter, convert};
pub use error::{Error, ErrorKind, Result};
pub use flag::Flag;
pub use headers::Headers;
pub use method::Method;
pub use multipart::{Form, Part};
pub use request::{Request, ResponseLimit, WireRequestBuilder};
pub use response::Response;
pub use retry::{Backoff, RetryPolicy, TRANSIENT_STATUS_CODES};
pub use token::{Token, TokenKind, is_url_like};
pub use tokenizer::{tokenize, tokenize_args};
pub use validate::{
    DEFAULT_MAX_BODY_SIZE, FORBIDDEN_HEADERS, Limits, Rule, STANDARD_RULES, ValidationError,
    Validator, check_body, check_credentials, check_form, check_headers, check_method,
    check_query, check_retry, check_url,
};
pub use variables::Variables;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};

/// Tokenize, expand and convert a raw curl command.
///
/// # Errors
///
/// Any tokenizer, expansion, conversion or validation failure.
pub fn parse_command(command: &str, variables: &Variables) -> Result<RequestConfiguration> {
    let mut tokens = tokenize(command)?;
    variables.expand_tokens(&mut tokens)?;
    convert(&tokens)
}

/// Expand and convert a pre-split argument list.
///
/// # Errors
///
/// Any expansion, conversion or validation failure.
pub fn parse_args<I, S>(args: I, variables: &Variables) -> Result<RequestConfiguration>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut tokens = tokenize_args(args);
    variables.expand_tokens(&mut tokens)?;
    convert(&tokens)
}
