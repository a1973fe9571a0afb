//! Copy a curl command, run it from Rust.
//!
//! curlkit turns curl command text into a validated request configuration
//! and executes it over a pooled hyper client with Tower middleware. The
//! same configuration can be built directly with [`RequestBuilder`].
//!
//! # Example
//!
//! ```ignore
//! use curlkit::prelude::*;
//!
//! let client = Client::new();
//! let vars = Variables::new().with("host", "api.example.com");
//!
//! // straight from the terminal
//! let response = client
//!     .run(r#"curl -sS -X POST --json '{"name":"x"}' https://$host/items"#, &vars)
//!     .await?;
//!
//! // or typed
//! let config = RequestConfiguration::builder()
//!     .method(Method::Post)
//!     .url("https://api.example.com/items")
//!     .json(&serde_json::json!({ "name": "x" }))?
//!     .retry_exponential(3, Duration::from_millis(200), Duration::from_secs(5))
//!     .try_build()?;
//! let response = client.execute(&config).await?;
//! ```

mod client;
mod config;
mod connector;
pub mod middleware;
mod pool;
pub mod prelude;
mod transport;

// Re-export engine types
pub use client::{Client, ClientBuilder};
pub use config::{DEFAULT_USER_AGENT, PoolConfig, PoolConfigBuilder};
pub use connector::{Route, https_connector, tls_config};
pub use pool::{ClientPool, TransportSettings};
pub use transport::{BoxedService, HyperTransport, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use curlkit_core::{
    Auth, Backoff, Body, Converter, Error, ErrorKind, Flag, Form, FormField, FormValue, Headers,
    Limits, MAX_REDIRECTS_CEILING, Method, OneShotBody, Part, ProxyOptions, RedirectPolicy, ReplayableBody, Request,
    RequestBuilder, RequestConfiguration, Response, ResponseLimit, Result, RetryPolicy,
    TRANSIENT_STATUS_CODES, TlsOptions, Token, TokenKind, Transport, TransportFuture,
    TransportHandle, ValidationError, Validator, Variables, WireRequestBuilder, convert,
    parse_args, parse_command, tokenize, tokenize_args,
};

// Re-export http types for status codes and headers
pub use curlkit_core::{StatusCode, header};
