//! Prelude module for convenient imports.
//!
//! ```ignore
//! use curlkit::prelude::*;
//! ```

pub use std::time::Duration;

pub use crate::{
    Auth, Body, Client, ClientPool, Error, ErrorKind, Headers, Method, PoolConfig,
    RequestBuilder, RequestConfiguration, Response, Result, RetryPolicy, StatusCode,
    ValidationError, Variables, parse_args, parse_command,
};
