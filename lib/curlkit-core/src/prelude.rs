//! Prelude module for convenient imports.
//!
//! ```
//! use curlkit_core::prelude::*;
//! ```

pub use crate::{
    Auth, Body, Error, ErrorKind, Headers, Method, Request, RequestBuilder, RequestConfiguration,
    Response, Result, RetryPolicy, Transport, TransportHandle, ValidationError, Validator,
    Variables, parse_args, parse_command,
};
