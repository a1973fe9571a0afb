//! Tower middleware layers for the curlkit execution engine.
//!
//! The engine assembles one stack per execution from the request's
//! configuration. From the outside in:
//!
//! | Layer | Applied when |
//! |-------|--------------|
//! | [`LoggingLayer`] | always |
//! | [`RetryLayer`] with [`RetryAttempts`] | the retry policy allows more than one attempt |
//! | layers added with [`ClientBuilder::layer`](crate::ClientBuilder::layer) | always |
//! | [`AuthLayer`] | `-u` / `--oauth2-bearer` |
//! | [`FollowRedirectLayer`] | `-L` |
//! | [`DecompressionLayer`] | `--compressed` |
//!
//! Every layer works on curlkit's own [`Request`](crate::Request) and
//! [`Response`](crate::Response) types, so any of them can also be stacked
//! by hand with [`ServiceBuilder`] over a [`BoxedService`](crate::BoxedService).

mod auth;
mod decompression;
mod follow_redirect;
mod logging;
mod retry;

pub use auth::{AuthLayer, AuthService};
pub use decompression::{ACCEPT_ENCODING, Decompression, DecompressionLayer};
pub use follow_redirect::{DEFAULT_MAX_REDIRECTS, FollowRedirect, FollowRedirectLayer};
pub use logging::{Logging, LoggingLayer, Verbosity};
pub use retry::RetryAttempts;

// Re-export tower types for convenience
pub use tower::retry::RetryLayer;
pub use tower::{Layer, ServiceBuilder};
