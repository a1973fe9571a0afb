//! The transport seam.
//!
//! A [`Transport`] takes a wire [`Request`] and produces a wire [`Response`].
//! The execution engine uses a pooled hyper client by default; any
//! `Transport` attached to a configuration replaces it, which is how tests
//! and mocks plug in.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Boxed future returned by [`Transport::execute`].
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Something that can send one HTTP request.
///
/// Closures returning a future implement this trait:
///
/// ```
/// use bytes::Bytes;
/// use curlkit_core::{Error, Headers, Request, Response, Transport};
///
/// let transport = |_request: Request| async {
///     Ok::<_, Error>(Response::new(204, Headers::new(), Bytes::new()))
/// };
/// let _boxed: &dyn Transport = &transport;
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Execute one request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the response
    /// could not be read.
    fn execute(&self, request: Request<Bytes>) -> TransportFuture;
}

impl<F, Fut> Transport for F
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Bytes>>> + Send + 'static,
{
    fn execute(&self, request: Request<Bytes>) -> TransportFuture {
        Box::pin(self(request))
    }
}

/// Shared handle to a [`Transport`], stored in a configuration.
///
/// Two handles are equal when they point at the same transport.
#[derive(Clone)]
pub struct TransportHandle(Arc<dyn Transport>);

impl TransportHandle {
    /// Wraps a transport.
    pub fn new(transport: impl Transport) -> Self {
        Self(Arc::new(transport))
    }

    /// Wraps an already shared transport.
    #[must_use]
    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self(transport)
    }

    /// The shared transport.
    #[must_use]
    pub fn as_arc(&self) -> &Arc<dyn Transport> {
        &self.0
    }
}

impl PartialEq for TransportHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TransportHandle(..)")
    }
}
