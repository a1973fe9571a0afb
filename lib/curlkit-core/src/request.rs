//! Wire-level HTTP request.
//!
//! A [`Request`] is what a [`crate::Transport`] sends: a resolved method,
//! a URL with query parameters applied, final headers and a materialized
//! body. [`RequestConfiguration::to_request`] produces one.
//!
//! # Example
//!
//! ```
//! use curlkit_core::{Request, Method};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! assert_eq!(request.url().as_str(), "https://api.example.com/?page=1");
//! ```

use bytes::Bytes;

use crate::config::{FormValue, RequestConfiguration};
use crate::multipart::Form;
use crate::{Headers, Method, Result};

/// Limit on response body size, carried in [`Request::extensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLimit(pub u64);

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Option<B>,
    extensions: http::Extensions,
}

impl<B> Request<B> {
    /// Creates a new [`WireRequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> WireRequestBuilder<B> {
        WireRequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// First header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Typed per-request data for transports and middleware.
    #[must_use]
    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    /// Mutable access to extensions.
    #[must_use]
    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }

    /// Consume into (method, url, headers, body, extensions).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, Headers, Option<B>, http::Extensions) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.extensions,
        )
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct WireRequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Option<B>,
    extensions: http::Extensions,
}

impl<B> WireRequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: Headers::new(),
            body: None,
            extensions: http::Extensions::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Replaces the extensions.
    #[must_use]
    pub fn extensions(mut self, extensions: http::Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            extensions: self.extensions,
        }
    }
}

impl RequestConfiguration {
    /// Resolve this configuration into a wire request.
    ///
    /// Applies query parameters to the URL, folds cookies into a `Cookie`
    /// header, encodes form fields as `multipart/form-data`, and attaches the
    /// response size limit as a [`ResponseLimit`] extension. Authentication
    /// and the user agent are left to the execution engine.
    ///
    /// A stream body is drained here, so this succeeds once per stream.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable URL, unreadable form files or stream bodies,
    /// or a stream larger than the body limit.
    pub fn to_request(&self) -> Result<Request<Bytes>> {
        let mut url = url::Url::parse(self.url())?;
        if !self.query().is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in self.query() {
                pairs.append_pair(name, value);
            }
        }

        let mut headers = self.headers().clone();
        if !self.cookies().is_empty() {
            let cookie = self
                .cookies()
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.set("Cookie", cookie);
        }

        let body = if self.form().is_empty() {
            self.body().to_bytes(self.effective_max_body_size())?
        } else {
            let mut form = Form::new();
            for field in self.form() {
                form = match &field.value {
                    FormValue::Text(text) => form.text(&field.name, text),
                    FormValue::File(path) => form.file_from_path(&field.name, path)?,
                };
            }
            let (content_type, body) = form.into_body();
            headers.set("Content-Type", content_type);
            body
        };

        let mut extensions = http::Extensions::new();
        if let Some(limit) = self.max_response_size() {
            extensions.insert(ResponseLimit(limit));
        }

        let builder = Request::builder(self.method(), url)
            .headers(headers)
            .extensions(extensions);
        Ok(if body.is_empty() {
            builder.build()
        } else {
            builder.body(body).build()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_basic() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://api.example.com/users");
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert!(request.body().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::Get, url)
            .query("page", "1")
            .query("limit", "10")
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/users?page=1&limit=10"
        );
    }

    #[test]
    fn to_request_applies_query_cookies_and_limit() {
        let config = RequestConfiguration::builder()
            .url("https://example.com/search?x=0")
            .query("q", "rust lang")
            .query("q", "http")
            .cookie("a", "1")
            .cookie("b", "2")
            .max_response_size(1024)
            .build();

        let request = config.to_request().expect("request");
        assert_eq!(
            request.url().as_str(),
            "https://example.com/search?x=0&q=rust+lang&q=http"
        );
        assert_eq!(request.header("cookie"), Some("a=1; b=2"));
        assert_eq!(
            request.extensions().get::<ResponseLimit>(),
            Some(&ResponseLimit(1024))
        );
        assert!(request.body().is_none());
    }

    #[test]
    fn to_request_encodes_form_as_multipart() {
        let config = RequestConfiguration::builder()
            .url("https://example.com/upload")
            .form_text("name", "curlkit")
            .build();

        let request = config.to_request().expect("request");
        assert_eq!(request.method(), Method::Post);
        let content_type = request.header("content-type").expect("content type");
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8(request.body().expect("body").to_vec()).expect("utf8");
        assert!(body.contains("name=\"name\""));
        assert!(body.contains("curlkit"));
    }

    #[test]
    fn to_request_keeps_text_body() {
        let config = RequestConfiguration::builder()
            .url("https://example.com")
            .body("a=1")
            .build();

        let request = config.to_request().expect("request");
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.body().map(AsRef::as_ref), Some(&b"a=1"[..]));
    }
}
