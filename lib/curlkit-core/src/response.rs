//! Wire-level HTTP response.
//!
//! [`Response`] carries status, headers, and the fully read body. Decoding the
//! body into text, JSON, or a file is left to the caller.

use bytes::Bytes;

use crate::Headers;

/// Status, headers and body of a completed exchange.
///
/// The body is already decompressed when `--compressed` was in effect, and
/// is the final hop's body when redirects were followed.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: Headers,
    body: B,
}

impl<B> Response<B> {
    /// Assemble a response.
    #[must_use]
    pub fn new(status: u16, headers: Headers, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Numeric status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status as an [`http::StatusCode`], or `None` outside 100..=999.
    #[must_use]
    pub fn status_code(&self) -> Option<http::StatusCode> {
        http::StatusCode::from_u16(self.status).ok()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// First value of `name`, case-insensitive.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Split into status, headers and body.
    #[must_use]
    pub fn into_parts(self) -> (u16, Headers, B) {
        (self.status, self.headers, self.body)
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// 3xx. Only returned when redirects are not followed.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        matches!(self.status, 300..=399)
    }

    /// 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.status, 400..=499)
    }

    /// 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self.status, 500..=599)
    }

    /// Whether `--fail` turns this response into an error.
    #[must_use]
    pub const fn fails(&self) -> bool {
        self.status >= 400
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: u16) -> Response {
        Response::new(status, Headers::new(), Bytes::new())
    }

    #[test]
    fn status_classes() {
        check_class(204, [true, false, false, false]);
        check_class(302, [false, true, false, false]);
        check_class(404, [false, false, true, false]);
        check_class(503, [false, false, false, true]);
    }

    fn check_class(status: u16, expected: [bool; 4]) {
        let response = with_status(status);
        let actual = [
            response.is_success(),
            response.is_redirection(),
            response.is_client_error(),
            response.is_server_error(),
        ];
        assert_eq!(actual, expected, "status {status}");
    }

    #[test]
    fn fail_threshold_is_400() {
        assert!(!with_status(399).fails());
        assert!(with_status(400).fails());
        assert!(with_status(500).fails());
    }

    #[test]
    fn status_code_conversion() {
        assert_eq!(with_status(418).status_code(), Some(http::StatusCode::IM_A_TEAPOT));
        assert_eq!(with_status(42).status_code(), None);
    }

    #[test]
    fn repeated_headers_are_kept() {
        let headers: Headers = [("Set-Cookie", "a=1"), ("set-cookie", "b=2")].into_iter().collect();
        let response = Response::new(200, headers, Bytes::from_static(b"ok"));

        assert_eq!(response.header("SET-COOKIE"), Some("a=1"));
        assert_eq!(response.headers().get_all("set-cookie").count(), 2);

        let (status, headers, body) = response.into_parts();
        assert_eq!(status, 200);
        assert_eq!(headers.len(), 2);
        assert_eq!(body, Bytes::from_static(b"ok"));
    }
}
