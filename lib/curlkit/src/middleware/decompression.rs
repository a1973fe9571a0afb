//! Response decompression middleware (`--compressed`).
//!
//! Adds an `Accept-Encoding` header to requests and decodes gzip, deflate,
//! br (brotli) or zstd response bodies based on their `Content-Encoding`.

use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};

use crate::{Error, Request, Response, Result};

/// Encodings advertised in `Accept-Encoding`.
pub const ACCEPT_ENCODING: &str = "gzip, deflate, br, zstd";

/// Layer that enables automatic response decompression.
///
/// # Example
///
/// ```ignore
/// use curlkit::middleware::DecompressionLayer;
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .layer(DecompressionLayer::new())
///     .service(transport);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DecompressionLayer {
    _private: (),
}

impl DecompressionLayer {
    /// Create a new decompression layer.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl<S> Layer<S> for DecompressionLayer {
    type Service = Decompression<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Decompression { inner }
    }
}

/// Service that automatically decompresses HTTP responses.
#[derive(Debug, Clone)]
pub struct Decompression<S> {
    inner: S,
}

fn read_all(mut decoder: impl Read, encoding: &str) -> Result<Bytes> {
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::response(format!("{encoding} decompression failed: {e}")))?;
    Ok(Bytes::from(decompressed))
}

/// Decompress bytes based on a single encoding token.
fn decompress(encoding: &str, body: Bytes) -> Result<Bytes> {
    match encoding {
        "gzip" | "x-gzip" => read_all(flate2::read::GzDecoder::new(body.as_ref()), encoding),
        "deflate" => read_all(flate2::read::ZlibDecoder::new(body.as_ref()), encoding),
        "br" => read_all(brotli::Decompressor::new(body.as_ref(), 4096), encoding),
        "zstd" => zstd::decode_all(body.as_ref())
            .map(Bytes::from)
            .map_err(|e| Error::response(format!("zstd decompression failed: {e}"))),
        // unknown codings pass through untouched
        _ => Ok(body),
    }
}

impl<S> Service<Request<Bytes>> for Decompression<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        if !request.headers().contains("Accept-Encoding") {
            request.headers_mut().set("Accept-Encoding", ACCEPT_ENCODING);
        }

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(request).await?;

            // HEAD and 204 replies announce an encoding without a body
            if response.body().is_empty() {
                return Ok(response);
            }
            let Some(encoding) = response.header("Content-Encoding").map(str::to_ascii_lowercase)
            else {
                return Ok(response);
            };

            let (status, mut headers, mut body) = response.into_parts();
            // codings are listed in the order they were applied
            for coding in encoding.rsplit(',').map(str::trim) {
                if !coding.is_empty() && coding != "identity" {
                    body = decompress(coding, body)?;
                }
            }

            headers.remove("Content-Encoding");
            headers.set("Content-Length", body.len().to_string());

            Ok(Response::new(status, headers, body))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use curlkit_core::Headers;
    use flate2::Compression;

    use super::*;

    #[test]
    fn decompress_unknown_encoding() {
        let body = Bytes::from("hello world");
        let result = decompress("unknown", body.clone()).expect("decompress");
        assert_eq!(result, body);
    }

    #[test]
    fn decompress_gzip() {
        let original = b"hello world";
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).expect("write");
        let compressed = encoder.finish().expect("finish");

        let result = decompress("gzip", Bytes::from(compressed)).expect("decompress");
        assert_eq!(result.as_ref(), original);
    }

    #[test]
    fn decompress_deflate() {
        let original = b"hello world";
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).expect("write");
        let compressed = encoder.finish().expect("finish");

        let result = decompress("deflate", Bytes::from(compressed)).expect("decompress");
        assert_eq!(result.as_ref(), original);
    }

    #[test]
    fn decompress_brotli() {
        let original = b"hello world";
        let mut compressed = Vec::new();
        let params = brotli::enc::BrotliEncoderParams {
            quality: 4,
            ..Default::default()
        };
        brotli::BrotliCompress(&mut original.as_ref(), &mut compressed, &params).expect("compress");

        let result = decompress("br", Bytes::from(compressed)).expect("decompress");
        assert_eq!(result.as_ref(), original);
    }

    #[test]
    fn decompress_zstd() {
        let original = b"hello world";
        let compressed = zstd::encode_all(original.as_ref(), 3).expect("compress");

        let result = decompress("zstd", Bytes::from(compressed)).expect("decompress");
        assert_eq!(result.as_ref(), original);
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("write");
        encoder.finish().expect("finish")
    }

    async fn respond_with(encoding: &'static str, body: Vec<u8>) -> Response<Bytes> {
        let service = tower::service_fn(move |request: Request<Bytes>| {
            let body = Bytes::from(body.clone());
            async move {
                let mut headers = Headers::new();
                headers.set("Content-Encoding", encoding);
                // echo what the layer sent
                for value in request.headers().get_all("Accept-Encoding") {
                    headers.append("X-Seen-Accept-Encoding", value);
                }
                Ok::<_, Error>(Response::new(200, headers, body))
            }
        });
        let request = Request::builder(
            crate::Method::Get,
            url::Url::parse("https://example.com").expect("url"),
        )
        .build();
        tower::ServiceExt::oneshot(DecompressionLayer::new().layer(service), request)
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn layer_decodes_stacked_codings() {
        let zstd_of_gzip = zstd::encode_all(gzip(b"layered").as_slice(), 3).expect("compress");
        let response = respond_with("gzip, zstd", zstd_of_gzip).await;

        assert_eq!(response.body().as_ref(), b"layered");
        assert_eq!(response.header("Content-Encoding"), None);
        assert_eq!(response.header("Content-Length"), Some("7"));
        assert_eq!(response.header("X-Seen-Accept-Encoding"), Some(ACCEPT_ENCODING));
    }

    #[tokio::test]
    async fn layer_leaves_empty_bodies_alone() {
        let response = respond_with("gzip", Vec::new()).await;

        assert!(response.body().is_empty());
        assert_eq!(response.header("Content-Encoding"), Some("gzip"));
    }

    #[test]
    fn corrupt_gzip_is_a_response_error() {
        let err = decompress("gzip", Bytes::from_static(b"not gzip")).expect_err("corrupt");
        assert!(matches!(err, Error::Response(ref msg) if msg.starts_with("gzip")));
    }
}
