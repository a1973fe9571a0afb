//! HTTPS connector using rustls, with optional proxy tunnelling.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use base64::Engine;
use curlkit_core::{Error, ProxyOptions, Result, TlsOptions};
use http::{HeaderValue, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::connect::proxy::Tunnel;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tower_service::Service;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// TCP route to the origin: direct, or through an HTTP `CONNECT` tunnel.
#[derive(Clone)]
pub enum Route {
    /// Connect straight to the origin.
    Direct(HttpConnector),
    /// Connect through a proxy.
    Tunnel(Tunnel<HttpConnector>),
}

type Stream = <HttpConnector as Service<Uri>>::Response;

impl Service<Uri> for Route {
    type Response = Stream;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Stream, BoxError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), BoxError>> {
        match self {
            Self::Direct(http) => http.poll_ready(cx).map_err(Into::into),
            Self::Tunnel(tunnel) => tunnel.poll_ready(cx).map_err(Into::into),
        }
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        match self {
            Self::Direct(http) => {
                let connecting = http.call(dst);
                Box::pin(async move { connecting.await.map_err(Into::into) })
            }
            Self::Tunnel(tunnel) => {
                let connecting = tunnel.call(dst);
                Box::pin(async move { connecting.await.map_err(Into::into) })
            }
        }
    }
}

/// Create an HTTPS connector for the given TLS, proxy and connect-timeout
/// settings.
///
/// Supports HTTP/1.1 and HTTP/2. Server certificates are checked against the
/// Mozilla roots plus any `--cacert` bundle, unless `insecure` is set.
///
/// # Errors
///
/// Fails when TLS material cannot be loaded or the proxy URL is invalid.
pub fn https_connector(
    tls: &TlsOptions,
    proxy: Option<&ProxyOptions>,
    connect_timeout: Option<Duration>,
) -> Result<HttpsConnector<Route>> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(connect_timeout);

    let route = match proxy {
        Some(proxy) => Route::Tunnel(tunnel(proxy, http)?),
        None => Route::Direct(http),
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(tls_config(tls)?)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(route))
}

fn tunnel(proxy: &ProxyOptions, http: HttpConnector) -> Result<Tunnel<HttpConnector>> {
    let url = if proxy.url.contains("://") {
        proxy.url.clone()
    } else {
        format!("http://{}", proxy.url)
    };
    let uri: Uri = url
        .parse()
        .map_err(|e| Error::connection(format!("invalid proxy `{}`: {e}", proxy.url)))?;

    let tunnel = Tunnel::new(uri, http);
    let Some(username) = &proxy.username else {
        return Ok(tunnel);
    };
    let credentials = format!("{username}:{}", proxy.password.as_deref().unwrap_or_default());
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    let mut value = HeaderValue::try_from(format!("Basic {encoded}"))
        .map_err(|e| Error::connection(format!("invalid proxy credentials: {e}")))?;
    value.set_sensitive(true);
    Ok(tunnel.with_auth(value))
}

/// Build the rustls client configuration.
///
/// # Errors
///
/// Fails when a CA bundle, certificate or key cannot be read or parsed.
pub fn tls_config(tls: &TlsOptions) -> Result<rustls::ClientConfig> {
    let builder = rustls::ClientConfig::builder();

    let builder = if tls.insecure {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
    } else {
        let mut roots: rustls::RootCertStore =
            webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
        if let Some(path) = &tls.ca_cert {
            for cert in load_certs(path)? {
                roots
                    .add(cert)
                    .map_err(|e| Error::tls(format!("{}: {e}", path.display())))?;
            }
        }
        builder.with_root_certificates(roots)
    };

    let Some(cert_path) = &tls.client_cert else {
        return Ok(builder.with_no_client_auth());
    };
    let certs = load_certs(cert_path)?;
    // curl accepts the key bundled in the certificate file
    let key_path = tls.client_key.as_deref().unwrap_or(cert_path);
    let key = PrivateKeyDer::from_pem_file(key_path)
        .map_err(|e| Error::tls(format!("{}: {e}", key_path.display())))?;

    builder
        .with_client_auth_cert(certs, key)
        .map_err(|e| Error::tls(e.to_string()))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .and_then(|certs| certs.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(|e| Error::tls(format!("{}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(Error::tls(format!("{}: no certificates found", path.display())));
    }
    Ok(certs)
}

/// Certificate verifier for `-k`: any chain is accepted, signatures are
/// still checked.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
