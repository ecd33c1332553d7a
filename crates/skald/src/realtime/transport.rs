/// WebSocket transport for real-time sessions
///
/// Establishes the connection to the real-time endpoint: URL assembly,
/// bearer-token header, TLS mode and the handshake timeout.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
    tungstenite::{
        Message,
        http::{Request, Uri},
    },
};
use futures_util::stream::{SplitSink, SplitStream};
use tracing::{debug, info};

use crate::realtime::error::{RealtimeError, RealtimeResult};
use crate::settings::{ConnectionSettings, SslMode};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of the WebSocket stream
pub(crate) type WsWriter = SplitSink<WsStream, Message>;

/// Read half of the WebSocket stream
pub(crate) type WsReader = SplitStream<WsStream>;

/// Build the session URL from the configured endpoint.
///
/// The language is appended as a trailing path segment (unless the caller
/// already did so) and an `sdk` query parameter identifies the client
/// version to the service.
pub(crate) fn session_url(base: &str, language: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    let language = language.trim();

    let mut url = if trimmed.ends_with(&format!("/{language}")) {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{language}")
    };

    let separator = if url.contains('?') { '&' } else { '?' };
    url.push_str(&format!("{separator}sdk={}", crate::sdk_tag()));
    url
}

/// Open a WebSocket connection to the real-time endpoint.
///
/// # Arguments
/// * `settings` - Connection settings (URL, TLS mode, timeouts)
/// * `language` - Session language, appended to the URL path
/// * `bearer_token` - Token for the Authorization header, if any
///
/// # Errors
/// `RealtimeError::ConnectTimeout` if the handshake does not complete
/// within the configured timeout, `RealtimeError::AuthenticationFailed` on
/// a 401 rejection, `RealtimeError::Connection` otherwise.
pub(crate) async fn connect(
    settings: &ConnectionSettings,
    language: &str,
    bearer_token: Option<&str>,
) -> RealtimeResult<WsStream> {
    let url = session_url(&settings.url, language);
    debug!("Connection URL: {}", url);

    let uri: Uri = url
        .parse()
        .map_err(|e| RealtimeError::InvalidConfig(format!("Invalid URL: {e}")))?;

    let host = uri
        .host()
        .ok_or_else(|| RealtimeError::InvalidConfig(format!("URL has no host: {url}")))?
        .to_string();

    let mut request = Request::builder()
        .uri(uri)
        .header("Host", host)
        .header("Connection", "Upgrade")
        .header("Upgrade", "websocket")
        .header("Sec-WebSocket-Version", "13")
        .header(
            "Sec-WebSocket-Key",
            tokio_tungstenite::tungstenite::handshake::client::generate_key(),
        );

    if let Some(token) = bearer_token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let request = request.body(())?;

    let connector = tls_connector(settings.ssl_mode)?;
    let connect_future = connect_async_tls_with_config(request, None, false, connector);

    let (ws_stream, response) = tokio::time::timeout(settings.connect_timeout, connect_future)
        .await
        .map_err(|_| RealtimeError::ConnectTimeout(settings.connect_timeout))?
        .map_err(|e| {
            if let tokio_tungstenite::tungstenite::Error::Http(resp) = &e {
                if resp.status() == 401 {
                    return RealtimeError::AuthenticationFailed;
                }
            }
            RealtimeError::Connection(e.to_string())
        })?;

    info!("Connected to real-time endpoint (status: {})", response.status());
    debug!("Response headers: {:?}", response.headers());

    Ok(ws_stream)
}

/// Pick the TLS connector for the configured SSL mode.
///
/// `Regular` defers to the library default (verified TLS for wss:// URLs),
/// `Insecure` accepts any certificate, `None` forces a plain connection.
fn tls_connector(mode: SslMode) -> RealtimeResult<Option<Connector>> {
    match mode {
        SslMode::Regular => Ok(None),
        SslMode::Insecure => Ok(Some(Connector::Rustls(Arc::new(insecure_tls_config()?)))),
        SslMode::None => Ok(Some(Connector::Plain)),
    }
}

/// A rustls client config that skips certificate verification.
fn insecure_tls_config() -> RealtimeResult<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| RealtimeError::Connection(format!("TLS setup failed: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(danger::NoCertificateVerification))
        .with_no_client_auth();
    Ok(config)
}

mod danger {
    use rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, Error, SignatureScheme};

    /// Certificate verifier that accepts everything. Only reachable via
    /// `SslMode::Insecure`.
    #[derive(Debug)]
    pub(super) struct NoCertificateVerification;

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::RSA_PKCS1_SHA384,
                SignatureScheme::RSA_PKCS1_SHA512,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::RSA_PSS_SHA384,
                SignatureScheme::RSA_PSS_SHA512,
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::ECDSA_NISTP384_SHA384,
                SignatureScheme::ECDSA_NISTP521_SHA512,
                SignatureScheme::ED25519,
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_url_appends_language() {
        let url = session_url("wss://rt.example.com/v2", "en");
        assert!(url.starts_with("wss://rt.example.com/v2/en?sdk="));
    }

    #[test]
    fn test_session_url_trims_trailing_slash() {
        let url = session_url("wss://rt.example.com/v2/", "de");
        assert!(url.starts_with("wss://rt.example.com/v2/de?sdk="));
    }

    #[test]
    fn test_session_url_keeps_existing_language_segment() {
        let url = session_url("wss://rt.example.com/v2/en", "en");
        assert!(url.starts_with("wss://rt.example.com/v2/en?sdk="));
        assert!(!url.contains("/en/en"));
    }

    #[test]
    fn test_session_url_trims_language_whitespace() {
        let url = session_url("wss://rt.example.com/v2", " en ");
        assert!(url.starts_with("wss://rt.example.com/v2/en?sdk="));
    }

    #[test]
    fn test_tls_connector_modes() {
        assert!(tls_connector(SslMode::Regular).unwrap().is_none());
        assert!(matches!(
            tls_connector(SslMode::None).unwrap(),
            Some(Connector::Plain)
        ));
        assert!(matches!(
            tls_connector(SslMode::Insecure).unwrap(),
            Some(Connector::Rustls(_))
        ));
    }
}
