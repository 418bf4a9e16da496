//! Network transport speaking the Gemini request/response exchange over TLS.
//!
//! One request is one connection: connect, handshake, send `<url>\r\n`, read a
//! single `<status> <meta>\r\n` header line, and hand the rest of the stream
//! back as the body. Server certificates are checked for validity period and
//! host name unless the client is built in insecure mode.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, ReadBuf,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::pki_types::ServerName;
use tracing::{debug, instrument, trace};
use url::{Host, Url};

use super::certificate::CapsuleCertVerifier;
use super::{Response, Transport, TransportError};

/// Port used when neither the identifier nor the proxy names one.
pub const DEFAULT_PORT: u16 = 1965;

/// Default time allowed for connecting, handshaking and reading the header.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest header line the protocol allows: status, space, 1024 bytes of meta, CRLF.
pub const MAX_HEADER_LEN: usize = 1029;

const SCHEME: &str = "gemini";

/// TLS client for `gemini://` identifiers.
#[derive(Clone)]
pub struct GeminiClient {
    connector: TlsConnector,
    timeout: Duration,
    insecure: bool,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("timeout", &self.timeout)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a certificate-checking client with the default connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TlsConfig`] if the TLS client cannot be built.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_options(DEFAULT_CONNECT_TIMEOUT, false)
    }

    /// Creates a certificate-checking client whose connect, handshake and
    /// header read are each bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TlsConfig`] if the TLS client cannot be built.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::with_options(timeout, false)
    }

    /// Creates a client with an explicit timeout. With `insecure` set, server
    /// certificates are accepted without checking expiry or host name.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::TlsConfig`] if the TLS client cannot be built.
    pub fn with_options(timeout: Duration, insecure: bool) -> Result<Self, TransportError> {
        let provider = Arc::new(ring::default_provider());
        let verifier = CapsuleCertVerifier::new(Arc::clone(&provider), insecure);
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::TlsConfig(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
            insecure,
        })
    }

    /// Returns the configured per-phase timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true when server certificates are not checked.
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        self.insecure
    }
}

#[async_trait]
impl Transport for GeminiClient {
    #[instrument(skip(self, url), fields(url = %url))]
    async fn fetch(
        &self,
        url: &Url,
        host_override: Option<&str>,
    ) -> Result<Response, TransportError> {
        if url.scheme() != SCHEME {
            return Err(TransportError::UnsupportedScheme {
                url: url.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        let host = url.host().ok_or_else(|| TransportError::MissingHost {
            url: url.to_string(),
        })?;

        let sni = match &host {
            Host::Domain(domain) => (*domain).to_string(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };
        let server_name = ServerName::try_from(sni.clone())
            .map_err(|_| TransportError::InvalidServerName { host: sni.clone() })?;

        let address = match host_override {
            Some(proxy) => with_default_port(proxy),
            None => format!("{}:{}", host, url.port().unwrap_or(DEFAULT_PORT)),
        };
        debug!(address = %address, "connecting");

        let tcp = timeout(self.timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                address: address.clone(),
            })?
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;

        let mut tls = timeout(self.timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                address: address.clone(),
            })?
            .map_err(|source| TransportError::Handshake {
                host: sni.clone(),
                source,
            })?;
        trace!("TLS handshake complete");

        let request = format!("{url}\r\n");
        tls.write_all(request.as_bytes())
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;
        tls.flush()
            .await
            .map_err(|e| TransportError::request(url.as_str(), e))?;

        let mut reader = BufReader::new(tls);
        let line = timeout(self.timeout, read_header_line(&mut reader, url.as_str()))
            .await
            .map_err(|_| {
                TransportError::request(
                    url.as_str(),
                    io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for header"),
                )
            })??;

        let (status, meta) = parse_header(url.as_str(), &line)?;
        debug!(status, meta = %meta, "received header");

        Ok(Response::new(status, meta, Box::new(EofTolerant::new(reader))))
    }
}

/// Reads one header line of at most [`MAX_HEADER_LEN`] bytes, terminator included.
/// Whatever follows stays buffered in `reader` as the start of the body.
async fn read_header_line<R>(reader: &mut R, url: &str) -> Result<Vec<u8>, TransportError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(64);
    let mut limited = reader.take(MAX_HEADER_LEN as u64);
    limited
        .read_until(b'\n', &mut line)
        .await
        .map_err(|e| TransportError::request(url, e))?;

    if !line.ends_with(b"\n") {
        if line.len() >= MAX_HEADER_LEN {
            return Err(TransportError::HeaderTooLong {
                url: url.to_string(),
                limit: MAX_HEADER_LEN,
            });
        }
        return Err(TransportError::malformed_header(
            url,
            "connection closed before end of header",
        ));
    }
    Ok(line)
}

/// Splits a raw header line (including its line terminator) into status and meta.
///
/// # Errors
///
/// Returns [`TransportError::MalformedHeader`] when the line is not UTF-8,
/// does not start with two digits, or does not separate meta with a space.
pub fn parse_header(url: &str, line: &[u8]) -> Result<(u8, String), TransportError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| TransportError::malformed_header(url, "header is not valid UTF-8"))?;
    let text = text
        .strip_suffix('\n')
        .map_or(text, |t| t.strip_suffix('\r').unwrap_or(t));

    let bytes = text.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return Err(TransportError::malformed_header(
            url,
            format!("expected a two-digit status, got '{text}'"),
        ));
    }
    let status = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');

    let rest = &text[2..];
    let meta = if rest.is_empty() {
        ""
    } else if let Some(meta) = rest.strip_prefix(' ') {
        meta
    } else {
        return Err(TransportError::malformed_header(
            url,
            "status must be followed by a space",
        ));
    };

    Ok((status, meta.trim().to_string()))
}

fn with_default_port(address: &str) -> String {
    if let Some(rest) = address.strip_prefix('[') {
        // [v6] or [v6]:port
        return match rest.split_once(']') {
            Some((_, "")) => format!("{address}:{DEFAULT_PORT}"),
            _ => address.to_string(),
        };
    }
    match address.matches(':').count() {
        0 => format!("{address}:{DEFAULT_PORT}"),
        1 => address.to_string(),
        _ => format!("[{address}]:{DEFAULT_PORT}"),
    }
}

/// Treats an abrupt end of stream as a normal end of body.
///
/// Many servers close the TCP connection without a TLS `close_notify`, which
/// rustls reports as `UnexpectedEof` after the full body has arrived.
struct EofTolerant<R> {
    inner: R,
    finished: bool,
}

impl<R> EofTolerant<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            finished: false,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for EofTolerant<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(Ok(()));
        }
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                trace!("peer closed without close_notify");
                this.finished = true;
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "gemini://example.com/";

    #[test]
    fn test_parse_header_success() {
        let (status, meta) = parse_header(URL, b"20 text/gemini; lang=en\r\n").unwrap();
        assert_eq!(status, 20);
        assert_eq!(meta, "text/gemini; lang=en");
    }

    #[test]
    fn test_parse_header_without_meta() {
        let (status, meta) = parse_header(URL, b"20\r\n").unwrap();
        assert_eq!(status, 20);
        assert_eq!(meta, "");
    }

    #[test]
    fn test_parse_header_accepts_bare_lf() {
        let (status, meta) = parse_header(URL, b"31 /moved\n").unwrap();
        assert_eq!(status, 31);
        assert_eq!(meta, "/moved");
    }

    #[test]
    fn test_parse_header_keeps_out_of_range_status() {
        let (status, _) = parse_header(URL, b"99 what\r\n").unwrap();
        assert_eq!(status, 99);
    }

    #[test]
    fn test_parse_header_rejects_non_digit_status() {
        let err = parse_header(URL, b"2x text/gemini\r\n").unwrap_err();
        assert!(matches!(err, TransportError::MalformedHeader { .. }));
        assert!(parse_header(URL, b"5\r\n").is_err());
        assert!(parse_header(URL, b"\r\n").is_err());
    }

    #[test]
    fn test_parse_header_rejects_missing_space() {
        let err = parse_header(URL, b"20text/gemini\r\n").unwrap_err();
        assert!(err.to_string().contains("space"), "got: {err}");
    }

    #[test]
    fn test_parse_header_rejects_invalid_utf8() {
        assert!(parse_header(URL, b"20 \xff\xfe\r\n").is_err());
    }

    #[tokio::test]
    async fn test_header_line_leaves_body_buffered() {
        let mut reader = BufReader::new(&b"20 text/gemini\r\n# Title\n"[..]);
        let line = read_header_line(&mut reader, URL).await.unwrap();
        assert_eq!(line, b"20 text/gemini\r\n");

        let mut body = Vec::new();
        reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"# Title\n");
    }

    #[tokio::test]
    async fn test_header_line_too_long() {
        let mut raw = b"20 ".to_vec();
        raw.extend(std::iter::repeat_n(b'x', MAX_HEADER_LEN));
        raw.extend_from_slice(b"\r\n");
        let mut reader = BufReader::new(&raw[..]);
        let err = read_header_line(&mut reader, URL).await.unwrap_err();
        assert!(matches!(err, TransportError::HeaderTooLong { .. }));
    }

    #[tokio::test]
    async fn test_header_line_cut_short() {
        let mut reader = BufReader::new(&b"20 text/gem"[..]);
        let err = read_header_line(&mut reader, URL).await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedHeader { .. }));
    }

    #[test]
    fn test_with_default_port() {
        assert_eq!(with_default_port("proxy.example"), "proxy.example:1965");
        assert_eq!(with_default_port("proxy.example:1970"), "proxy.example:1970");
        assert_eq!(with_default_port("[::1]"), "[::1]:1965");
        assert_eq!(with_default_port("[::1]:1970"), "[::1]:1970");
        assert_eq!(with_default_port("::1"), "[::1]:1965");
    }

    #[test]
    fn test_client_builds() {
        let client = GeminiClient::with_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert!(!client.is_insecure());

        let client = GeminiClient::with_options(Duration::from_secs(3), true).unwrap();
        assert!(client.is_insecure());
    }

    #[tokio::test]
    async fn test_fetch_rejects_other_schemes_without_connecting() {
        let client = GeminiClient::new().unwrap();
        let url = Url::parse("https://example.com/").unwrap();
        let err = client.fetch(&url, None).await.unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedScheme { .. }));
    }

    #[tokio::test]
    async fn test_eof_tolerant_maps_unexpected_eof_to_end() {
        let mock = tokio_test::io::Builder::new()
            .read(b"hello ")
            .read(b"world")
            .read_error(io::Error::new(io::ErrorKind::UnexpectedEof, "no close_notify"))
            .build();
        let mut body = EofTolerant::new(mock);
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn test_eof_tolerant_passes_other_errors() {
        let mock = tokio_test::io::Builder::new()
            .read(b"partial")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut body = EofTolerant::new(mock);
        let mut out = Vec::new();
        let err = body.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
