//! Error types for the transport layer.

use thiserror::Error;

/// Errors that prevent a request from producing a response header.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The identifier uses a scheme this transport cannot speak.
    #[error("unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The identifier
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// The identifier has no host to connect to.
    #[error("no host in {url}")]
    MissingHost {
        /// The identifier
        url: String,
    },

    /// TCP connection failed (DNS, refused, unreachable).
    #[error("couldn't connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed
        address: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TCP connection did not complete in time.
    #[error("timed out connecting to {address}")]
    ConnectTimeout {
        /// `host:port` that was dialed
        address: String,
    },

    /// The host cannot be used as a TLS server name.
    #[error("invalid server name '{host}'")]
    InvalidServerName {
        /// The rejected host
        host: String,
    },

    /// TLS handshake failed.
    #[error("TLS handshake with {host} failed: {source}")]
    Handshake {
        /// Server name used for SNI
        host: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Sending the request line or reading the header failed.
    #[error("request to {url} failed: {source}")]
    Request {
        /// The identifier
        url: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The header line is not `<two digits> <meta>`.
    #[error("malformed response header from {url}: {reason}")]
    MalformedHeader {
        /// The identifier
        url: String,
        /// What was wrong with it
        reason: String,
    },

    /// The header line exceeded the protocol maximum.
    #[error("response header from {url} is longer than {limit} bytes")]
    HeaderTooLong {
        /// The identifier
        url: String,
        /// Maximum header length including CRLF
        limit: usize,
    },

    /// The TLS client could not be configured.
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
}

impl TransportError {
    /// Creates a `MalformedHeader` error.
    #[must_use]
    pub fn malformed_header(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `Request` error.
    #[must_use]
    pub fn request(url: &str, source: std::io::Error) -> Self {
        Self::Request {
            url: url.to_string(),
            source,
        }
    }
}
