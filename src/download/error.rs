//! Error types for the download module.
//!
//! Two families are kept apart: [`FetchError`] covers everything that can go
//! wrong between sending a request and obtaining a success body, and
//! [`TransferError`] covers moving that body to its destination. Only the
//! latter can touch the local filesystem, and its local variants end a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Failures while resolving an identifier to a success response.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport could not produce a response header.
    #[error("{url}: {source}")]
    Transport {
        /// The identifier being requested
        url: String,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// Status `1x`.
    #[error("This URL needs input, you should make the request again manually: {url}")]
    InputRequired {
        /// The identifier
        url: String,
        /// Status code
        status: u8,
        /// Prompt text from the server
        prompt: String,
    },

    /// Status `4x`.
    #[error("URL returned status {status} (temporary failure: {meta}), skipping: {url}")]
    TemporaryFailure {
        /// The identifier
        url: String,
        /// Status code
        status: u8,
        /// Server message
        meta: String,
    },

    /// Status `5x`.
    #[error("URL returned status {status} (permanent failure: {meta}), skipping: {url}")]
    PermanentFailure {
        /// The identifier
        url: String,
        /// Status code
        status: u8,
        /// Server message
        meta: String,
    },

    /// Status `6x`.
    #[error("{url} needs a certificate, which is not supported")]
    CertificateRequired {
        /// The identifier
        url: String,
        /// Status code
        status: u8,
    },

    /// A status outside the known families.
    #[error("URL returned status {status}, skipping: {url}")]
    InvalidStatus {
        /// The identifier
        url: String,
        /// Status code
        status: u8,
    },

    /// A redirect arrived while following is disabled.
    #[error("This URL redirects but redirects are disabled: {url}")]
    RedirectsDisabled {
        /// The identifier that redirected
        url: String,
    },

    /// The redirect bound was reached.
    #[error("URL redirected too many times: {url}")]
    TooManyRedirects {
        /// The identifier whose redirect was refused
        url: String,
        /// Redirects already followed
        depth: u32,
    },

    /// The redirect target could not be resolved against the current identifier.
    #[error("Redirect URL {target} couldn't be parsed: {reason}")]
    InvalidRedirect {
        /// The identifier that redirected
        url: String,
        /// The raw redirect target
        target: String,
        /// Parser message
        reason: String,
    },

    /// The redirect points at another protocol.
    #[error("URL {url} redirects to a different protocol: {target}")]
    CrossProtocolRedirect {
        /// The identifier that redirected
        url: String,
        /// The resolved redirect target
        target: String,
    },
}

impl FetchError {
    /// Creates a `Transport` error.
    #[must_use]
    pub fn transport(url: &str, source: TransportError) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    /// Creates an `InvalidRedirect` error.
    #[must_use]
    pub fn invalid_redirect(url: &str, target: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidRedirect {
            url: url.to_string(),
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The status code that caused this failure, if it came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u8> {
        match self {
            Self::InputRequired { status, .. }
            | Self::TemporaryFailure { status, .. }
            | Self::PermanentFailure { status, .. }
            | Self::CertificateRequired { status, .. }
            | Self::InvalidStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures while streaming a success body to its destination.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the body from the network failed.
    #[error("Issue saving {destination}, {written} bytes saved: {source}")]
    Body {
        /// Output path, or `-` for standard output
        destination: String,
        /// Bytes written before the failure
        written: u64,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The output file could not be created.
    #[error("Couldn't create file {path}: {source}")]
    Create {
        /// Output path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Writing to the destination failed.
    #[error("Issue writing {destination}, {written} bytes saved: {source}")]
    Write {
        /// Output path, or `-` for standard output
        destination: String,
        /// Bytes written before the failure
        written: u64,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A partial file could not be removed after a limit was breached.
    #[error("Tried to remove {path} after {reason}, but encountered this error: {source}")]
    Cleanup {
        /// Output path
        path: PathBuf,
        /// Why the file was being removed
        reason: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Returns true for local I/O failures (create, write, cleanup).
    ///
    /// These end the whole run; a body read failure only affects one identifier.
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Body { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_fetch_error_messages() {
        let err = FetchError::TooManyRedirects {
            url: "gemini://a/".to_string(),
            depth: 5,
        };
        assert_eq!(err.to_string(), "URL redirected too many times: gemini://a/");

        let err = FetchError::CertificateRequired {
            url: "gemini://a/".to_string(),
            status: 60,
        };
        assert!(err.to_string().contains("needs a certificate"));
        assert_eq!(err.status(), Some(60));
    }

    #[test]
    fn test_fetch_error_transport_has_no_status() {
        let err = FetchError::transport(
            "gemini://a/",
            TransportError::ConnectTimeout {
                address: "a:1965".to_string(),
            },
        );
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("a:1965"));
    }

    #[test]
    fn test_transfer_error_is_local() {
        let body = TransferError::Body {
            destination: "out".to_string(),
            written: 3,
            source: io::Error::other("reset"),
        };
        assert!(!body.is_local());

        let create = TransferError::Create {
            path: PathBuf::from("/nope/out"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(create.is_local());

        let cleanup = TransferError::Cleanup {
            path: PathBuf::from("out"),
            reason: "the download timed out",
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(cleanup.is_local());
        assert!(cleanup.to_string().contains("timed out"));
    }

    #[test]
    fn test_body_error_reports_bytes_written() {
        let err = TransferError::Body {
            destination: "page.gmi".to_string(),
            written: 1234,
            source: io::Error::other("reset"),
        };
        assert_eq!(
            err.to_string(),
            "Issue saving page.gmi, 1234 bytes saved: reset"
        );
    }
}
