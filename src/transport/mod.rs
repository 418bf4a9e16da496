//! The request capability the fetch engine depends on.
//!
//! Everything above this module talks to a [`Transport`]: given an
//! identifier it returns a [`Response`] made of a two-digit status, the
//! header's meta string, and a readable body stream. [`GeminiClient`] is the
//! network implementation; tests substitute scripted doubles.

mod certificate;
mod error;
pub mod gemini;
mod status;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use url::Url;

pub use error::TransportError;
pub use gemini::GeminiClient;
pub use status::{StatusClass, classify};

/// A response body. Dropping it closes the underlying stream.
pub type Body = Box<dyn AsyncRead + Send + Unpin>;

/// A parsed response header together with its body stream.
pub struct Response {
    /// Two-digit status code.
    pub status: u8,
    /// Header text after the status: MIME type, redirect target, or message.
    pub meta: String,
    /// Body stream; only meaningful for success responses.
    pub body: Body,
}

impl Response {
    /// Creates a response.
    pub fn new(status: u8, meta: impl Into<String>, body: Body) -> Self {
        Self {
            status,
            meta: meta.into(),
            body,
        }
    }

    /// The [`StatusClass`] of this response.
    #[must_use]
    pub fn class(&self) -> StatusClass {
        classify(self.status)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Performs one request and returns the response header and body.
///
/// `host_override` is a `host[:port]` to connect to instead of the
/// identifier's own host; the request line still carries the full identifier.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response header could be obtained.
    async fn fetch(&self, url: &Url, host_override: Option<&str>)
    -> Result<Response, TransportError>;
}
