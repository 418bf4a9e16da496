//! Redirect resolution and status classification.
//!
//! [`RedirectResolver::resolve`] turns one top-level identifier into a success
//! response by issuing requests in a loop, following redirects until the
//! configured bound. The redirect depth is a local counter, so every
//! top-level identifier starts from zero.

use tracing::{debug, info, instrument};
use url::Url;

use super::error::FetchError;
use crate::config::FetchConfig;
use crate::parser::DEFAULT_SCHEME;
use crate::transport::{Body, StatusClass, Transport};

/// A success response ready to be written.
pub struct Resolved {
    /// The identifier that produced the body (after any redirects).
    pub url: Url,
    /// Success status code (`2x`).
    pub status: u8,
    /// MIME type of the body.
    pub meta: String,
    /// The body stream.
    pub body: Body,
    /// Number of redirects followed to get here.
    pub redirects: u32,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("url", &self.url.as_str())
            .field("status", &self.status)
            .field("meta", &self.meta)
            .field("redirects", &self.redirects)
            .finish_non_exhaustive()
    }
}

/// Follows redirects for one identifier at a time.
pub struct RedirectResolver<'a> {
    transport: &'a dyn Transport,
    proxy: Option<&'a str>,
    max_redirects: u32,
}

impl<'a> RedirectResolver<'a> {
    /// Creates a resolver using `transport` and the redirect/proxy settings of `config`.
    #[must_use]
    pub fn new(transport: &'a dyn Transport, config: &'a FetchConfig) -> Self {
        Self {
            transport,
            proxy: config.proxy.as_deref(),
            max_redirects: config.max_redirects,
        }
    }

    /// Resolves `url` to a success response.
    ///
    /// `on_header` is called with the requested identifier, status and meta of
    /// every response received, including redirects and failures.
    ///
    /// Bodies of non-success responses are dropped before this returns.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] for transport failures, non-success statuses,
    /// and redirects that cannot or may not be followed. Nothing is retried.
    #[instrument(skip(self, url, on_header), fields(url = %url))]
    pub async fn resolve<F>(&self, url: &Url, mut on_header: F) -> Result<Resolved, FetchError>
    where
        F: FnMut(&Url, u8, &str),
    {
        let mut current = url.clone();
        let mut depth: u32 = 0;

        loop {
            let response = self
                .transport
                .fetch(&current, self.proxy)
                .await
                .map_err(|e| FetchError::transport(current.as_str(), e))?;

            let status = response.status;
            on_header(&current, status, &response.meta);
            debug!(status, meta = %response.meta, depth, "response received");

            match response.class() {
                StatusClass::Success => {
                    return Ok(Resolved {
                        url: current,
                        status,
                        meta: response.meta,
                        body: response.body,
                        redirects: depth,
                    });
                }
                StatusClass::Redirect => {
                    let target = response.meta;
                    drop(response.body);
                    current = self.follow(&current, &target, depth)?;
                    depth += 1;
                    info!("Redirected to {}", current);
                }
                StatusClass::InputRequired => {
                    return Err(FetchError::InputRequired {
                        url: current.to_string(),
                        status,
                        prompt: response.meta,
                    });
                }
                StatusClass::TemporaryFailure => {
                    return Err(FetchError::TemporaryFailure {
                        url: current.to_string(),
                        status,
                        meta: response.meta,
                    });
                }
                StatusClass::PermanentFailure => {
                    return Err(FetchError::PermanentFailure {
                        url: current.to_string(),
                        status,
                        meta: response.meta,
                    });
                }
                StatusClass::CertificateRequired => {
                    return Err(FetchError::CertificateRequired {
                        url: current.to_string(),
                        status,
                    });
                }
                StatusClass::Invalid => {
                    return Err(FetchError::InvalidStatus {
                        url: current.to_string(),
                        status,
                    });
                }
            }
        }
    }

    /// Decides whether a redirect from `current` to `target` may be followed.
    fn follow(&self, current: &Url, target: &str, depth: u32) -> Result<Url, FetchError> {
        if self.max_redirects == 0 {
            return Err(FetchError::RedirectsDisabled {
                url: current.to_string(),
            });
        }
        if depth >= self.max_redirects {
            return Err(FetchError::TooManyRedirects {
                url: current.to_string(),
                depth,
            });
        }

        let next = current
            .join(target.trim())
            .map_err(|e| FetchError::invalid_redirect(current.as_str(), target, e))?;
        if next.scheme() != DEFAULT_SCHEME {
            return Err(FetchError::CrossProtocolRedirect {
                url: current.to_string(),
                target: next.to_string(),
            });
        }
        Ok(next)
    }
}
