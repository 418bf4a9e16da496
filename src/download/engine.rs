//! Sequential fetch-and-save orchestration.
//!
//! The [`FetchEngine`] drives identifiers one at a time through the
//! [`RedirectResolver`] and the [`BoundedWriter`], applying the skip policy to
//! per-identifier failures. Local I/O failures and input-file read failures
//! always end the run. Header lines and bodies bound for standard output go
//! through a console sink, which tests replace with an in-memory buffer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gemget_core::{FetchConfig, FetchEngine, GeminiClient, IdentifierScanner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let engine = FetchEngine::new(Arc::new(GeminiClient::new()?), &config);
//! let summary = engine
//!     .process(IdentifierScanner::from_arguments(["gemini.circumlunar.space"]))
//!     .await?;
//! println!("saved {}, failed {}", summary.saved(), summary.failed());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};
use url::Url;

use super::error::{FetchError, TransferError};
use super::filename::output_path;
use super::resolver::RedirectResolver;
use super::writer::{BoundedWriter, TransferOutcome};
use crate::config::FetchConfig;
use crate::parser::{ParseError, ScanError, ScanItem};
use crate::transport::Transport;

/// A failure confined to one identifier.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The identifier could not be normalized.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The identifier could not be resolved to a success response.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The body could not be written.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// A failure that ends the whole run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The input file could not be read.
    #[error("failed to read input file: {0}")]
    Input(#[source] std::io::Error),

    /// A local file operation failed.
    #[error(transparent)]
    Local(TransferError),
}

/// Counts from a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    saved: usize,
    failed: usize,
    size_exceeded: usize,
    timed_out: usize,
    halted: bool,
}

impl RunSummary {
    /// Bodies written in full.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.saved
    }

    /// Identifiers that failed to parse, resolve, or transfer.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Bodies discarded for exceeding the byte limit.
    #[must_use]
    pub fn size_exceeded(&self) -> usize {
        self.size_exceeded
    }

    /// Transfers cut off by the duration limit.
    #[must_use]
    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    /// Identifiers processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.saved + self.failed + self.size_exceeded + self.timed_out
    }

    /// True if a failure stopped the run before the identifiers ran out.
    #[must_use]
    pub fn halted(&self) -> bool {
        self.halted
    }

    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Completed { .. } => self.saved += 1,
            TransferOutcome::SizeLimitExceeded { .. } => self.size_exceeded += 1,
            TransferOutcome::TimedOut { .. } => self.timed_out += 1,
        }
    }
}

/// Where `--header` lines and stdout bodies are written.
pub type ConsoleSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Fetches identifiers one at a time and saves their bodies.
pub struct FetchEngine {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    console: Mutex<ConsoleSink>,
}

impl FetchEngine {
    /// Creates an engine over `transport` with a copy of `config`, writing
    /// console output to the process's standard output.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &FetchConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
            console: Mutex::new(Box::new(tokio::io::stdout())),
        }
    }

    /// Replaces the console sink.
    #[must_use]
    pub fn with_console<W>(mut self, console: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.console = Mutex::new(Box::new(console));
        self
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Processes every identifier in order.
    ///
    /// Per-identifier failures are logged; without `skip_failures` the first
    /// one stops the run and the summary is marked halted. Size and time
    /// limit breaches are logged and counted but never stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Input`] when the identifier source fails to read
    /// and [`RunError::Local`] when a file cannot be created, written, or
    /// cleaned up.
    pub async fn process<I>(&self, identifiers: I) -> Result<RunSummary, RunError>
    where
        I: IntoIterator<Item = ScanItem>,
    {
        let mut summary = RunSummary::default();

        for item in identifiers {
            let result = match item {
                Ok(url) => self.fetch_one(&url).await,
                Err(ScanError::Io(e)) => return Err(RunError::Input(e)),
                Err(ScanError::Parse(e)) => Err(ItemError::Parse(e)),
            };

            match result {
                Ok(outcome) => summary.record(outcome),
                Err(ItemError::Transfer(e)) if e.is_local() => return Err(RunError::Local(e)),
                Err(e) => {
                    error!("{e}");
                    summary.failed += 1;
                    if !self.config.skip_failures {
                        summary.halted = true;
                        break;
                    }
                }
            }
        }

        debug!(
            saved = summary.saved,
            failed = summary.failed,
            size_exceeded = summary.size_exceeded,
            timed_out = summary.timed_out,
            halted = summary.halted,
            "run finished"
        );
        Ok(summary)
    }

    /// Resolves one identifier and writes its body to the configured output.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::Fetch`] when the identifier does not resolve to a
    /// success response and [`ItemError::Transfer`] when writing fails.
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn fetch_one(&self, url: &Url) -> Result<TransferOutcome, ItemError> {
        info!("Started {}", url);

        let print_header = self.config.print_header;
        let mut headers = String::new();
        let resolver = RedirectResolver::new(self.transport.as_ref(), &self.config);
        let resolved = resolver
            .resolve(url, |_, status, meta| {
                if print_header {
                    headers.push_str(&format!("Header: {status} {meta}\n"));
                }
            })
            .await;
        if !headers.is_empty() {
            self.print(&headers).await?;
        }
        let resolved = resolved?;

        let writer = BoundedWriter::new(&self.config);
        let final_url = resolved.url;
        let destination = output_path(
            &self.config.output,
            &final_url,
            &resolved.meta,
            self.config.add_extension,
        );

        let Some(path) = destination else {
            let mut console = self.console.lock().await;
            let outcome = writer.write_to_stream(resolved.body, &mut *console).await?;
            if let TransferOutcome::TimedOut { .. } = outcome {
                info!("Download timed out: {}", final_url);
            }
            return Ok(outcome);
        };

        let outcome = writer.write_to_file(resolved.body, &path).await?;
        match outcome {
            TransferOutcome::Completed { bytes } => {
                info!("Saved {} from URL {}", path.display(), final_url);
                debug!(bytes, redirects = resolved.redirects, "transfer complete");
            }
            TransferOutcome::SizeLimitExceeded { .. } => {
                info!("File is larger than max size limit, deleted: {}", final_url);
            }
            TransferOutcome::TimedOut { .. } => {
                info!("Download timed out, deleted: {}", final_url);
            }
        }
        Ok(outcome)
    }

    async fn print(&self, text: &str) -> Result<(), TransferError> {
        let mut console = self.console.lock().await;
        let result = match console.write_all(text.as_bytes()).await {
            Ok(()) => console.flush().await,
            Err(e) => Err(e),
        };
        result.map_err(|source| TransferError::Write {
            destination: "-".to_string(),
            written: 0,
            source,
        })
    }
}
