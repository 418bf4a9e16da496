//! Bounded copying of response bodies to files or standard output.
//!
//! The byte ceiling is enforced by reading at most one byte more than the
//! limit: reaching that extra byte proves the body is too large without
//! buffering it. The duration ceiling is a deadline around the whole copy;
//! when it fires the copy future is dropped, which closes the body.

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tracing::{debug, instrument};

use super::constants::COPY_BUFFER_SIZE;
use super::error::TransferError;
use crate::config::{FetchConfig, TransferLimits};

const STDOUT_LABEL: &str = "-";

/// How a transfer ended when no I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The whole body was written.
    Completed {
        /// Bytes written
        bytes: u64,
    },
    /// The body was larger than the byte limit; a file destination was removed.
    SizeLimitExceeded {
        /// Bytes read before the limit was detected
        bytes: u64,
    },
    /// The deadline elapsed; a file destination was removed.
    TimedOut {
        /// Bytes written before the deadline
        bytes: u64,
    },
}

impl TransferOutcome {
    /// Bytes written to the destination.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Completed { bytes }
            | Self::SizeLimitExceeded { bytes }
            | Self::TimedOut { bytes } => *bytes,
        }
    }

    /// Returns true if the body was written in full.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Copies bodies under the configured [`TransferLimits`].
#[derive(Debug, Clone, Copy)]
pub struct BoundedWriter {
    limits: TransferLimits,
    show_progress: bool,
}

impl BoundedWriter {
    /// Creates a writer with the limits and progress setting of `config`.
    #[must_use]
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            limits: config.limits,
            show_progress: config.show_progress,
        }
    }

    /// Creates a writer with explicit limits and no progress display.
    #[must_use]
    pub fn with_limits(limits: TransferLimits) -> Self {
        Self {
            limits,
            show_progress: false,
        }
    }

    /// The limits this writer enforces.
    #[must_use]
    pub fn limits(&self) -> TransferLimits {
        self.limits
    }

    /// Streams `body` into a newly created (or truncated) file at `path`.
    ///
    /// On [`TransferOutcome::SizeLimitExceeded`] and
    /// [`TransferOutcome::TimedOut`] the file is closed and removed before
    /// returning. After a body read error the partial file is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Create`], [`TransferError::Write`] or
    /// [`TransferError::Cleanup`] for local failures, and
    /// [`TransferError::Body`] if reading the body fails.
    #[instrument(skip(self, body, path), fields(path = %path.display()))]
    pub async fn write_to_file<R>(&self, body: R, path: &Path) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        let file = File::create(path)
            .await
            .map_err(|source| TransferError::Create {
                path: path.to_path_buf(),
                source,
            })?;
        let mut sink = BufWriter::new(file);

        let progress = self.show_progress.then(download_spinner);
        let outcome = self
            .copy(body, &mut sink, &path.display().to_string(), progress.as_ref())
            .await;
        if let Some(spinner) = progress {
            spinner.finish_and_clear();
        }
        drop(sink);

        let outcome = outcome?;
        let reason = match outcome {
            TransferOutcome::Completed { .. } => return Ok(outcome),
            TransferOutcome::SizeLimitExceeded { .. } => "it was larger than the max size limit",
            TransferOutcome::TimedOut { .. } => "the download timed out",
        };
        debug!(reason, "removing partial file");
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| TransferError::Cleanup {
                path: path.to_path_buf(),
                reason,
                source,
            })?;
        Ok(outcome)
    }

    /// Streams `body` to standard output.
    ///
    /// The byte limit is not applied here: bytes already written to stdout
    /// cannot be taken back. The duration limit still applies.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Write`] if stdout cannot be written and
    /// [`TransferError::Body`] if reading the body fails.
    #[instrument(skip(self, body))]
    pub async fn write_to_stdout<R>(&self, body: R) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
    {
        self.write_to_stream(body, &mut tokio::io::stdout()).await
    }

    /// Streams `body` into a stream that cannot be rewound, such as stdout.
    ///
    /// Only the duration limit applies. A timeout leaves whatever was already
    /// written in the stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Write`] if the stream fails and
    /// [`TransferError::Body`] if reading the body fails.
    pub async fn write_to_stream<R, W>(
        &self,
        body: R,
        stream: &mut W,
    ) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let unbounded = Self::with_limits(TransferLimits::new(None, self.limits.max_duration()));
        unbounded.write_to(body, stream, None).await
    }

    /// Streams `body` into an arbitrary sink under this writer's limits.
    ///
    /// `path` only labels errors; nothing is created or removed.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Write`] if the sink fails and
    /// [`TransferError::Body`] if reading the body fails.
    pub async fn write_to<R, W>(
        &self,
        body: R,
        sink: &mut W,
        path: Option<&Path>,
    ) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let label = path.map_or_else(|| STDOUT_LABEL.to_string(), |p| p.display().to_string());
        self.copy(body, sink, &label, None).await
    }

    async fn copy<R, W>(
        &self,
        body: R,
        sink: &mut W,
        destination: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<TransferOutcome, TransferError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let max_bytes = self.limits.max_bytes();
        let mut reader = body.take(max_bytes.map_or(u64::MAX, |limit| limit.saturating_add(1)));
        let mut written: u64 = 0;

        let pumped = pump(&mut reader, sink, &mut written, destination, progress);
        let result = match self.limits.max_duration() {
            Some(deadline) => {
                let timed = timeout(deadline, pumped).await;
                match timed {
                    Ok(result) => result,
                    Err(_) => {
                        debug!(written, ?deadline, "transfer deadline elapsed");
                        return Ok(TransferOutcome::TimedOut { bytes: written });
                    }
                }
            }
            None => pumped.await,
        };
        result?;

        match max_bytes {
            Some(limit) if written > limit => {
                debug!(written, limit, "body exceeds byte limit");
                Ok(TransferOutcome::SizeLimitExceeded { bytes: written })
            }
            _ => Ok(TransferOutcome::Completed { bytes: written }),
        }
    }
}

async fn pump<R, W>(
    reader: &mut R,
    sink: &mut W,
    written: &mut u64,
    destination: &str,
    progress: Option<&ProgressBar>,
) -> Result<(), TransferError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(source) => {
                // keep what already arrived
                let _ = sink.flush().await;
                return Err(TransferError::Body {
                    destination: destination.to_string(),
                    written: *written,
                    source,
                });
            }
        };
        sink.write_all(&buf[..n])
            .await
            .map_err(|source| TransferError::Write {
                destination: destination.to_string(),
                written: *written,
                source,
            })?;
        *written += n as u64;
        if let Some(spinner) = progress {
            spinner.inc(n as u64);
        }
    }
    sink.flush().await.map_err(|source| TransferError::Write {
        destination: destination.to_string(),
        written: *written,
        source,
    })
}

fn download_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} downloading {bytes} ({binary_bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
