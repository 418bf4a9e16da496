//! Run configuration for the fetch engine.
//!
//! A [`FetchConfig`] is built once (by the CLI) and passed by reference into
//! the resolver, writer and engine. Nothing in the library reads process-wide
//! state for these settings.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::download::DEFAULT_MAX_REDIRECTS;

/// Where successful response bodies are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Derive a file name per identifier and save it inside this directory.
    Directory(PathBuf),
    /// Save to exactly this path (only valid for a single identifier).
    File(PathBuf),
    /// Stream to standard output.
    Stdout,
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self::Directory(PathBuf::from("."))
    }
}

/// Optional ceilings applied to every transfer in a run.
///
/// `None` means unlimited. Zero values are normalized to `None` by [`TransferLimits::new`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferLimits {
    max_bytes: Option<u64>,
    max_duration: Option<Duration>,
}

impl TransferLimits {
    /// Creates limits, treating zero as "no limit".
    #[must_use]
    pub fn new(max_bytes: Option<u64>, max_duration: Option<Duration>) -> Self {
        Self {
            max_bytes: max_bytes.filter(|&b| b > 0),
            max_duration: max_duration.filter(|d| !d.is_zero()),
        }
    }

    /// Limits with neither a byte nor a duration ceiling.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Maximum body size in bytes, if any.
    #[must_use]
    pub fn max_bytes(&self) -> Option<u64> {
        self.max_bytes
    }

    /// Maximum transfer duration, if any.
    #[must_use]
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }
}

/// Complete configuration for one run of the fetch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Destination for response bodies.
    pub output: OutputTarget,
    /// Redirects followed per top-level identifier; 0 disables following.
    pub max_redirects: u32,
    /// Size and time ceilings for each transfer.
    pub limits: TransferLimits,
    /// Append `.gmi` to Gemini documents whose derived name lacks it.
    pub add_extension: bool,
    /// Connect to this `host[:port]` instead of the identifier's host.
    pub proxy: Option<String>,
    /// Continue with the next identifier after a per-identifier failure.
    pub skip_failures: bool,
    /// Render a progress spinner for file downloads.
    pub show_progress: bool,
    /// Print `Header: <status> <meta>` to stdout for every response.
    pub print_header: bool,
    /// Accept server certificates without checking expiry or host name.
    pub insecure: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            output: OutputTarget::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            limits: TransferLimits::unlimited(),
            add_extension: false,
            proxy: None,
            skip_failures: false,
            show_progress: false,
            print_header: false,
            insecure: false,
        }
    }
}

/// Errors produced while building configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The size string could not be understood.
    #[error("invalid size '{input}': {reason}")]
    InvalidSize {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The size is valid but does not fit in 64 bits.
    #[error("size '{input}' is too large")]
    SizeTooLarge {
        /// The rejected input.
        input: String,
    },
}

impl ConfigError {
    fn invalid_size(input: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidSize {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Parses a human-readable byte size such as `423`, `32 KiB`, `20 MB` or `3M`.
///
/// Units are case-insensitive. SI units (`k`, `kb`, `m`, `mb`, ...) are powers
/// of 1000 and IEC units (`ki`, `kib`, `mi`, `mib`, ...) powers of 1024. An
/// empty string parses as zero.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSize`] for malformed input or an unknown unit,
/// and [`ConfigError::SizeTooLarge`] when the result overflows `u64`.
pub fn parse_byte_size(input: &str) -> Result<u64, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    parse_size::parse_size(trimmed).map_err(|e| match e {
        parse_size::Error::PosOverflow => ConfigError::SizeTooLarge {
            input: input.to_string(),
        },
        other => ConfigError::invalid_size(input, other),
    })
}
