//! Error types for identifier parsing.

use thiserror::Error;

/// Errors that can occur while normalizing a raw identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string could not be parsed as a URL at all.
    #[error("invalid URL '{raw}': {reason}")]
    Malformed {
        /// The raw string as it was supplied
        raw: String,
        /// Parser message
        reason: String,
    },

    /// The URL parsed but names no host to connect to.
    #[error("invalid URL '{raw}': URL has no host")]
    NoHost {
        /// The raw string as it was supplied
        raw: String,
    },
}

impl ParseError {
    /// Creates a `Malformed` error from the underlying parser failure.
    #[must_use]
    pub fn malformed(raw: &str, reason: impl std::fmt::Display) -> Self {
        Self::Malformed {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `NoHost` error.
    #[must_use]
    pub fn no_host(raw: &str) -> Self {
        Self::NoHost {
            raw: raw.to_string(),
        }
    }

    /// Returns the raw string that failed to parse.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Malformed { raw, .. } | Self::NoHost { raw } => raw,
        }
    }
}
