//! Gemget Core Library
//!
//! This library provides the fetch-and-save engine behind the `gemget`
//! command-line tool, which downloads resources served over the Gemini
//! protocol.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Run configuration built once and passed to every component
//! - [`parser`] - Identifier normalization and the argument/file scanner
//! - [`transport`] - The `Transport` capability, status taxonomy, and TLS adapter
//! - [`download`] - Redirect resolution, bounded streaming writes, orchestration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod parser;
pub mod transport;

// Re-export commonly used types
pub use config::{ConfigError, FetchConfig, OutputTarget, TransferLimits, parse_byte_size};
pub use download::{
    BoundedWriter, ConsoleSink, DEFAULT_MAX_REDIRECTS, FetchEngine, FetchError, ItemError,
    RedirectResolver, Resolved, RunError, RunSummary, TransferError, TransferOutcome,
    file_name_for, output_path,
};
pub use parser::{
    DEFAULT_SCHEME, IdentifierScanner, ParseError, ScanError, ScanItem, is_candidate_line,
    parse_identifier,
};
pub use transport::{
    Body, GeminiClient, Response, StatusClass, Transport, TransportError, classify,
};
