//! Resolving identifiers and saving their bodies.
//!
//! This module holds the fetch pipeline that sits on top of a
//! [`Transport`](crate::transport::Transport):
//!
//! - [`RedirectResolver`] follows redirects and turns non-success statuses into errors
//! - [`BoundedWriter`] streams a body under optional size and time limits
//! - [`file_name_for`] / [`output_path`] decide where a body is written
//! - [`FetchEngine`] processes identifiers one after another
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use gemget_core::download::{BoundedWriter, RedirectResolver};
//! use gemget_core::{FetchConfig, GeminiClient};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let client = GeminiClient::new()?;
//! let resolved = RedirectResolver::new(&client, &config)
//!     .resolve(&Url::parse("gemini://example.com/")?, |_, _, _| {})
//!     .await?;
//! let outcome = BoundedWriter::new(&config)
//!     .write_to_file(resolved.body, Path::new("index.gmi"))
//!     .await?;
//! println!("{} bytes", outcome.bytes());
//! # Ok(())
//! # }
//! ```

mod constants;
mod engine;
mod error;
mod filename;
mod resolver;
mod writer;

pub use constants::{DEFAULT_MAX_REDIRECTS, GEMINI_EXTENSION};
pub use engine::{ConsoleSink, FetchEngine, ItemError, RunError, RunSummary};
pub use error::{FetchError, TransferError};
pub use filename::{file_name_for, output_path};
pub use resolver::{RedirectResolver, Resolved};
pub use writer::{BoundedWriter, TransferOutcome};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, FetchError>` / `Result<T, TransferError>` explicitly in signatures.
