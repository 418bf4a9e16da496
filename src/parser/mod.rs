//! Identifier parsing and scanning.
//!
//! Raw identifiers arrive as command-line arguments and as lines of an
//! optional input file. This module normalizes them into [`url::Url`] values
//! (adding the `gemini` scheme when none is given) and merges both sources
//! into a single ordered sequence.
//!
//! # Example
//!
//! ```
//! use gemget_core::parser::{IdentifierScanner, ScanError};
//!
//! let mut scanner = IdentifierScanner::from_arguments(["example.com", "bad:99999"]);
//! assert!(scanner.advance());
//! assert_eq!(scanner.identifier().unwrap().as_str(), "gemini://example.com");
//! assert!(scanner.advance());
//! assert!(matches!(scanner.error(), Some(ScanError::Parse(_))));
//! assert!(!scanner.advance());
//! ```

mod error;
mod scanner;
mod url;

pub use error::ParseError;
pub use scanner::{IdentifierScanner, ScanError, ScanItem};
pub use self::url::{DEFAULT_SCHEME, is_candidate_line, parse_identifier};
