//! Lazy, ordered scanning of identifiers from arguments and an input file.
//!
//! The scanner walks a fixed list of arguments first and then the lines of an
//! optional reader. Each raw entry is normalized with [`parse_identifier`] as
//! it is reached, so a malformed entry is reported in its position and never
//! stops the entries after it. Lines are read as bytes; a line that is not
//! valid UTF-8 is reported in place like any other malformed entry. A read
//! failure on the line source is reported once and ends the scan.

use std::io::{self, BufRead};
use std::iter::FusedIterator;

use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use super::error::ParseError;
use super::url::{is_candidate_line, parse_identifier};

/// One element of the scanned sequence.
pub type ScanItem = Result<Url, ScanError>;

/// Errors reported in place of an identifier.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The entry at this position could not be normalized.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The line source failed; no further entries will be produced.
    #[error("failed to read input file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Arguments,
    Lines,
    Exhausted,
}

/// Produces identifiers from arguments, then from candidate lines of a reader.
///
/// Use it either as an [`Iterator`] of [`ScanItem`]s or through the
/// [`advance`](Self::advance) / [`identifier`](Self::identifier) /
/// [`error`](Self::error) cursor. Both draw from the same underlying position.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use gemget_core::parser::IdentifierScanner;
///
/// let file = Cursor::new("# saved\nc.example\n\nd.example\n");
/// let scanner = IdentifierScanner::new(["a.example", "b.example"], Some(file));
/// let hosts: Vec<String> = scanner
///     .map(|item| item.unwrap().host_str().unwrap().to_string())
///     .collect();
/// assert_eq!(hosts, ["a.example", "b.example", "c.example", "d.example"]);
/// ```
pub struct IdentifierScanner<R = io::Empty> {
    arguments: std::vec::IntoIter<String>,
    lines: Option<R>,
    phase: Phase,
    line_number: usize,
    current: Option<ScanItem>,
}

impl IdentifierScanner<io::Empty> {
    /// Creates a scanner over arguments only.
    pub fn from_arguments<I, S>(arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(arguments, None)
    }
}

impl<R: BufRead> IdentifierScanner<R> {
    /// Creates a scanner over `arguments` followed by the lines of `lines`.
    pub fn new<I, S>(arguments: I, lines: Option<R>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
        debug!(arguments = arguments.len(), has_lines = lines.is_some(), "scanner created");
        Self {
            arguments: arguments.into_iter(),
            lines,
            phase: Phase::Arguments,
            line_number: 0,
            current: None,
        }
    }

    /// Moves to the next entry. Returns `false` once the sequence is exhausted.
    ///
    /// After a `true` return exactly one of [`identifier`](Self::identifier)
    /// and [`error`](Self::error) is `Some`.
    pub fn advance(&mut self) -> bool {
        self.current = self.next_item();
        self.current.is_some()
    }

    /// The identifier at the current position, if it parsed.
    #[must_use]
    pub fn identifier(&self) -> Option<Url> {
        match &self.current {
            Some(Ok(url)) => Some(url.clone()),
            _ => None,
        }
    }

    /// The failure at the current position, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ScanError> {
        match &self.current {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns true once no further entries will be produced.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    fn next_item(&mut self) -> Option<ScanItem> {
        loop {
            match self.phase {
                Phase::Arguments => match self.arguments.next() {
                    Some(raw) => {
                        trace!(raw = %raw, "scanning argument");
                        return Some(parse_identifier(&raw).map_err(ScanError::from));
                    }
                    None => {
                        self.phase = if self.lines.is_some() {
                            Phase::Lines
                        } else {
                            Phase::Exhausted
                        };
                    }
                },
                Phase::Lines => {
                    let Some(reader) = self.lines.as_mut() else {
                        self.phase = Phase::Exhausted;
                        continue;
                    };
                    let mut line = Vec::new();
                    match reader.read_until(b'\n', &mut line) {
                        Ok(0) => {
                            debug!(lines = self.line_number, "input file exhausted");
                            self.finish();
                        }
                        Ok(_) => {
                            self.line_number += 1;
                            if let Some(item) = self.scan_line(&line) {
                                return Some(item);
                            }
                        }
                        Err(e) => {
                            debug!(line = self.line_number + 1, error = %e, "input file read failed");
                            self.finish();
                            return Some(Err(ScanError::Io(e)));
                        }
                    }
                }
                Phase::Exhausted => return None,
            }
        }
    }

    fn scan_line(&self, line: &[u8]) -> Option<ScanItem> {
        let text = String::from_utf8_lossy(line);
        if !is_candidate_line(&text) {
            return None;
        }
        let raw = text.trim();
        trace!(line = self.line_number, raw, "scanning line");
        if std::str::from_utf8(line).is_err() {
            return Some(Err(
                ParseError::malformed(raw, format!("line {} is not valid UTF-8", self.line_number)).into(),
            ));
        }
        Some(parse_identifier(raw).map_err(ScanError::from))
    }

    fn finish(&mut self) {
        self.phase = Phase::Exhausted;
        self.lines = None;
    }
}

impl<R: BufRead> Iterator for IdentifierScanner<R> {
    type Item = ScanItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item()
    }
}

impl<R: BufRead> FusedIterator for IdentifierScanner<R> {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hosts(scanner: IdentifierScanner<impl BufRead>) -> Vec<String> {
        scanner
            .map(|item| item.unwrap().host_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_arguments_only() {
        let scanner = IdentifierScanner::from_arguments(["a.example", "gemini://b.example/x"]);
        assert_eq!(hosts(scanner), ["a.example", "b.example"]);
    }

    #[test]
    fn test_arguments_then_lines() {
        let file = Cursor::new("c.example\nd.example");
        let scanner = IdentifierScanner::new(["a.example", "b.example"], Some(file));
        assert_eq!(hosts(scanner), ["a.example", "b.example", "c.example", "d.example"]);
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let file = Cursor::new("\n   \n# heading\n\t# tabbed\n  e.example  \n\n");
        let scanner = IdentifierScanner::new(Vec::<String>::new(), Some(file));
        assert_eq!(hosts(scanner), ["e.example"]);
    }

    #[test]
    fn test_handles_crlf_lines() {
        let file = Cursor::new("a.example\r\nb.example\r\n");
        let scanner = IdentifierScanner::new(Vec::<String>::new(), Some(file));
        assert_eq!(hosts(scanner), ["a.example", "b.example"]);
    }

    #[test]
    fn test_invalid_utf8_line_is_reported_in_place() {
        let file = Cursor::new(&b"a.example/\ncaf\xe9.example/\n# r\xe9sum\xe9\nc.example/\n"[..]);
        let items: Vec<_> = IdentifierScanner::new(Vec::<String>::new(), Some(file)).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().as_str(), "gemini://a.example/");
        match &items[1] {
            Err(ScanError::Parse(e)) => {
                assert!(e.to_string().contains("not valid UTF-8"), "got: {e}");
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert_eq!(items[2].as_ref().unwrap().as_str(), "gemini://c.example/");
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        let mut scanner = IdentifierScanner::from_arguments(Vec::<String>::new());
        assert!(!scanner.advance());
        assert!(scanner.is_exhausted());
        assert!(scanner.identifier().is_none());
        assert!(scanner.error().is_none());
    }

    #[test]
    fn test_parse_failure_does_not_stop_scan() {
        let mut scanner =
            IdentifierScanner::from_arguments(["a.example", "b.example:99999", "c.example"]);

        assert!(scanner.advance());
        assert_eq!(scanner.identifier().unwrap().host_str(), Some("a.example"));
        assert!(scanner.error().is_none());

        assert!(scanner.advance());
        assert!(scanner.identifier().is_none());
        assert!(matches!(scanner.error(), Some(ScanError::Parse(_))));

        assert!(scanner.advance());
        assert_eq!(scanner.identifier().unwrap().host_str(), Some("c.example"));

        assert!(!scanner.advance());
        assert!(!scanner.advance());
    }

    #[test]
    fn test_identifier_returns_owned_copy() {
        let mut scanner = IdentifierScanner::from_arguments(["a.example"]);
        assert!(scanner.advance());
        let mut first = scanner.identifier().unwrap();
        first.set_path("/changed");
        assert_eq!(scanner.identifier().unwrap().path(), "");
    }
}
