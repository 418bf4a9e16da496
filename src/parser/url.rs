//! Normalization of raw identifier strings.

use tracing::trace;
use url::Url;

use super::error::ParseError;

/// Scheme assumed for identifiers given without one.
pub const DEFAULT_SCHEME: &str = "gemini";

/// Normalizes a raw identifier into a [`Url`].
///
/// Strings without `://` are treated as scheme-less and get `gemini://`
/// prepended; a scheme-relative `//host/path` gets `gemini:`. The result must
/// name a host.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] if the string is not a valid URL and
/// [`ParseError::NoHost`] if it parses without a host.
///
/// # Examples
///
/// ```
/// use gemget_core::parser::parse_identifier;
///
/// let url = parse_identifier("example.com/docs").unwrap();
/// assert_eq!(url.as_str(), "gemini://example.com/docs");
/// ```
pub fn parse_identifier(raw: &str) -> Result<Url, ParseError> {
    let candidate = if raw.starts_with("//") {
        format!("{DEFAULT_SCHEME}:{raw}")
    } else if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{DEFAULT_SCHEME}://{raw}")
    };
    trace!(raw, candidate = %candidate, "normalizing identifier");

    let url = Url::parse(&candidate).map_err(|e| ParseError::malformed(raw, e))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ParseError::no_host(raw)),
    }
}

/// Returns true if a line from an input file should be treated as an identifier.
///
/// Blank lines and lines whose first non-whitespace character is `#` are skipped.
#[must_use]
pub fn is_candidate_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}
