//! Output path derivation for saved bodies.

use std::path::PathBuf;

use url::Url;

use super::constants::{GEMINI_EXTENSION, GEMINI_LONG_EXTENSION, GEMINI_MIME_PREFIX};
use crate::config::OutputTarget;

/// Derives a file name from an identifier's path.
///
/// The last non-empty path segment is percent-decoded and used as-is; if
/// there is none (or it is `.`/`..`) the host name is used instead. With
/// `add_extension`, `.gmi` is appended when the name does not already end in
/// `.gmi`/`.gemini` and `meta` is empty or names `text/gemini`.
///
/// # Examples
///
/// ```
/// use gemget_core::download::file_name_for;
/// use url::Url;
///
/// let url = Url::parse("gemini://example.com/docs/intro").unwrap();
/// assert_eq!(file_name_for(&url, "text/gemini", true), "intro.gmi");
/// assert_eq!(file_name_for(&url, "text/plain", true), "intro");
/// ```
#[must_use]
pub fn file_name_for(url: &Url, meta: &str, add_extension: bool) -> String {
    let segment = url
        .path()
        .split('/')
        .rev()
        .find(|s| !s.is_empty())
        .map(decode_segment)
        .filter(|s| !s.is_empty() && s != "." && s != "..");

    let mut name = segment.unwrap_or_else(|| host_name(url));

    if add_extension && !has_gemini_extension(&name) && is_gemini_document(meta) {
        name.push_str(GEMINI_EXTENSION);
    }
    name
}

/// Resolves where a body fetched from `url` should be written.
///
/// Returns `None` for [`OutputTarget::Stdout`].
#[must_use]
pub fn output_path(
    target: &OutputTarget,
    url: &Url,
    meta: &str,
    add_extension: bool,
) -> Option<PathBuf> {
    match target {
        OutputTarget::File(path) => Some(path.clone()),
        OutputTarget::Directory(dir) => Some(dir.join(file_name_for(url, meta, add_extension))),
        OutputTarget::Stdout => None,
    }
}

fn decode_segment(segment: &str) -> String {
    let decoded = urlencoding::decode(segment)
        .map_or_else(|_| segment.to_string(), std::borrow::Cow::into_owned);
    decoded
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

fn host_name(url: &Url) -> String {
    url.host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').replace(':', "_"))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "index".to_string())
}

fn has_gemini_extension(name: &str) -> bool {
    name.ends_with(GEMINI_EXTENSION) || name.ends_with(GEMINI_LONG_EXTENSION)
}

fn is_gemini_document(meta: &str) -> bool {
    meta.is_empty() || meta.starts_with(GEMINI_MIME_PREFIX)
}
