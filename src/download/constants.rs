//! Constants for the download module (redirects, file naming, buffering).

/// Redirects followed per top-level identifier unless configured otherwise.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Extension appended to Gemini documents when requested.
pub const GEMINI_EXTENSION: &str = ".gmi";

/// Long-form extension that also counts as already marked.
pub const GEMINI_LONG_EXTENSION: &str = ".gemini";

/// MIME type prefix identifying a Gemini document.
pub const GEMINI_MIME_PREFIX: &str = "text/gemini";

/// Size of each read while copying a body.
pub const COPY_BUFFER_SIZE: usize = 16 * 1024;
