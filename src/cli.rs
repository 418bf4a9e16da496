//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use gemget_core::DEFAULT_MAX_REDIRECTS;

/// Command line file downloader for the Gemini protocol.
///
/// URLs are fetched one after another: first those given as arguments, then
/// those listed in the input file. A URL without a scheme is treated as
/// gemini://.
#[derive(Parser, Debug)]
#[command(name = "gemget")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to download
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Read URLs from a file, one per line (blank lines and # comments are skipped)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub input_file: Option<PathBuf>,

    /// Directory to save files into
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub directory: PathBuf,

    /// Output path for a single URL, or - for stdout (implies --quiet)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Maximum redirects to follow per URL; 0 disables following
    #[arg(short = 'r', long, value_name = "N", default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub redirects: u32,

    /// Maximum body size, e.g. 423, 32 KiB, 20 MB, 3M; empty or 0 means no limit
    #[arg(short = 'm', long, value_name = "SIZE")]
    pub max_size: Option<String>,

    /// Maximum seconds a transfer may take; 0 means no limit
    #[arg(short = 't', long, value_name = "SECS", default_value_t = 0)]
    pub max_time: u64,

    /// Add .gmi to Gemini documents saved without that extension
    #[arg(short = 'e', long)]
    pub add_extension: bool,

    /// Connect to this host[:port] instead of the URL's host
    #[arg(short = 'p', long, value_name = "HOST[:PORT]")]
    pub proxy: Option<String>,

    /// Skip checking the server certificate's expiry and host name
    #[arg(short = 'i', long)]
    pub insecure: bool,

    /// Continue with the next URL after one fails
    #[arg(short = 's', long)]
    pub skip: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't show the download progress spinner
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Print the response header of every request to stdout
    #[arg(long)]
    pub header: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Returns true when bodies go to standard output.
    #[must_use]
    pub fn writes_to_stdout(&self) -> bool {
        self.output.as_deref().is_some_and(|p| p.as_os_str() == "-")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["gemget", "example.com"]).unwrap();
        assert_eq!(args.urls, ["example.com"]);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.redirects, 5); // DEFAULT_MAX_REDIRECTS
        assert_eq!(args.directory, PathBuf::from("."));
        assert_eq!(args.max_time, 0);
        assert!(args.max_size.is_none());
        assert!(args.output.is_none());
        assert!(!args.skip);
        assert!(!args.insecure);
    }

    #[test]
    fn test_cli_no_urls_still_parses() {
        let args = Args::try_parse_from(["gemget"]).unwrap();
        assert!(args.urls.is_empty());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["gemget", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["gemget", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_short_flags() {
        let args = Args::try_parse_from([
            "gemget", "-f", "urls.txt", "-d", "out", "-r", "0", "-m", "20 MB", "-t", "30", "-e",
            "-p", "localhost:1965", "-s", "-q", "-i", "a.example", "b.example",
        ])
        .unwrap();
        assert_eq!(args.input_file, Some(PathBuf::from("urls.txt")));
        assert_eq!(args.directory, PathBuf::from("out"));
        assert_eq!(args.redirects, 0);
        assert_eq!(args.max_size.as_deref(), Some("20 MB"));
        assert_eq!(args.max_time, 30);
        assert!(args.add_extension);
        assert_eq!(args.proxy.as_deref(), Some("localhost:1965"));
        assert!(args.skip);
        assert!(args.quiet);
        assert!(args.insecure);
        assert_eq!(args.urls, ["a.example", "b.example"]);
    }

    #[test]
    fn test_cli_long_flags() {
        let args = Args::try_parse_from([
            "gemget",
            "--no-progress-bar",
            "--header",
            "--output",
            "-",
            "--max-time",
            "5",
            "example.com",
        ])
        .unwrap();
        assert!(args.no_progress_bar);
        assert!(args.header);
        assert!(args.writes_to_stdout());
        assert_eq!(args.max_time, 5);
    }

    #[test]
    fn test_cli_output_path_is_not_stdout() {
        let args = Args::try_parse_from(["gemget", "-o", "page.gmi", "example.com"]).unwrap();
        assert!(!args.writes_to_stdout());
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["gemget", "--help"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayHelp
        );
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let result = Args::try_parse_from(["gemget", "--version"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::DisplayVersion
        );
    }

    #[test]
    fn test_cli_invalid_redirects_rejected() {
        let result = Args::try_parse_from(["gemget", "-r", "-1", "example.com"]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["gemget", "-r", "many", "example.com"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let result = Args::try_parse_from(["gemget", "--invalid-flag"]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
    }
}
