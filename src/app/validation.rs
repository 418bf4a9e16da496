//! Pre-flight checks that turn CLI arguments into a [`FetchConfig`].

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use gemget_core::{FetchConfig, OutputTarget, TransferLimits, is_candidate_line, parse_byte_size};

use crate::cli::Args;

pub(crate) fn ensure_has_input(args: &Args) -> Result<()> {
    if args.urls.is_empty() && args.input_file.is_none() {
        bail!(
            "No URLs provided.\n  \
             Pass one or more URLs as arguments, or use --input-file PATH"
        );
    }
    Ok(())
}

/// Rejects an explicit output file when more than one identifier would be
/// written to it. `from_file` is the number of candidate lines in the input file.
pub(crate) fn ensure_single_output_target(args: &Args, from_file: usize) -> Result<()> {
    let Some(output) = args.output.as_deref() else {
        return Ok(());
    };
    if args.writes_to_stdout() {
        return Ok(());
    }

    let total = args.urls.len() + from_file;
    if total > 1 {
        bail!(
            "--output {} can only be used with a single URL, but {total} were given.\n  \
             Use --directory to save several files, or --output - to write them all to stdout",
            output.display()
        );
    }
    Ok(())
}

/// Opens the input file, if any.
///
/// With an explicit output file the list is read into memory once and counted
/// there, so a pipe such as `/dev/stdin` is not drained before scanning.
pub(crate) fn open_input(args: &Args) -> Result<Option<Box<dyn BufRead + Send>>> {
    let Some(path) = args.input_file.as_deref() else {
        return Ok(None);
    };
    let mut file = File::open(path)
        .with_context(|| format!("Couldn't open input file {}", path.display()))?;

    if args.output.is_none() || args.writes_to_stdout() {
        return Ok(Some(Box::new(BufReader::new(file))));
    }

    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .with_context(|| format!("Couldn't read input file {}", path.display()))?;
    ensure_single_output_target(args, count_candidate_lines(&contents))?;
    Ok(Some(Box::new(Cursor::new(contents))))
}

fn count_candidate_lines(contents: &[u8]) -> usize {
    contents
        .split(|&b| b == b'\n')
        .filter(|line| is_candidate_line(&String::from_utf8_lossy(line)))
        .count()
}

pub(crate) fn parse_limits(max_size: Option<&str>, max_time: u64) -> Result<TransferLimits> {
    let max_bytes = match max_size {
        Some(raw) => Some(
            parse_byte_size(raw).with_context(|| format!("Invalid --max-size value '{raw}'"))?,
        ),
        None => None,
    };
    Ok(TransferLimits::new(max_bytes, Some(Duration::from_secs(max_time))))
}

/// Builds the run configuration. `show_progress` is decided by the caller.
pub(crate) fn build_config(args: &Args, show_progress: bool) -> Result<FetchConfig> {
    ensure_has_input(args)?;
    ensure_single_output_target(args, 0)?;

    let output = match args.output.as_deref() {
        Some(_) if args.writes_to_stdout() => OutputTarget::Stdout,
        Some(path) => OutputTarget::File(path.to_path_buf()),
        None => OutputTarget::Directory(args.directory.clone()),
    };

    Ok(FetchConfig {
        output,
        max_redirects: args.redirects,
        limits: parse_limits(args.max_size.as_deref(), args.max_time)?,
        add_extension: args.add_extension,
        proxy: args.proxy.clone().filter(|p| !p.trim().is_empty()),
        skip_failures: args.skip,
        show_progress,
        print_header: args.header,
        insecure: args.insecure,
    })
}
