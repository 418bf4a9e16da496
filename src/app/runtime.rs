use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gemget_core::transport::gemini::DEFAULT_CONNECT_TIMEOUT;
use gemget_core::{FetchEngine, GeminiClient, IdentifierScanner};
use tracing::debug;

use crate::ProcessExit;
use crate::app::{exit_handler, terminal, validation};
use crate::cli::Args;

pub(crate) async fn run_gemget() -> Result<ProcessExit> {
    let args = Args::parse();
    let to_stdout = args.writes_to_stdout();

    terminal::init_tracing(terminal::resolve_default_log_level(
        args.quiet || to_stdout,
        args.verbose,
    ));
    debug!(?args, "CLI arguments parsed");

    let show_progress = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress_bar,
        to_stdout,
        terminal::is_dumb_terminal(),
    );
    let config = validation::build_config(&args, show_progress)?;
    debug!(?config, "fetch configuration ready");

    let lines = validation::open_input(&args)?;
    let scanner = IdentifierScanner::new(args.urls, lines);

    let client = GeminiClient::with_options(DEFAULT_CONNECT_TIMEOUT, config.insecure)
        .context("Couldn't set up the TLS client")?;
    let engine = FetchEngine::new(Arc::new(client), &config);
    let summary = engine.process(scanner).await?;

    debug!(
        saved = summary.saved(),
        failed = summary.failed(),
        size_exceeded = summary.size_exceeded(),
        timed_out = summary.timed_out(),
        "gemget finished"
    );
    Ok(exit_handler::determine_exit_outcome(&summary))
}
