//! CLI entry point for the gemget tool.

use std::process::ExitCode;

use tracing::error;

mod app;
mod cli;

/// How the process should exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every identifier was handled (saved, skipped, or stopped by a limit).
    Success,
    /// A failure stopped the run.
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_gemget().await {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
