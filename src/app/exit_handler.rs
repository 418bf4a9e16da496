//! Exit code logic for the gemget process.
//!
//! Single responsibility: map a run summary to the process exit outcome.

use gemget_core::RunSummary;

use crate::ProcessExit;

/// A run that a failure stopped early exits non-zero; everything else is success.
///
/// Skipped failures and limit breaches do not change the outcome.
pub(crate) fn determine_exit_outcome(summary: &RunSummary) -> ProcessExit {
    if summary.halted() {
        ProcessExit::Failure
    } else {
        ProcessExit::Success
    }
}
