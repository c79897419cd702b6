//! Exit code logic for the harvester process.
//!
//! Single responsibility: map a download report to the process exit outcome.

use harvester_core::DownloadReport;

use crate::ProcessExit;

/// Determines the process exit outcome from a finished run.
///
/// Skipped descriptors count as done: a rerun over a complete directory
/// succeeds.
pub(crate) fn determine_exit_outcome(report: &DownloadReport) -> ProcessExit {
    let done = report.succeeded().len() + report.skipped().len();
    let failed = report.failed().len();
    if failed == 0 {
        ProcessExit::Success
    } else if done > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
