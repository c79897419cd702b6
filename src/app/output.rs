//! End-of-run summary printed to stdout.

use harvester_core::DownloadReport;

/// Returns the tally line followed by one line per failed identifier.
pub(crate) fn summary_lines(report: &DownloadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} saved, {} skipped, {} failed ({} retries)",
        report.succeeded().len(),
        report.skipped().len(),
        report.failed().len(),
        report.retries()
    )];
    if !report.is_complete() {
        lines.push("Failed identifiers:".to_string());
        lines.extend(
            report
                .failed()
                .iter()
                .map(|(identifier, failure)| format!("  {identifier}: {}", failure.error)),
        );
    }
    lines
}

/// Prints the summary. In quiet mode only failures are listed.
pub(crate) fn print_summary(report: &DownloadReport, quiet: bool) {
    let lines = summary_lines(report);
    let skip = usize::from(quiet);
    for line in lines.iter().skip(skip) {
        println!("{line}");
    }
}
