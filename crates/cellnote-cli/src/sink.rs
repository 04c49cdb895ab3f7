use std::io::Write;

use tracing::warn;

use cellnote_core::TaskReport;
use cellnote_core::ports::ReportSink;

/// Prints one JSON line per report on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn record(&self, report: &TaskReport) {
        let line = match serde_json::to_string(report) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, task_id = %report.task_id, "report not serializable");
                return;
            }
        };
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}") {
            warn!(error = %e, "failed to print report");
        }
    }
}
