// src/core/scanner/policy.rs

//! Exit-code tie-break policy.
//!
//! Several scanners exit non-zero when they *find* something (vulnerabilities,
//! certificate warnings) rather than when they fail. The report artifact, not
//! the exit code, decides whether a run is usable.

use tracing::{debug, warn};

use crate::core::error::AdapterFailure;
use crate::core::models::ScanResult;
use crate::core::scanner::process::{ProcessEnd, ProcessRun};
use crate::core::scanner::reports::Report;

const STDERR_TAIL: usize = 500;

/// Classifies a finished tool run.
///
/// * timed out / cancelled: failure, whatever was written to disk;
/// * any exit code with a non-empty report: success, plus a warning when the
///   exit code was non-zero;
/// * no report (missing or blank): failure carrying the process error.
pub fn apply_tie_break(
    scanner: &str,
    program: &str,
    run: &ProcessRun,
    report: Option<Report>,
) -> ScanResult {
    let duration_ms = run.elapsed.as_millis() as u64;
    let diagnostics = diagnostics(run);

    let code = match run.end {
        ProcessEnd::TimedOut(budget) => {
            return failed(scanner, duration_ms, AdapterFailure::Timeout(budget), diagnostics, run);
        }
        ProcessEnd::Cancelled => {
            return failed(scanner, duration_ms, AdapterFailure::Cancelled, diagnostics, run);
        }
        ProcessEnd::Exited { code } => code,
    };

    match report.filter(|r| !r.text.trim().is_empty()) {
        Some(report) if code == Some(0) => {
            debug!(scanner, bytes = report.text.len(), "Tool exited cleanly with a report.");
            let truncated = run.truncated() || report.truncated;
            ScanResult::success(scanner, duration_ms, report.text, diagnostics)
                .with_truncation(truncated)
        }
        Some(report) => {
            let exit = describe_exit(code);
            warn!(scanner, exit = %exit, "Tool exited non-zero but produced a report.");
            let truncated = run.truncated() || report.truncated;
            ScanResult::success(scanner, duration_ms, report.text, diagnostics)
                .with_warning(format!("{program} exited with {exit} but produced a report"))
                .with_truncation(truncated)
        }
        None => {
            let mut reason = format!("{program} exited with {}", describe_exit(code));
            let tail = stderr_tail(&run.stderr.text);
            if !tail.is_empty() {
                reason.push_str(": ");
                reason.push_str(tail);
            }
            failed(scanner, duration_ms, AdapterFailure::NoReport(reason), diagnostics, run)
        }
    }
}

/// Result for a tool that never ran (missing binary, spawn error, cancelled while waiting).
pub fn not_run(scanner: &str, failure: AdapterFailure) -> ScanResult {
    warn!(scanner, error = %failure, "Scanner did not run.");
    ScanResult::failure(scanner, 0, failure.kind(), failure.to_string(), String::new())
}

fn failed(
    scanner: &str,
    duration_ms: u64,
    failure: AdapterFailure,
    diagnostics: String,
    run: &ProcessRun,
) -> ScanResult {
    warn!(scanner, error = %failure, "Scanner failed.");
    ScanResult::failure(scanner, duration_ms, failure.kind(), failure.to_string(), diagnostics)
        .with_truncation(run.truncated())
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_tail(stderr: &str) -> &str {
    let trimmed = stderr.trim();
    let mut start = trimmed.len().saturating_sub(STDERR_TAIL);
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

fn diagnostics(run: &ProcessRun) -> String {
    let mut out = String::new();
    if !run.stdout.text.is_empty() {
        out.push_str("[stdout]\n");
        out.push_str(&run.stdout.text);
    }
    if !run.stderr.text.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("[stderr]\n");
        out.push_str(&run.stderr.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::FailureKind;
    use crate::core::scanner::process::Capture;
    use std::time::Duration;

    fn run(end: ProcessEnd, stderr: &str) -> ProcessRun {
        ProcessRun {
            end,
            stdout: Capture { text: "progress\n".into(), truncated: false },
            stderr: Capture { text: stderr.into(), truncated: false },
            elapsed: Duration::from_millis(1500),
        }
    }

    fn exited(code: Option<i32>, stderr: &str) -> ProcessRun {
        run(ProcessEnd::Exited { code }, stderr)
    }

    fn report(text: &str) -> Option<Report> {
        Some(Report {
            text: text.into(),
            truncated: false,
        })
    }

    #[test]
    fn clean_exit_with_report_succeeds() {
        let run = exited(Some(0), "");
        let result = apply_tie_break("host-discovery", "nmap", &run, report("<nmaprun/>"));
        assert!(result.succeeded);
        assert_eq!(result.raw_output, "<nmaprun/>");
        assert_eq!(result.duration_ms, 1500);
        assert!(result.warning.is_none());
        assert!(result.failure_reason.is_none());
        assert!(result.diagnostics.contains("progress"));
        assert!(!result.output_truncated);
    }

    #[test]
    fn non_zero_exit_with_report_is_success_with_warning() {
        let run = exited(Some(1), "findings");
        let result = apply_tie_break("web-surface", "nikto", &run, report("<niktoscan/>"));
        assert!(result.succeeded);
        assert_eq!(result.raw_output, "<niktoscan/>");
        assert_eq!(
            result.warning.as_deref(),
            Some("nikto exited with exit code 1 but produced a report")
        );
        assert!(result.failure_kind.is_none());
    }

    #[test]
    fn truncated_report_is_flagged() {
        let cut = Some(Report {
            text: "<nmaprun>".into(),
            truncated: true,
        });
        let result = apply_tie_break("host-discovery", "nmap", &exited(Some(0), ""), cut);
        assert!(result.succeeded);
        assert!(result.output_truncated);
    }

    #[test]
    fn missing_or_blank_report_is_failure() {
        for artifact in [None, report("   \n")] {
            let run = exited(Some(2), "connection refused");
            let result = apply_tie_break("tls-comprehensive", "testssl.sh", &run, artifact);
            assert!(!result.succeeded);
            assert_eq!(result.failure_kind, Some(FailureKind::NoReport));
            let reason = result.failure_reason.unwrap();
            assert!(reason.contains("exit code 2"));
            assert!(reason.contains("connection refused"));
        }
    }

    #[test]
    fn clean_exit_without_report_is_failure() {
        let result = apply_tie_break("tls-lightweight", "sslscan", &exited(Some(0), ""), None);
        assert!(!result.succeeded);
        assert_eq!(result.failure_kind, Some(FailureKind::NoReport));
    }

    #[test]
    fn timeout_wins_over_partial_report() {
        let timed_out = run(ProcessEnd::TimedOut(Duration::from_secs(300)), "");
        let result = apply_tie_break(
            "web-attack-simulation",
            "zap-baseline.py",
            &timed_out,
            report("<partial/>"),
        );
        assert!(!result.succeeded);
        assert_eq!(result.failure_kind, Some(FailureKind::Timeout));
        assert_eq!(result.failure_reason.as_deref(), Some("timed out after 300s"));
        assert!(result.raw_output.is_empty());
    }

    #[test]
    fn signal_exit_is_described() {
        let result = apply_tie_break("host-discovery", "nmap", &exited(None, ""), None);
        assert_eq!(
            result.failure_reason.as_deref(),
            Some("no report produced: nmap exited with a signal")
        );
    }

    #[test]
    fn not_run_records_unavailable_tool() {
        let failure = AdapterFailure::ToolUnavailable {
            program: "nmap".into(),
            cause: "No such file or directory".into(),
        };
        let result = not_run("host-discovery", failure);
        assert!(!result.succeeded);
        assert_eq!(result.failure_kind, Some(FailureKind::ToolUnavailable));
        assert_eq!(result.duration_ms, 0);
    }
}
