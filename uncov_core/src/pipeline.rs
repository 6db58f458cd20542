//! Report orchestration.
//!
//! Runs `LoadingConfig -> ResolvingPath -> CheckingExistence -> Parsing ->
//! Filtering -> Formatting -> Done` once, front to back. Any failure after
//! configuration loading ends the run with [`ExitStatus::Error`]; nothing is
//! retried. The outcome is returned as buffers plus an exit status so the
//! caller decides how to print it.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{load_config, PartialConfig, UncovConfig};
use crate::coverage::{filter_below_threshold, parse_coverage_summary, sort_by_percentage};
use crate::error::UncovError;
use crate::fs_io;
use crate::paths::resolve_path;
use crate::report::{format_report, format_report_json, Colorize, OutputFormat};

pub const NOT_FOUND_HINT: &str = "Run your tests with coverage first (e.g. \"vitest run --coverage\") with the json-summary reporter enabled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStage {
    LoadingConfig,
    ResolvingPath,
    CheckingExistence,
    Parsing,
    Filtering,
    Formatting,
    Done,
}

impl fmt::Display for ReportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadingConfig => "loading_config",
            Self::ResolvingPath => "resolving_path",
            Self::CheckingExistence => "checking_existence",
            Self::Parsing => "parsing",
            Self::Filtering => "filtering",
            Self::Formatting => "formatting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Nothing to report, or findings without fail-on-low.
    Success,
    /// Findings with fail-on-low set.
    LowCoverage,
    /// Coverage file missing, unreadable or malformed.
    Error,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::LowCoverage => 1,
            Self::Error => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    /// Flag values that take precedence over every config file.
    pub overrides: PartialConfig,
    pub format: OutputFormat,
    /// Project directory; the current directory when unset.
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit: ExitStatus,
}

impl ReportOutcome {
    fn stdout(text: String, exit: ExitStatus) -> Self {
        Self {
            stdout: Some(text),
            stderr: None,
            exit,
        }
    }

    fn stderr(text: String) -> Self {
        Self {
            stdout: None,
            stderr: Some(text),
            exit: ExitStatus::Error,
        }
    }
}

/// Machine-readable failure emitted on stdout in JSON mode.
#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

pub fn run_report(request: &ReportRequest, colorize: Option<&dyn Colorize>) -> ReportOutcome {
    let cwd = resolve_path(request.cwd.as_deref().unwrap_or_else(|| Path::new(".")), None);

    enter(ReportStage::LoadingConfig);
    let config = load_config(Some(request.overrides.clone()), Some(&cwd));
    debug!(
        threshold = %config.threshold,
        fail_on_low = config.fail_on_low,
        coverage_path = %config.coverage_path,
        "resolved configuration"
    );

    enter(ReportStage::ResolvingPath);
    let coverage_path = resolve_path(&config.coverage_path, Some(&cwd));

    enter(ReportStage::CheckingExistence);
    if !fs_io::file_exists(&coverage_path) {
        info!(path = %coverage_path.display(), "coverage file not found");
        return not_found(&coverage_path, request.format);
    }

    enter(ReportStage::Parsing);
    let summary = match parse_coverage_summary(&coverage_path) {
        Ok(summary) => summary,
        Err(err) => {
            info!(path = %coverage_path.display(), error = %err, kind = err.kind(), "coverage file rejected");
            return parse_failed(&coverage_path, &err, request.format);
        }
    };

    enter(ReportStage::Filtering);
    let threshold = config.threshold;
    let files = sort_by_percentage(&filter_below_threshold(&summary, threshold.value()));
    debug!(
        scanned = summary.files.len(),
        matched = files.len(),
        "filtered coverage entries"
    );

    enter(ReportStage::Formatting);
    let output = match request.format {
        OutputFormat::Json => format_report_json(&files, threshold),
        OutputFormat::Text => format_report(&files, threshold, colorize),
    };

    enter(ReportStage::Done);
    ReportOutcome::stdout(output, decide_exit(&config, files.len()))
}

fn decide_exit(config: &UncovConfig, matched: usize) -> ExitStatus {
    if matched > 0 && config.fail_on_low {
        ExitStatus::LowCoverage
    } else {
        ExitStatus::Success
    }
}

fn enter(stage: ReportStage) {
    debug!(%stage, "report stage");
}

fn error_summary(err: &UncovError) -> &'static str {
    match err {
        UncovError::Read { .. } => "Failed to read coverage file",
        UncovError::Parse { .. } => "Coverage file is not valid JSON",
        err if err.is_schema_error() => "Invalid coverage summary",
        _ => "Failed to load coverage file",
    }
}

fn not_found(path: &Path, format: OutputFormat) -> ReportOutcome {
    const SUMMARY: &str = "Coverage file not found";
    match format {
        OutputFormat::Json => ReportOutcome::stdout(
            error_json(SUMMARY, path, None),
            ExitStatus::Error,
        ),
        OutputFormat::Text => ReportOutcome::stderr(format!(
            "Error: {}: {}\n{}",
            SUMMARY,
            path.display(),
            NOT_FOUND_HINT
        )),
    }
}

fn parse_failed(path: &Path, err: &UncovError, format: OutputFormat) -> ReportOutcome {
    let summary = error_summary(err);
    match format {
        OutputFormat::Json => ReportOutcome::stdout(
            error_json(summary, path, Some(err.to_string())),
            ExitStatus::Error,
        ),
        OutputFormat::Text => {
            ReportOutcome::stderr(format!("Error: {}: {}\n{}", summary, path.display(), err))
        }
    }
}

fn error_json(summary: &str, path: &Path, details: Option<String>) -> String {
    let report = ErrorReport {
        error: summary,
        path: Some(path.display().to_string()),
        details,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| format!("{{\"error\": {:?}}}", summary))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn exit_status__codes__then_stable() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::LowCoverage.code(), 1);
        assert_eq!(ExitStatus::Error.code(), 2);
    }

    #[test]
    fn decide_exit__findings_without_fail__then_success() {
        let config = UncovConfig::default();
        assert_eq!(decide_exit(&config, 3), ExitStatus::Success);
    }

    #[test]
    fn decide_exit__findings_with_fail__then_low_coverage() {
        let config = UncovConfig {
            fail_on_low: true,
            ..Default::default()
        };
        assert_eq!(decide_exit(&config, 1), ExitStatus::LowCoverage);
        assert_eq!(decide_exit(&config, 0), ExitStatus::Success);
    }

    #[test]
    fn error_summary__each_class__then_distinct_message() {
        let read = UncovError::read("x", std::io::Error::new(std::io::ErrorKind::Other, "io"));
        assert_eq!(error_summary(&read), "Failed to read coverage file");
        assert_eq!(error_summary(&UncovError::MissingTotal), "Invalid coverage summary");
        assert_eq!(
            error_summary(&UncovError::InvalidFileEntry("a".into())),
            "Invalid coverage summary"
        );
    }

    #[test]
    fn not_found__json__then_error_and_path_only() {
        let outcome = not_found(Path::new("/p/coverage.json"), OutputFormat::Json);
        assert_eq!(outcome.exit, ExitStatus::Error);
        let value: serde_json::Value =
            serde_json::from_str(outcome.stdout.as_deref().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "Coverage file not found", "path": "/p/coverage.json"})
        );
    }

    #[test]
    fn not_found__text__then_hint_on_stderr() {
        let outcome = not_found(Path::new("/p/coverage.json"), OutputFormat::Text);
        assert!(outcome.stdout.is_none());
        let stderr = outcome.stderr.unwrap();
        assert!(stderr.contains("/p/coverage.json"));
        assert!(stderr.contains(NOT_FOUND_HINT));
    }

    #[test]
    fn report_stage__display__then_snake_case() {
        assert_eq!(ReportStage::CheckingExistence.to_string(), "checking_existence");
    }
}
