//! Text and JSON renderings of low-coverage files.
//!
//! The text layout is fixed-width so that successive lines align:
//!
//! ```text
//! Files at or below 10% line coverage: 2
//!
//!     0.00%  LH    0/LF   20   src/a.ts
//!    10.00%  LH   10/LF  100   src/b.ts
//! ```

use std::fmt::Display;

use serde::Serialize;

use crate::config::Threshold;
use crate::coverage::ParsedFileCoverage;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format '{}'. Use 'text' or 'json'", s)),
        }
    }
}

/// Terminal decoration hooks. Implementations may only wrap the text they
/// are given, never change it.
pub trait Colorize {
    /// Files with no covered lines at all.
    fn critical(&self, text: &str) -> String;
    /// Files with some, but too little, coverage.
    fn warning(&self, text: &str) -> String;
    /// The "nothing to report" message.
    fn success(&self, text: &str) -> String;
}

pub fn format_percent(pct: f64) -> String {
    format!("{:>6.2}%", pct)
}

pub fn format_lines(covered: impl Display, total: impl Display) -> String {
    // Pre-render so the width applies to every number representation.
    format!("LH {:>4}/LF {:>4}", covered.to_string(), total.to_string())
}

pub fn format_file_line(file: &ParsedFileCoverage, colorize: Option<&dyn Colorize>) -> String {
    let line = format!(
        "{}  {}   {}",
        format_percent(file.pct()),
        format_lines(&file.lines_covered, &file.lines_total),
        file.path
    );

    match colorize {
        Some(colors) if file.pct() == 0.0 => colors.critical(&line),
        Some(colors) => colors.warning(&line),
        None => line,
    }
}

/// Render `files` in the order given; callers sort beforehand.
pub fn format_report(
    files: &[ParsedFileCoverage],
    threshold: Threshold,
    colorize: Option<&dyn Colorize>,
) -> String {
    if files.is_empty() {
        let message = format!("No files at or below {}% line coverage.", threshold);
        return match colorize {
            Some(colors) => colors.success(&message),
            None => message,
        };
    }

    let mut lines = Vec::with_capacity(files.len() + 2);
    lines.push(format!(
        "Files at or below {}% line coverage: {}",
        threshold,
        files.len()
    ));
    lines.push(String::new());
    lines.extend(
        files
            .iter()
            .map(|file| format!("  {}", format_file_line(file, colorize))),
    );
    lines.join("\n")
}

pub fn format_report_json(files: &[ParsedFileCoverage], threshold: Threshold) -> String {
    #[derive(Serialize)]
    struct JsonReport<'a> {
        threshold: Threshold,
        count: usize,
        files: &'a [ParsedFileCoverage],
    }

    let report = JsonReport {
        threshold,
        count: files.len(),
        files,
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}
