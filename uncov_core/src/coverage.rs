//! Coverage summary model, validation, and threshold filtering.
//!
//! The input is the `coverage-summary.json` written by the istanbul
//! `json-summary` reporter: one entry per source file plus a `"total"`
//! aggregate, each holding `lines`, `statements`, `functions` and `branches`
//! metrics. Only `lines` is required. Numbers are kept as the reporter wrote
//! them; nothing is recomputed or cross-checked.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{UncovError, UncovResult};
use crate::fs_io::{self, IoOptions};

pub const TOTAL_KEY: &str = "total";

/// One coverage dimension (lines, statements, ...) of a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageMetric {
    pub total: Number,
    pub covered: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Number>,
    pub pct: Number,
}

impl CoverageMetric {
    /// Accepts an object with numeric `total`, `covered` and `pct`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self {
            total: number_field(object, "total")?,
            covered: number_field(object, "covered")?,
            skipped: number_field(object, "skipped"),
            pct: number_field(object, "pct")?,
        })
    }

    pub fn pct_value(&self) -> f64 {
        as_f64(&self.pct)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileCoverage {
    pub lines: CoverageMetric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<CoverageMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<CoverageMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<CoverageMetric>,
}

impl FileCoverage {
    /// Accepts an object whose `lines` metric is valid. The other metrics
    /// are kept when well formed and dropped otherwise.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let metric = |name: &str| object.get(name).and_then(CoverageMetric::from_value);
        Some(Self {
            lines: metric("lines")?,
            statements: metric("statements"),
            functions: metric("functions"),
            branches: metric("branches"),
        })
    }
}

/// A validated summary. The `"total"` entry is held apart from the files.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSummary {
    pub total: FileCoverage,
    pub files: BTreeMap<String, FileCoverage>,
}

/// Per-file projection used for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFileCoverage {
    pub path: String,
    pub lines_pct: Number,
    pub lines_covered: Number,
    pub lines_total: Number,
}

impl ParsedFileCoverage {
    fn project(path: &str, coverage: &FileCoverage) -> Self {
        Self {
            path: path.to_string(),
            lines_pct: coverage.lines.pct.clone(),
            lines_covered: coverage.lines.covered.clone(),
            lines_total: coverage.lines.total.clone(),
        }
    }

    pub fn pct(&self) -> f64 {
        as_f64(&self.lines_pct)
    }
}

pub fn is_valid_coverage_metric(value: &Value) -> bool {
    CoverageMetric::from_value(value).is_some()
}

pub fn is_valid_file_coverage(value: &Value) -> bool {
    FileCoverage::from_value(value).is_some()
}

/// Check the shape of an untyped summary and convert it into the typed model.
pub fn validate_coverage_summary(data: &Value) -> UncovResult<CoverageSummary> {
    let object = data.as_object().ok_or(UncovError::InvalidShape)?;

    let total = object
        .get(TOTAL_KEY)
        .and_then(FileCoverage::from_value)
        .ok_or(UncovError::MissingTotal)?;

    let files = object
        .iter()
        .filter(|(key, _)| key.as_str() != TOTAL_KEY)
        .map(|(key, value)| {
            FileCoverage::from_value(value)
                .map(|coverage| (key.clone(), coverage))
                .ok_or_else(|| UncovError::InvalidFileEntry(key.clone()))
        })
        .collect::<UncovResult<BTreeMap<_, _>>>()?;

    Ok(CoverageSummary { total, files })
}

/// Read and validate the summary at `path`.
pub fn parse_coverage_summary(path: impl AsRef<Path>) -> UncovResult<CoverageSummary> {
    // The summary may live outside the project, so the read is unguarded.
    let data: Value = fs_io::read_json(path, &IoOptions::unguarded())?;
    validate_coverage_summary(&data)
}

/// Files whose line coverage is at or below `threshold`, in summary order.
pub fn filter_below_threshold(summary: &CoverageSummary, threshold: f64) -> Vec<ParsedFileCoverage> {
    summary
        .files
        .iter()
        .filter(|(_, coverage)| coverage.lines.pct_value() <= threshold)
        .map(|(path, coverage)| ParsedFileCoverage::project(path, coverage))
        .collect()
}

/// A copy of `files` ordered by ascending line coverage. Ties keep their
/// input order.
pub fn sort_by_percentage(files: &[ParsedFileCoverage]) -> Vec<ParsedFileCoverage> {
    let mut sorted = files.to_vec();
    sorted.sort_by(|a, b| a.pct().total_cmp(&b.pct()));
    sorted
}

fn number_field(object: &Map<String, Value>, name: &str) -> Option<Number> {
    match object.get(name) {
        Some(Value::Number(number)) => Some(number.clone()),
        _ => None,
    }
}

fn as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}
