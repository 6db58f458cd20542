//! Low line-coverage reporting.
//!
//! Reads an istanbul `coverage-summary.json`, resolves the threshold and
//! related options from layered configuration, and renders the files at or
//! below the threshold as text or JSON.

pub mod config;
pub mod coverage;
pub mod error;
pub mod fs_io;
pub mod paths;
pub mod pipeline;
pub mod report;

pub use config::{load_config, merge_configs, PartialConfig, Threshold, UncovConfig};
pub use coverage::{CoverageSummary, ParsedFileCoverage};
pub use error::{UncovError, UncovResult};
pub use pipeline::{run_report, ExitStatus, ReportOutcome, ReportRequest};
pub use report::{Colorize, OutputFormat};
