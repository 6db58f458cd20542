//! uncov Command Line Interface
//!
//! Lists the source files whose line coverage is at or below a threshold.
//!
//! # Commands
//!
//! - `uncov` / `uncov report` - Report low-coverage files (default)
//! - `uncov init` - Bootstrap coverage scripts and config in a project
//! - `uncov check` - Verify the coverage toolchain setup

mod check;
mod init;
mod style;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use uncov_core::{run_report, Colorize, OutputFormat, PartialConfig, ReportRequest, Threshold};

/// uncov - find files with low test coverage
///
/// Reads the istanbul json-summary report and lists files at or below the
/// line-coverage threshold, lowest first.
#[derive(Parser)]
#[command(name = "uncov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    report: ReportArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Report files at or below the coverage threshold
    ///
    /// Examples:
    ///   uncov report
    ///   uncov report --threshold 50 --fail
    ///   uncov report --coverage-path reports/coverage-summary.json --json
    Report(ReportArgs),

    /// Add coverage scripts, vitest config and uncov config to a project
    Init {
        /// Overwrite existing scripts and config
        #[arg(long)]
        force: bool,

        /// Project directory
        #[arg(short = 'C', long, value_name = "DIR")]
        cwd: Option<PathBuf>,
    },

    /// Verify the coverage toolchain configuration
    Check {
        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Project directory
        #[arg(short = 'C', long, value_name = "DIR")]
        cwd: Option<PathBuf>,
    },
}

// LCOV_EXCL_START - Struct field definitions
#[derive(Args, Debug, Clone, Default)]
struct ReportArgs {
    /// Line-coverage percentage (0-100); files at or below it are listed
    #[arg(short, long, value_name = "PERCENT")]
    threshold: Option<Threshold>,

    /// Exit with status 1 when any file is at or below the threshold
    #[arg(long)]
    fail: bool,

    /// Path to coverage-summary.json
    #[arg(short, long, value_name = "PATH")]
    coverage_path: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Project directory
    #[arg(short = 'C', long, value_name = "DIR")]
    cwd: Option<PathBuf>,
}
// LCOV_EXCL_STOP

impl ReportArgs {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            threshold: self.threshold,
            exclude: None,
            fail_on_low: self.fail.then_some(true),
            coverage_path: self.coverage_path.clone(),
        }
    }

    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(args: ReportArgs) -> i32 {
    let format = args.format();
    let colors = style::TerminalColors::detect(args.no_color || format == OutputFormat::Json);
    let request = ReportRequest {
        overrides: args.overrides(),
        format,
        cwd: args.cwd,
    };

    let outcome = run_report(&request, colors.as_ref().map(|c| c as &dyn Colorize));

    if let Some(stdout) = outcome.stdout {
        println!("{}", stdout);
    }
    if let Some(stderr) = outcome.stderr {
        eprintln!("{}", stderr);
    }

    outcome.exit.code()
}

fn current_dir_or(cwd: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match cwd {
        Some(dir) => Ok(uncov_core::paths::resolve_path(dir, None)),
        None => Ok(std::env::current_dir()?),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    let code = match cli.command {
        None => report(cli.report),
        Some(Commands::Report(args)) => report(args),
        Some(Commands::Init { force, cwd }) => {
            init::run(&current_dir_or(cwd)?, force)?;
            0
        }
        Some(Commands::Check { format, cwd }) => check::run(&current_dir_or(cwd)?, format)?,
    };

    std::process::exit(code)
}
