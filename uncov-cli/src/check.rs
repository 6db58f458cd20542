//! Check command for coverage toolchain health.
//!
//! Verifies that a project is set up to produce the coverage summary that
//! `uncov report` consumes.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use uncov_core::config::{load_config, MANIFEST_FILE_NAME};
use uncov_core::fs_io::{self, IoOptions};
use uncov_core::paths::resolve_path;
use uncov_core::OutputFormat;

use crate::init::{find_vitest_config, PackageManager};

const COVERAGE_PROVIDERS: [&str; 2] = ["@vitest/coverage-v8", "@vitest/coverage-istanbul"];

/// Result of a single health check
#[derive(Serialize, Clone)]
struct CheckResult {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<String>,
}

impl CheckResult {
    fn found(path: impl Into<String>) -> Self {
        Self {
            ok: true,
            path: Some(path.into()),
            fix: None,
        }
    }

    fn passed() -> Self {
        Self {
            ok: true,
            path: None,
            fix: None,
        }
    }

    fn failed(fix: impl Into<String>) -> Self {
        Self {
            ok: false,
            path: None,
            fix: Some(fix.into()),
        }
    }
}

/// All check results
#[derive(Serialize)]
struct CheckReport {
    status: String,
    checks: CheckResults,
    issues_count: usize,
}

#[derive(Serialize)]
struct CheckResults {
    package_json: CheckResult,
    vitest_config: CheckResult,
    json_summary_reporter: CheckResult,
    coverage_provider: CheckResult,
    coverage_summary: CheckResult,
    node: CheckResult,
}

impl CheckResults {
    fn all(&self) -> [&CheckResult; 6] {
        [
            &self.package_json,
            &self.vitest_config,
            &self.json_summary_reporter,
            &self.coverage_provider,
            &self.coverage_summary,
            &self.node,
        ]
    }
}

/// Run every check, print the report and return the exit code.
pub fn run(cwd: &Path, format: OutputFormat) -> Result<i32> {
    let report = collect(cwd);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text_report(&report),
    }

    Ok(if report.issues_count > 0 { 1 } else { 0 })
}

fn collect(cwd: &Path) -> CheckReport {
    let manager = PackageManager::detect(cwd);
    let manifest = read_manifest(cwd);

    let checks = CheckResults {
        package_json: check_package_json(cwd),
        vitest_config: check_vitest_config(cwd),
        json_summary_reporter: check_json_summary_reporter(cwd),
        coverage_provider: check_coverage_provider(manifest.as_ref(), manager),
        coverage_summary: check_coverage_summary(cwd, manager),
        node: check_node(),
    };

    let issues_count = checks.all().iter().filter(|c| !c.ok).count();
    let status = if issues_count == 0 {
        "ok".to_string()
    } else {
        "issues_found".to_string()
    };

    CheckReport {
        status,
        checks,
        issues_count,
    }
}

fn print_text_report(report: &CheckReport) {
    let checks = &report.checks;

    println!("uncov check");
    println!("===========\n");

    println!("Project:");
    print_check("package.json", &checks.package_json);
    print_check("vitest config", &checks.vitest_config);
    println!();

    println!("Coverage:");
    print_check("json-summary reporter", &checks.json_summary_reporter);
    print_check("coverage provider", &checks.coverage_provider);
    print_check("coverage summary", &checks.coverage_summary);
    println!();

    println!("Toolchain:");
    print_check("node", &checks.node);
    println!();

    if report.issues_count == 0 {
        println!("Status: All checks passed");
    } else {
        println!(
            "Status: {} issue{} found",
            report.issues_count,
            if report.issues_count == 1 { "" } else { "s" }
        );
    }
}

fn print_check(name: &str, result: &CheckResult) {
    if result.ok {
        if let Some(path) = &result.path {
            println!("  \u{2713} {}: {}", name, path);
        } else {
            println!("  \u{2713} {}: ok", name);
        }
    } else {
        println!("  \u{2717} {}: missing", name);
        if let Some(fix) = &result.fix {
            println!("    \u{2192} {}", fix);
        }
    }
}

fn read_manifest(cwd: &Path) -> Option<Value> {
    fs_io::read_json(cwd.join(MANIFEST_FILE_NAME), &IoOptions::default()).ok()
}

fn check_package_json(cwd: &Path) -> CheckResult {
    let path = cwd.join(MANIFEST_FILE_NAME);
    if fs_io::file_exists(&path) {
        CheckResult::found(path.display().to_string())
    } else {
        CheckResult::failed("Run `npm init` to create package.json")
    }
}

fn check_vitest_config(cwd: &Path) -> CheckResult {
    match find_vitest_config(cwd) {
        Some(path) => CheckResult::found(path.display().to_string()),
        None => CheckResult::failed("Run `uncov init` to generate vitest.config.ts"),
    }
}

/// The summary file only exists if the json-summary reporter is enabled.
fn check_json_summary_reporter(cwd: &Path) -> CheckResult {
    let Some(config) = find_vitest_config(cwd) else {
        return CheckResult::failed("Run `uncov init` to generate vitest.config.ts");
    };

    match fs_io::read_text(&config, &IoOptions::default()) {
        Ok(content) if content.contains("json-summary") => CheckResult::passed(),
        Ok(_) => CheckResult::failed(format!(
            "Add \"json-summary\" to test.coverage.reporter in {}",
            config.display()
        )),
        Err(err) => CheckResult::failed(format!("Could not read {}: {}", config.display(), err)),
    }
}

fn check_coverage_provider(manifest: Option<&Value>, manager: PackageManager) -> CheckResult {
    let declared = manifest.and_then(|manifest| {
        ["devDependencies", "dependencies"]
            .iter()
            .filter_map(|section| manifest.get(*section).and_then(Value::as_object))
            .flat_map(|deps| deps.keys())
            .find(|name| COVERAGE_PROVIDERS.contains(&name.as_str()))
            .cloned()
    });

    match declared {
        Some(provider) => CheckResult::found(provider),
        None => CheckResult::failed(manager.add_dev_command(COVERAGE_PROVIDERS[0])),
    }
}

fn check_coverage_summary(cwd: &Path, manager: PackageManager) -> CheckResult {
    let config = load_config(None, Some(cwd));
    let path = resolve_path(&config.coverage_path, Some(cwd));
    if fs_io::file_exists(&path) {
        CheckResult::found(path.display().to_string())
    } else {
        CheckResult::failed(format!(
            "Run `{}` to generate {}",
            manager.run_command("coverage"),
            config.coverage_path
        ))
    }
}

/// Check if node is installed
fn check_node() -> CheckResult {
    match which::which("node") {
        Ok(path) => CheckResult::found(path.display().to_string()),
        Err(_) => CheckResult::failed("Install Node.js from https://nodejs.org"),
    }
}
