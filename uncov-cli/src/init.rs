//! Project bootstrap.
//!
//! Wires a JavaScript project up for uncov: coverage scripts in
//! `package.json`, a vitest config emitting `json-summary`, a `.gitignore`
//! entry for the coverage output and a default `uncov.config.json`.
//! Every write is confined to the project directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use tracing::info;
use uncov_core::config::{find_config_file, save_config, MANIFEST_FILE_NAME};
use uncov_core::fs_io::{self, IoOptions};
use uncov_core::UncovConfig;

pub const VITEST_CONFIG_FILES: [&str; 4] = [
    "vitest.config.ts",
    "vitest.config.mts",
    "vitest.config.js",
    "vitest.config.mjs",
];

const SCRIPTS: [(&str, &str); 2] = [
    ("coverage", "vitest run --coverage"),
    ("coverage:low", "uncov --fail"),
];

const GITIGNORE_ENTRY: &str = "coverage/";

const VITEST_CONFIG_TEMPLATE: &str = r#"import { defineConfig } from "vitest/config";

export default defineConfig({
  test: {
    coverage: {
      provider: "v8",
      reporter: ["text", "json-summary"],
      reportsDirectory: "coverage",
    },
  },
});
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl PackageManager {
    const LOCKFILES: [(&'static str, PackageManager); 5] = [
        ("bun.lockb", PackageManager::Bun),
        ("bun.lock", PackageManager::Bun),
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
        ("package-lock.json", PackageManager::Npm),
    ];

    /// Pick the manager whose lockfile is present, defaulting to npm.
    pub fn detect(cwd: &Path) -> Self {
        Self::LOCKFILES
            .iter()
            .find(|(lockfile, _)| fs_io::file_exists(cwd.join(lockfile)))
            .map(|(_, manager)| *manager)
            .unwrap_or(PackageManager::Npm)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
        }
    }

    pub fn add_dev_command(self, packages: &str) -> String {
        match self {
            Self::Npm => format!("npm install -D {packages}"),
            Self::Pnpm | Self::Yarn | Self::Bun => format!("{} add -D {packages}", self.name()),
        }
    }

    pub fn run_command(self, script: &str) -> String {
        match self {
            Self::Npm | Self::Bun => format!("{} run {script}", self.name()),
            Self::Pnpm | Self::Yarn => format!("{} {script}", self.name()),
        }
    }
}

pub fn find_vitest_config(cwd: &Path) -> Option<PathBuf> {
    VITEST_CONFIG_FILES
        .iter()
        .map(|name| cwd.join(name))
        .find(|path| fs_io::file_exists(path))
}

// LCOV_EXCL_START - Prints to stdout, covered by CLI integration tests
pub fn run(cwd: &Path, force: bool) -> Result<()> {
    let actions = bootstrap(cwd, force)?;
    let manager = PackageManager::detect(cwd);

    println!("uncov init ({})", manager.name());
    println!();
    for action in &actions {
        println!("  \u{2713} {}", action);
    }
    println!();
    println!("Next steps:");
    println!(
        "  {}",
        manager.add_dev_command("vitest @vitest/coverage-v8")
    );
    println!("  {}", manager.run_command("coverage"));
    println!("  uncov");

    Ok(())
}
// LCOV_EXCL_STOP

/// Apply every bootstrap step and describe what was done.
pub fn bootstrap(cwd: &Path, force: bool) -> Result<Vec<String>> {
    let opts = IoOptions::within(cwd);
    if !fs_io::file_exists(cwd.join(MANIFEST_FILE_NAME)) {
        bail!(
            "No {} found in {}. Run `npm init` first.",
            MANIFEST_FILE_NAME,
            cwd.display()
        );
    }

    let mut actions = Vec::new();

    let mut manifest: Value = fs_io::read_json(MANIFEST_FILE_NAME, &opts)
        .with_context(|| format!("Failed to read {}", MANIFEST_FILE_NAME))?;
    let added = add_scripts(&mut manifest, force)?;
    if added.is_empty() {
        actions.push("Scripts already present in package.json".to_string());
    } else {
        fs_io::write_json(MANIFEST_FILE_NAME, &manifest, &opts)
            .with_context(|| format!("Failed to update {}", MANIFEST_FILE_NAME))?;
        actions.push(format!("Added scripts to package.json: {}", added.join(", ")));
    }

    match find_vitest_config(cwd) {
        Some(existing) => actions.push(format!(
            "Kept existing {}; make sure coverage.reporter includes \"json-summary\"",
            existing
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        )),
        None => {
            fs_io::write_text(VITEST_CONFIG_FILES[0], VITEST_CONFIG_TEMPLATE, &opts)
                .context("Failed to write vitest config")?;
            actions.push(format!("Created {}", VITEST_CONFIG_FILES[0]));
        }
    }

    if ensure_gitignored(cwd, &opts)? {
        actions.push(format!("Added {} to .gitignore", GITIGNORE_ENTRY));
    } else {
        actions.push("Coverage output already ignored by .gitignore".to_string());
    }

    if force || find_config_file(cwd).is_none() {
        let path = save_config(cwd, &UncovConfig::default())
            .context("Failed to write uncov config")?;
        info!(path = %path.display(), "wrote default config");
        actions.push("Wrote uncov.config.json".to_string());
    } else {
        actions.push("Kept existing uncov.config.json".to_string());
    }

    Ok(actions)
}

/// Insert the coverage scripts, returning the names actually written.
fn add_scripts(manifest: &mut Value, force: bool) -> Result<Vec<&'static str>> {
    let Some(object) = manifest.as_object_mut() else {
        bail!("{} must contain a JSON object", MANIFEST_FILE_NAME);
    };

    let scripts = object
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    let Some(scripts) = scripts.as_object_mut() else {
        bail!("\"scripts\" in {} is not an object", MANIFEST_FILE_NAME);
    };

    let mut added = Vec::new();
    for (name, command) in SCRIPTS {
        if force || !scripts.contains_key(name) {
            scripts.insert(name.to_string(), Value::String(command.to_string()));
            added.push(name);
        }
    }
    Ok(added)
}

/// Append the coverage directory to `.gitignore` unless already listed.
fn ensure_gitignored(cwd: &Path, opts: &IoOptions) -> Result<bool> {
    let gitignore = cwd.join(".gitignore");
    if fs_io::file_exists(&gitignore) {
        let content = fs_io::read_text(".gitignore", opts).context("Failed to read .gitignore")?;
        let listed = content.lines().map(str::trim).any(|line| {
            matches!(line, "coverage" | "coverage/" | "/coverage" | "/coverage/")
        });
        if listed {
            return Ok(false);
        }
    }

    fs_io::append_line(".gitignore", GITIGNORE_ENTRY, opts).context("Failed to update .gitignore")?;
    Ok(true)
}
