//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. the `"uncov"` field of `package.json`
//! 2. `uncov.config.json`
//! 3. caller overrides (command-line flags)
//!
//! Each source yields a [`PartialConfig`] built field by field from untyped
//! JSON, so one bad field never discards its siblings. A missing or corrupt
//! source contributes nothing; [`load_config`] cannot fail.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::UncovResult;
use crate::fs_io::{self, IoOptions};

pub const CONFIG_FILE_NAME: &str = "uncov.config.json";
pub const MANIFEST_FILE_NAME: &str = "package.json";
pub const MANIFEST_FIELD: &str = "uncov";

pub const DEFAULT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_COVERAGE_PATH: &str = "coverage/coverage-summary.json";

/// Line-coverage percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=100.0).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    fn is_integral(self) -> bool {
        self.0.fract() == 0.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integral() {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for Threshold {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a number"))?;
        Threshold::new(value).ok_or_else(|| format!("threshold must be between 0 and 100, got {s}"))
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_integral() {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Threshold::new(value)
            .ok_or_else(|| serde::de::Error::custom("threshold must be between 0 and 100"))
    }
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncovConfig {
    pub threshold: Threshold,
    /// Reserved glob patterns; carried through but not applied by the filter.
    pub exclude: Vec<String>,
    pub fail_on_low: bool,
    pub coverage_path: String,
}

impl Default for UncovConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::default(),
            exclude: Vec::new(),
            fail_on_low: false,
            coverage_path: DEFAULT_COVERAGE_PATH.to_string(),
        }
    }
}

impl UncovConfig {
    /// Overwrite every field `partial` defines.
    pub fn apply(mut self, partial: PartialConfig) -> Self {
        if let Some(threshold) = partial.threshold {
            self.threshold = threshold;
        }
        if let Some(exclude) = partial.exclude {
            self.exclude = exclude;
        }
        if let Some(fail_on_low) = partial.fail_on_low {
            self.fail_on_low = fail_on_low;
        }
        if let Some(coverage_path) = partial.coverage_path {
            self.coverage_path = coverage_path;
        }
        self
    }
}

/// A configuration source's contribution. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig {
    pub threshold: Option<Threshold>,
    pub exclude: Option<Vec<String>>,
    pub fail_on_low: Option<bool>,
    pub coverage_path: Option<String>,
}

impl PartialConfig {
    /// Extract the recognised fields of an untyped JSON object, dropping any
    /// field whose value has the wrong type or is out of range.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let threshold = object
            .get("threshold")
            .and_then(Value::as_f64)
            .and_then(Threshold::new);

        let exclude = object.get("exclude").and_then(Value::as_array).and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        });

        let fail_on_low = object.get("failOnLow").and_then(Value::as_bool);

        let coverage_path = object
            .get("coveragePath")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            threshold,
            exclude,
            fail_on_low,
            coverage_path,
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Start from the defaults and apply `partials` left to right.
pub fn merge_configs<I>(partials: I) -> UncovConfig
where
    I: IntoIterator<Item = PartialConfig>,
{
    partials
        .into_iter()
        .fold(UncovConfig::default(), UncovConfig::apply)
}

/// The `"uncov"` object embedded in `cwd/package.json`, if any.
pub fn read_manifest_config(cwd: &Path) -> Option<PartialConfig> {
    let manifest_path = cwd.join(MANIFEST_FILE_NAME);
    if !fs_io::file_exists(&manifest_path) {
        return None;
    }

    let manifest: Value = match fs_io::read_json(&manifest_path, &IoOptions::default()) {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!(path = %manifest_path.display(), error = %err, "ignoring unreadable manifest");
            return None;
        }
    };

    manifest.get(MANIFEST_FIELD).map(PartialConfig::from_value)
}

/// Absolute path of `cwd/uncov.config.json` when it exists.
pub fn find_config_file(cwd: &Path) -> Option<PathBuf> {
    let path = crate::paths::resolve_path(CONFIG_FILE_NAME, Some(cwd));
    fs_io::file_exists(&path).then_some(path)
}

/// Contents of the dedicated config file, if present and parseable.
pub fn read_config_file(cwd: &Path) -> Option<PartialConfig> {
    let path = find_config_file(cwd)?;
    match fs_io::read_json::<Value>(&path, &IoOptions::default()) {
        Ok(value) => Some(PartialConfig::from_value(&value)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparseable config file");
            None
        }
    }
}

type ConfigSource = fn(&Path) -> Option<PartialConfig>;

/// File-backed sources in ascending precedence.
static FILE_SOURCES: [(&str, ConfigSource); 2] = [
    (MANIFEST_FILE_NAME, read_manifest_config),
    (CONFIG_FILE_NAME, read_config_file),
];

/// Resolve the effective configuration for `cwd` (default: the current
/// directory), with `cli_overrides` taking precedence over every file.
pub fn load_config(cli_overrides: Option<PartialConfig>, cwd: Option<&Path>) -> UncovConfig {
    let cwd = crate::paths::resolve_path(cwd.unwrap_or_else(|| Path::new(".")), None);

    let file_partials = FILE_SOURCES.iter().filter_map(|(name, source)| {
        let partial = source(&cwd);
        debug!(source = *name, found = partial.is_some(), "config source");
        partial
    });

    merge_configs(file_partials.chain(cli_overrides))
}

/// Persist `config` to `cwd/uncov.config.json`, confined to `cwd`.
pub fn save_config(cwd: &Path, config: &UncovConfig) -> UncovResult<PathBuf> {
    let path = cwd.join(CONFIG_FILE_NAME);
    fs_io::write_json(CONFIG_FILE_NAME, config, &IoOptions::within(cwd))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn threshold(value: f64) -> Threshold {
        Threshold::new(value).unwrap()
    }

    #[test]
    fn merge_configs__no_partials__then_defaults() {
        let config = merge_configs(Vec::new());
        assert_eq!(config, UncovConfig::default());
        assert_eq!(config.threshold.value(), 10.0);
        assert!(config.exclude.is_empty());
        assert!(!config.fail_on_low);
        assert_eq!(config.coverage_path, "coverage/coverage-summary.json");
    }

    #[test]
    fn merge_configs__later_defines_field__then_overrides() {
        let a = PartialConfig {
            threshold: Some(threshold(20.0)),
            fail_on_low: Some(true),
            ..Default::default()
        };
        let b = PartialConfig {
            threshold: Some(threshold(30.0)),
            ..Default::default()
        };

        let config = merge_configs([a, b]);
        assert_eq!(config.threshold.value(), 30.0);
        assert!(config.fail_on_low);
    }

    #[test]
    fn merge_configs__later_omits_field__then_earlier_survives() {
        let a = PartialConfig {
            coverage_path: Some("out/summary.json".into()),
            exclude: Some(vec!["**/*.test.ts".into()]),
            ..Default::default()
        };
        let config = merge_configs([a, PartialConfig::default()]);
        assert_eq!(config.coverage_path, "out/summary.json");
        assert_eq!(config.exclude, vec!["**/*.test.ts".to_string()]);
    }

    #[test]
    fn partial_from_value__all_valid__then_all_fields() {
        let partial = PartialConfig::from_value(&json!({
            "threshold": 50,
            "exclude": ["a/**", "b/**"],
            "failOnLow": true,
            "coveragePath": "cov.json",
            "unknown": 1
        }));
        assert_eq!(partial.threshold, Some(threshold(50.0)));
        assert_eq!(partial.exclude, Some(vec!["a/**".into(), "b/**".into()]));
        assert_eq!(partial.fail_on_low, Some(true));
        assert_eq!(partial.coverage_path.as_deref(), Some("cov.json"));
    }

    #[test]
    fn partial_from_value__invalid_fields__then_dropped_individually() {
        let partial = PartialConfig::from_value(&json!({
            "threshold": 150,
            "exclude": ["ok", 3],
            "failOnLow": "yes",
            "coveragePath": "kept.json"
        }));
        assert_eq!(partial.threshold, None);
        assert_eq!(partial.exclude, None);
        assert_eq!(partial.fail_on_low, None);
        assert_eq!(partial.coverage_path.as_deref(), Some("kept.json"));
    }

    #[test]
    fn partial_from_value__threshold_bounds__then_inclusive() {
        assert!(PartialConfig::from_value(&json!({"threshold": 0})).threshold.is_some());
        assert!(PartialConfig::from_value(&json!({"threshold": 100})).threshold.is_some());
        assert!(PartialConfig::from_value(&json!({"threshold": -1})).threshold.is_none());
        assert!(PartialConfig::from_value(&json!({"threshold": "10"})).threshold.is_none());
    }

    #[test]
    fn partial_from_value__not_an_object__then_empty() {
        assert!(PartialConfig::from_value(&json!([1, 2])).is_empty());
        assert!(PartialConfig::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn threshold__display_and_serialize__then_integral_without_fraction() {
        assert_eq!(threshold(10.0).to_string(), "10");
        assert_eq!(threshold(12.5).to_string(), "12.5");
        assert_eq!(serde_json::to_string(&threshold(10.0)).unwrap(), "10");
        assert_eq!(serde_json::to_string(&threshold(12.5)).unwrap(), "12.5");
    }

    #[test]
    fn threshold__from_str__then_range_checked() {
        assert_eq!("25".parse::<Threshold>().unwrap().value(), 25.0);
        assert!("101".parse::<Threshold>().is_err());
        assert!("abc".parse::<Threshold>().is_err());
    }

    #[test]
    fn read_manifest_config__missing_manifest__then_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_manifest_config(dir.path()).is_none());
    }

    #[test]
    fn read_manifest_config__malformed_manifest__then_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{ nope").unwrap();
        assert!(read_manifest_config(dir.path()).is_none());
    }

    #[test]
    fn read_manifest_config__no_reserved_field__then_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "app"}"#).unwrap();
        assert!(read_manifest_config(dir.path()).is_none());
    }

    #[test]
    fn read_manifest_config__reserved_field__then_validated_partial() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "app", "uncov": {"threshold": 30, "failOnLow": 1}}"#,
        )
        .unwrap();

        let partial = read_manifest_config(dir.path()).unwrap();
        assert_eq!(partial.threshold, Some(threshold(30.0)));
        assert_eq!(partial.fail_on_low, None);
    }

    #[test]
    fn find_config_file__present__then_absolute_path() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(dir.path()).is_none());

        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let found = find_config_file(dir.path()).unwrap();
        assert!(found.is_absolute());
        assert!(found.ends_with(CONFIG_FILE_NAME));
    }

    #[test]
    fn load_config__no_sources__then_defaults() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_config(None, Some(dir.path())), UncovConfig::default());
    }

    #[test]
    fn load_config__all_sources__then_precedence_applied() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"uncov": {"threshold": 20, "coveragePath": "manifest.json", "failOnLow": true}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"threshold": 30, "coveragePath": "file.json"}"#,
        )
        .unwrap();
        let overrides = PartialConfig {
            threshold: Some(threshold(40.0)),
            ..Default::default()
        };

        let config = load_config(Some(overrides), Some(dir.path()));
        assert_eq!(config.threshold.value(), 40.0);
        assert_eq!(config.coverage_path, "file.json");
        assert!(config.fail_on_low);
    }

    #[test]
    fn load_config__out_of_range_in_file__then_manifest_value_survives() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"uncov": {"threshold": 15}}"#).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"threshold": 150}"#).unwrap();

        let config = load_config(None, Some(dir.path()));
        assert_eq!(config.threshold.value(), 15.0);
    }

    #[test]
    fn load_config__out_of_range_without_manifest__then_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"threshold": 150}"#).unwrap();

        let config = load_config(None, Some(dir.path()));
        assert_eq!(config.threshold.value(), 10.0);
    }

    #[test]
    fn load_config__corrupt_config_file__then_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"uncov": {"failOnLow": true}}"#).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{{{").unwrap();

        let config = load_config(None, Some(dir.path()));
        assert!(config.fail_on_low);
        assert_eq!(config.threshold.value(), 10.0);
    }

    #[test]
    fn save_config__then_round_trips_through_load() {
        let dir = TempDir::new().unwrap();
        let config = UncovConfig {
            threshold: threshold(35.0),
            exclude: vec!["dist/**".into()],
            fail_on_low: true,
            coverage_path: "reports/summary.json".into(),
        };

        let path = save_config(dir.path(), &config).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"failOnLow\": true"));
        assert!(written.ends_with("}\n"));
        assert_eq!(load_config(None, Some(dir.path())), config);
    }
}
