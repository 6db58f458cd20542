use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UncovError {
    #[error("path {path:?} escapes base directory {base:?}")]
    PathEscape { path: PathBuf, base: PathBuf },
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid JSON in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("coverage summary must be a JSON object")]
    InvalidShape,
    #[error("coverage summary is missing a valid \"total\" entry with line coverage")]
    MissingTotal,
    #[error("invalid coverage entry for {0:?}: expected an object with numeric lines.total, lines.covered and lines.pct")]
    InvalidFileEntry(String),
}

pub type UncovResult<T> = Result<T, UncovError>;

impl UncovError {
    pub fn path_escape(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self::PathEscape {
            path: path.into(),
            base: base.into(),
        }
    }

    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable label for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PathEscape { .. } => "path_escape",
            Self::Read { .. } => "read_failure",
            Self::Write { .. } => "write_failure",
            Self::Parse { .. } => "parse_failure",
            Self::InvalidShape => "invalid_shape",
            Self::MissingTotal => "missing_total",
            Self::InvalidFileEntry(_) => "invalid_file_entry",
        }
    }

    /// True when the content was valid JSON but not a coverage summary.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape | Self::MissingTotal | Self::InvalidFileEntry(_)
        )
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn uncov_error__read_constructor__then_preserves_path_and_source() {
        let err = UncovError::read(
            "/tmp/coverage-summary.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );

        let message = err.to_string();
        match &err {
            UncovError::Read { path, source } => {
                assert!(path.ends_with("coverage-summary.json"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(message.contains("coverage-summary.json"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn uncov_error__parse_constructor__then_wraps_serde_message() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = UncovError::parse("summary.json", source);
        assert!(matches!(err, UncovError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid JSON in"));
    }

    #[test]
    fn uncov_error__invalid_file_entry__then_names_key() {
        let err = UncovError::InvalidFileEntry("src/a.ts".to_string());
        assert!(err.to_string().contains("src/a.ts"));
        assert_eq!(err.kind(), "invalid_file_entry");
    }

    #[test]
    fn uncov_error__schema_classification__then_only_shape_errors() {
        assert!(UncovError::InvalidShape.is_schema_error());
        assert!(UncovError::MissingTotal.is_schema_error());
        assert!(UncovError::InvalidFileEntry("x".into()).is_schema_error());
        assert!(!UncovError::path_escape("../x", "/base").is_schema_error());
        assert!(!UncovError::write("x", io::Error::new(io::ErrorKind::Other, "boom"))
            .is_schema_error());
    }
}
