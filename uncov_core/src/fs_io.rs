//! Synchronous JSON and text file helpers.
//!
//! Every primitive takes an [`IoOptions`]. With the default options a path is
//! resolved against the current directory and used as-is; with
//! [`IoOptions::within`] it must stay inside the given base directory or the
//! call fails with [`UncovError::PathEscape`] before touching the disk.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{UncovError, UncovResult};
use crate::paths::{resolve_path, validate_path};

/// Path guard threaded through the I/O primitives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoOptions {
    pub base_dir: Option<PathBuf>,
}

impl IoOptions {
    /// Unchecked resolution against the current directory.
    pub fn unguarded() -> Self {
        Self::default()
    }

    /// Reject any path that resolves outside `base_dir`.
    pub fn within(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> UncovResult<PathBuf> {
        match &self.base_dir {
            Some(base) => validate_path(path, base),
            None => Ok(resolve_path(path, None)),
        }
    }
}

pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>, opts: &IoOptions) -> UncovResult<T> {
    let path = opts.resolve(path.as_ref())?;
    let content = fs::read_to_string(&path).map_err(|err| UncovError::read(&path, err))?;
    serde_json::from_str(&content).map_err(|err| UncovError::parse(&path, err))
}

/// Serialize `data` with two-space indentation and a single trailing newline.
pub fn write_json<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    data: &T,
    opts: &IoOptions,
) -> UncovResult<()> {
    let path = opts.resolve(path.as_ref())?;
    let mut content = serde_json::to_string_pretty(data).map_err(|err| {
        UncovError::write(&path, io::Error::new(io::ErrorKind::InvalidData, err))
    })?;
    content.push('\n');
    write_resolved(&path, &content)
}

pub fn read_text(path: impl AsRef<Path>, opts: &IoOptions) -> UncovResult<String> {
    let path = opts.resolve(path.as_ref())?;
    fs::read_to_string(&path).map_err(|err| UncovError::read(&path, err))
}

pub fn write_text(path: impl AsRef<Path>, content: &str, opts: &IoOptions) -> UncovResult<()> {
    let path = opts.resolve(path.as_ref())?;
    write_resolved(&path, content)
}

/// Create `path` and any missing ancestors. Empty, `.` and `/` are no-ops.
pub fn ensure_dir(path: impl AsRef<Path>) -> UncovResult<()> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() || path == Path::new(".") || path == Path::new("/") {
        return Ok(());
    }

    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(UncovError::write(path, err)),
    }
}

/// Append `line` followed by a newline, first terminating the existing last
/// line if the file does not already end with one.
pub fn append_line(path: impl AsRef<Path>, line: &str, opts: &IoOptions) -> UncovResult<()> {
    let path = opts.resolve(path.as_ref())?;

    if !path.exists() {
        return write_resolved(&path, &format!("{line}\n"));
    }

    let existing = fs::read(&path).map_err(|err| UncovError::read(&path, err))?;
    let mut addition = String::with_capacity(line.len() + 2);
    if !existing.is_empty() && !existing.ends_with(b"\n") {
        addition.push('\n');
    }
    addition.push_str(line);
    addition.push('\n');

    let mut file = OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|err| UncovError::write(&path, err))?;
    file.write_all(addition.as_bytes())
        .map_err(|err| UncovError::write(&path, err))?;

    debug!(path = %path.display(), "appended line");
    Ok(())
}

fn write_resolved(path: &Path, content: &str) -> UncovResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, content).map_err(|err| UncovError::write(path, err))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}
