//! Path resolution and base-directory guarding.
//!
//! Resolution is purely lexical: `.` and `..` segments are folded without
//! touching the filesystem, so paths that do not exist yet (output files,
//! directories about to be created) resolve the same way as existing ones.

use std::path::{Component, Path, PathBuf};

use crate::error::{UncovError, UncovResult};

/// Resolve `relative` against `base_dir`, or the current working directory
/// when no base is given. Absolute inputs are returned normalized but
/// otherwise unchanged.
pub fn resolve_path(relative: impl AsRef<Path>, base_dir: Option<&Path>) -> PathBuf {
    let relative = relative.as_ref();
    if relative.is_absolute() {
        return normalize(relative);
    }

    let base = match base_dir {
        Some(base) if base.is_absolute() => base.to_path_buf(),
        Some(base) => current_dir().join(base),
        None => current_dir(),
    };
    normalize(&base.join(relative))
}

/// Resolve `target` against `base_dir` and fail with
/// [`UncovError::PathEscape`] if the result lies outside `base_dir`.
pub fn validate_path(target: impl AsRef<Path>, base_dir: &Path) -> UncovResult<PathBuf> {
    let target = target.as_ref();
    let base = resolve_path(base_dir, None);
    let resolved = resolve_path(target, Some(&base));

    // Both sides are normalized, so a path that would need a leading `..`
    // (or lives on another root) simply fails the prefix test.
    if resolved.strip_prefix(&base).is_err() {
        return Err(UncovError::path_escape(target, base));
    }

    Ok(resolved)
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(std::path::MAIN_SEPARATOR_STR))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_normal = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if ends_in_normal {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
