//! Path validation — keeps file tools inside the project root.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the project root '{root}'")]
    OutsideProjectRoot { path: String, root: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Validate that `path` is safe for a file tool to touch.
///
/// Checks:
/// 1. No `..` components
/// 2. Symlinks and `.` are resolved (via the parent directory when the
///    file does not exist yet, e.g. for writes)
/// 3. The resolved path lies under `project_root`
///
/// Returns the resolved path on success.
pub fn validate_path(path: &Path, project_root: &Path) -> Result<PathBuf, PathValidationError> {
    let display = path.display().to_string();

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PathValidationError::PathTraversal { path: display });
    }

    let resolved = resolve(path, &display)?;
    let root = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());

    if !resolved.starts_with(&root) {
        return Err(PathValidationError::OutsideProjectRoot {
            path: display,
            root: root.display().to_string(),
        });
    }

    Ok(resolved)
}

fn resolve(path: &Path, display: &str) -> Result<PathBuf, PathValidationError> {
    // Canonicalize the deepest existing ancestor and re-attach the rest
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            // Nothing on disk to resolve against yet
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|e| PathValidationError::CanonicalizeFailed {
            path: display.to_string(),
            reason: e.to_string(),
        })?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
