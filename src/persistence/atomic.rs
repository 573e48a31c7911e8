//! Atomic replace primitive shared by every state-store record.
//!
//! Writes to a temporary file in the target's directory, fsyncs it, then
//! renames it over the target via `tempfile::NamedTempFile::persist()`.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{AppError, Result};

/// Replace `path` with `content` so readers see either the old or the new file.
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns `AppError::Io` on directory creation, write, fsync, or rename failure.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| AppError::Io(format!("{} has no parent directory", path.display())))?;

    std::fs::create_dir_all(parent).map_err(|err| {
        AppError::Io(format!(
            "failed to create parent directories for {}: {err}",
            path.display()
        ))
    })?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|err| AppError::Io(format!("failed to create temporary file: {err}")))?;

    tmp.write_all(content)
        .map_err(|err| AppError::Io(format!("failed to write temporary file: {err}")))?;
    tmp.as_file()
        .sync_all()
        .map_err(|err| AppError::Io(format!("failed to sync temporary file: {err}")))?;

    tmp.persist(path).map_err(|err| {
        AppError::Io(format!("failed to persist file to {}: {err}", path.display()))
    })?;

    Ok(())
}

/// Serialize `value` as JSON and [`atomic_write`] it.
///
/// # Errors
///
/// Returns `AppError::Store` if serialization fails, or any [`atomic_write`] error.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec(value)?;
    atomic_write(path, &body)
}
