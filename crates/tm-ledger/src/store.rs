//! Step files on disk
//!
//! Each step is one pretty-printed JSON file named `<id>_<slug>.json`.
//! Files are written to a dot-prefixed temporary name and renamed into place
//! so a crash never leaves a half-written step behind.

use crate::error::{LedgerError, LedgerResult};
use std::fs;
use std::path::{Path, PathBuf};
use tm_core::MigrationStep;

/// Extension of step files.
pub const STEP_FILE_EXTENSION: &str = "json";

/// A step together with the file it was read from.
#[derive(Debug, Clone)]
pub struct StoredStep {
    pub path: PathBuf,
    pub step: MigrationStep,
}

/// File name for `step`.
pub fn step_file_name(step: &MigrationStep) -> String {
    format!("{}_{}.{}", step.id, step.slug(), STEP_FILE_EXTENSION)
}

/// Write `step` into `dir` atomically, returning the final path.
pub fn write_step(dir: &Path, step: &MigrationStep) -> LedgerResult<PathBuf> {
    let name = step_file_name(step);
    let path = dir.join(&name);
    let temp_path = dir.join(format!(".{}.tmp", name));
    let io_err = |p: &Path| {
        let p = p.display().to_string();
        move |source| LedgerError::IoWithPath { path: p, source }
    };

    let json = serde_json::to_string_pretty(step).map_err(|source| LedgerError::Json {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(&temp_path, json + "\n").map_err(io_err(&temp_path))?;
    fs::rename(&temp_path, &path).map_err(io_err(&path))?;
    log::debug!("Wrote step file {}", path.display());
    Ok(path)
}

/// Read every step file in `dir`, sorted by file name.
///
/// Hidden files and files with other extensions are ignored.
pub fn read_steps(dir: &Path) -> LedgerResult<Vec<StoredStep>> {
    let entries = fs::read_dir(dir).map_err(|source| LedgerError::IoWithPath {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(true, |n| n.starts_with('.'));
        let is_step = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(STEP_FILE_EXTENSION);
        if is_step && !hidden {
            paths.push(path);
        }
    }
    paths.sort();

    paths.into_iter().map(|path| read_step(&path)).collect()
}

/// Read one step file and check it is stored under its own id.
pub fn read_step(path: &Path) -> LedgerResult<StoredStep> {
    let content = fs::read_to_string(path).map_err(|source| LedgerError::IoWithPath {
        path: path.display().to_string(),
        source,
    })?;
    let step: MigrationStep =
        serde_json::from_str(&content).map_err(|source| LedgerError::Json {
            path: path.display().to_string(),
            source,
        })?;

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let prefix = format!("{}_", step.id);
    if stem != step.id.as_str() && !stem.starts_with(&prefix) {
        return Err(LedgerError::Tampered {
            path: path.display().to_string(),
            reason: format!("file name does not start with its step id {}", step.id),
        });
    }

    Ok(StoredStep {
        path: path.to_path_buf(),
        step,
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
