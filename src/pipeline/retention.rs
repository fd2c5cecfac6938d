//! Per-source retention: keep at most `cap` files, deleting the oldest first.

use crate::error::{Result, SynocastError};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{info, instrument, warn};

/// A file that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Result of one retention pass over a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Cap that was applied; `None` when retention is disabled.
    pub cap: Option<usize>,
    /// Files present before the pass.
    pub file_count: usize,
    /// Files removed (or, for a dry run, that would be removed).
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<RetentionFailure>,
    pub dry_run: bool,
}

impl RetentionReport {
    /// Files left in the directory after the pass.
    pub fn remaining(&self) -> usize {
        if self.dry_run {
            self.file_count
        } else {
            self.file_count - self.deleted.len()
        }
    }
}

/// Suffix of an in-progress download; such files are never retained or deleted.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Regular files in `dir`, oldest modification time first.
fn list_files_oldest_first(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        SynocastError::Retention(format!("Cannot read directory {}: {}", dir.display(), e))
    })?;

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let partial = entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX);
        if !metadata.is_file() || partial {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((modified, entry.path()));
    }

    // Ties broken by path so the plan does not depend on directory order.
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Files that a pass with `cap` would delete, oldest first.
///
/// A cap of `None` disables retention.
pub fn plan_retention(dir: &Path, cap: Option<usize>) -> Result<(usize, Vec<PathBuf>)> {
    let files = list_files_oldest_first(dir)?;
    let count = files.len();

    let excess = match cap {
        Some(cap) if count > cap => count - cap,
        _ => 0,
    };

    Ok((count, files.into_iter().take(excess).collect()))
}

/// Delete the oldest files in `dir` until at most `cap` remain.
///
/// Each deletion is independent; failures are collected in the report and do
/// not stop the remaining deletions. With `dry_run` nothing is removed.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub fn enforce_retention(dir: &Path, cap: Option<usize>, dry_run: bool) -> Result<RetentionReport> {
    let (file_count, planned) = plan_retention(dir, cap)?;

    let mut report = RetentionReport {
        cap,
        file_count,
        dry_run,
        ..Default::default()
    };

    if dry_run {
        for path in &planned {
            info!("Would delete old file: {}", path.display());
        }
        report.deleted = planned;
        return Ok(report);
    }

    for path in planned {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted old file: {}", path.display());
                report.deleted.push(path);
            }
            Err(e) => {
                warn!("Failed to delete file {}: {}", path.display(), e);
                report.failures.push(RetentionFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}
