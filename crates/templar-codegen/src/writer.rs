//! Output writer with stale-file cleanup
//!
//! Writes one physical file per generated file under the set's output root.
//! Unchanged files are left alone. After writing, every file below the root
//! with the owned extension that was not produced by this run is deleted.
//! Dry-run mode reports what would happen without touching the disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{CodegenError, Result};

/// Configuration for output writing
#[derive(Debug, Clone)]
pub struct OutputWriterConfig {
    /// Report only, never touch the disk
    pub dry_run: bool,
    /// Extension owned by the generator, without the dot
    pub extension: String,
}

impl Default for OutputWriterConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            extension: "cs".to_string(),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    /// Content was written
    Written,
    /// Content on disk already matched
    Unchanged,
    /// Stale file removed
    Deleted,
}

/// Result of writing one output root
#[derive(Debug, Clone, Default, Serialize)]
pub struct WriteReport {
    /// Files written (or that would be written in a dry run)
    pub written: Vec<PathBuf>,
    /// Files left untouched because their content matched
    pub unchanged: Vec<PathBuf>,
    /// Stale files deleted (or that would be deleted in a dry run)
    pub deleted: Vec<PathBuf>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

impl WriteReport {
    /// Every path with the action taken, in report order
    pub fn actions(&self) -> impl Iterator<Item = (&Path, WriteAction)> {
        self.written
            .iter()
            .map(|p| (p.as_path(), WriteAction::Written))
            .chain(self.unchanged.iter().map(|p| (p.as_path(), WriteAction::Unchanged)))
            .chain(self.deleted.iter().map(|p| (p.as_path(), WriteAction::Deleted)))
    }
}

/// Writes generated files and removes stale ones
#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    config: OutputWriterConfig,
}

impl OutputWriter {
    /// Create a writer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom configuration
    pub fn with_config(config: OutputWriterConfig) -> Self {
        Self { config }
    }

    /// Writer configuration
    pub fn config(&self) -> &OutputWriterConfig {
        &self.config
    }

    /// Write `files` (relative path, content) under `root`, then clean stale files
    pub fn write_all(&self, root: &Path, files: &[(PathBuf, String)]) -> Result<WriteReport> {
        self.write_keeping(root, files, &[])
    }

    /// Like [`write_all`](Self::write_all), but never deletes the relative paths in `keep`
    ///
    /// Used for files whose generation failed this run: their previous output
    /// stays on disk instead of being treated as stale.
    pub fn write_keeping(
        &self,
        root: &Path,
        files: &[(PathBuf, String)],
        keep: &[PathBuf],
    ) -> Result<WriteReport> {
        let mut report = WriteReport {
            dry_run: self.config.dry_run,
            ..WriteReport::default()
        };
        let mut produced: HashSet<PathBuf> = keep.iter().map(|k| root.join(k)).collect();

        for (relative, content) in files {
            let path = root.join(relative);
            produced.insert(path.clone());
            match self.write_file(&path, content)? {
                WriteAction::Written => report.written.push(path),
                _ => report.unchanged.push(path),
            }
        }

        report.deleted = self.cleanup_stale(root, &produced)?;

        info!(
            root = %root.display(),
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            deleted = report.deleted.len(),
            dry_run = report.dry_run,
            "Wrote output root"
        );
        Ok(report)
    }

    /// Write one file unless its content already matches
    pub fn write_file(&self, path: &Path, content: &str) -> Result<WriteAction> {
        if let Ok(existing) = fs::read_to_string(path) {
            if existing == content {
                return Ok(WriteAction::Unchanged);
            }
        }
        if self.config.dry_run {
            debug!(path = %path.display(), "Would write file");
            return Ok(WriteAction::Written);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CodegenError::WriteFailed {
                path: parent.to_path_buf(),
                message: format!("failed to create directory: {}", e),
            })?;
        }
        fs::write(path, content).map_err(|e| CodegenError::WriteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "Wrote file");
        Ok(WriteAction::Written)
    }

    /// Delete files below `root` with the owned extension that are not in `produced`
    pub fn cleanup_stale(&self, root: &Path, produced: &HashSet<PathBuf>) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut deleted = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| CodegenError::CleanupFailed {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() || !self.owns(entry.path()) {
                continue;
            }
            if produced.contains(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            if !self.config.dry_run {
                fs::remove_file(&path).map_err(|e| CodegenError::CleanupFailed {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            }
            debug!(path = %path.display(), dry_run = self.config.dry_run, "Removed stale file");
            deleted.push(path);
        }
        Ok(deleted)
    }

    fn owns(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(self.config.extension.trim_start_matches('.')))
    }
}
