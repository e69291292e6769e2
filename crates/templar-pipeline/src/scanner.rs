//! Item file discovery
//!
//! A [`Scanner`] lists the serialized item files of a set. The bundled
//! [`DirectoryScanner`] walks the set's item directory; [`StaticScanner`]
//! hands out files a host discovered on its own.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use templar_items::{ItemFile, ItemSet, ItemSetId};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::TemplarConfig;
use crate::error::{PipelineError, Result};

/// Lists the item files of a set
pub trait Scanner: Send + Sync {
    /// Files of `set`, in a stable order
    fn scan(&self, set: &ItemSet) -> Result<Vec<ItemFile>>;
}

/// Walks each set's item directory for files with the item extension
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    extension: String,
    hint_key: String,
    hints: HashMap<ItemSetId, BTreeMap<PathBuf, String>>,
}

impl DirectoryScanner {
    /// Create a scanner for files with `extension`
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
            hint_key: "namespace".to_string(),
            hints: HashMap::new(),
        }
    }

    /// Scanner configured from the run configuration, namespace hints included
    pub fn from_config(config: &TemplarConfig) -> Self {
        let mut scanner = Self::new(&config.pipeline.item_extension);
        scanner.hint_key = config.namespace_hint_key().to_string();
        for set in &config.sets {
            if !set.namespace_hints.is_empty() {
                scanner
                    .hints
                    .insert(set.resolved_id(), set.namespace_hints.clone());
            }
        }
        scanner
    }

    /// Attach `namespace` to every file at or below `directory` of a set
    pub fn with_hint(
        mut self,
        set_id: ItemSetId,
        directory: impl Into<PathBuf>,
        namespace: impl Into<String>,
    ) -> Self {
        self.hints
            .entry(set_id)
            .or_default()
            .insert(directory.into(), namespace.into());
        self
    }

    /// Hint configured for the directory directly holding `relative`
    ///
    /// Files in nested directories get no hint of their own; the namespace
    /// policy finds it by walking up to an ancestor item that has one.
    fn hint_for(&self, set_id: &ItemSetId, relative: &Path) -> Option<&str> {
        self.hints
            .get(set_id)?
            .get(relative.parent()?)
            .map(String::as_str)
    }
}

impl Scanner for DirectoryScanner {
    fn scan(&self, set: &ItemSet) -> Result<Vec<ItemFile>> {
        if !set.item_path.is_dir() {
            return Err(PipelineError::Scan {
                path: set.item_path.clone(),
                message: "item directory does not exist".to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&set.item_path).sort_by_file_name() {
            let entry = entry.map_err(|e| PipelineError::Scan {
                path: set.item_path.clone(),
                message: e.to_string(),
            })?;
            let is_item = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
            if !is_item {
                continue;
            }

            let mut file = ItemFile::new(entry.path());
            let relative = entry.path().strip_prefix(&set.item_path).unwrap_or(entry.path());
            if let Some(hint) = self.hint_for(&set.id, relative) {
                file = file.with_property(&self.hint_key, hint);
            }
            files.push(file);
        }

        debug!(set = %set.name, files = files.len(), "Scanned item directory");
        Ok(files)
    }
}

/// Returns preassigned files per set
#[derive(Debug, Clone, Default)]
pub struct StaticScanner {
    files: HashMap<ItemSetId, Vec<ItemFile>>,
}

impl StaticScanner {
    /// Create an empty scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a file to a set
    pub fn with_file(mut self, set_id: ItemSetId, file: ItemFile) -> Self {
        self.files.entry(set_id).or_default().push(file);
        self
    }
}

impl Scanner for StaticScanner {
    fn scan(&self, set: &ItemSet) -> Result<Vec<ItemFile>> {
        Ok(self.files.get(&set.id).cloned().unwrap_or_default())
    }
}
