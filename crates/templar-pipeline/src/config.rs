//! Run configuration
//!
//! A single TOML file composes the configuration of every crate:
//!
//! ```toml
//! [pipeline]
//! max_concurrency = 8
//! verbosity = "failures"
//!
//! [model.namespace]
//! policy = "ancestor_hint"
//! strip_prefix = "Site"
//!
//! [[sets]]
//! name = "Feature.Navigation"
//! namespace = "Site.Feature.Navigation"
//! item_path = "src/Feature/Navigation/items"
//! output_path = "src/Feature/Navigation/code/Models"
//! references = ["Foundation.Content"]
//! ```
//!
//! Relative paths are resolved against the directory of the file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use templar_codegen::CodegenConfig;
use templar_items::{set_id_from_name, ItemSet, ItemSetId, ParserConfig};
use templar_model::{FieldTypeResolver, FieldTypeTables, ModelConfig, NamespacePolicyConfig};
use tracing::debug;
use uuid::Uuid;

use crate::diagnostics::Verbosity;
use crate::error::{PipelineError, Result};

/// Pipeline execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of elements processed at once within a stage
    pub max_concurrency: usize,
    /// Diagnostics rendering level
    pub verbosity: Verbosity,
    /// Report output changes without touching the disk
    pub dry_run: bool,
    /// Extension of serialized item files, without the dot
    pub item_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            verbosity: Verbosity::default(),
            dry_run: false,
            item_extension: "item".to_string(),
        }
    }
}

/// One logical source of items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetConfig {
    /// Unique set name
    pub name: String,
    /// Explicit id; derived from the name when absent
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Root namespace of generated code
    #[serde(default)]
    pub namespace: String,
    /// Directory holding the set's serialized items
    pub item_path: PathBuf,
    /// Output root; sets without one are reference-only
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Names of referenced sets
    #[serde(default)]
    pub references: Vec<String>,
    /// Namespace hints keyed by directory relative to `item_path`
    ///
    /// A hint lands on the files directly in its directory; items in deeper
    /// directories inherit it through their ancestor items.
    #[serde(default)]
    pub namespace_hints: BTreeMap<PathBuf, String>,
}

impl SetConfig {
    /// Configured id, or the stable id derived from the name
    pub fn resolved_id(&self) -> ItemSetId {
        self.id.unwrap_or_else(|| set_id_from_name(&self.name))
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplarConfig {
    /// Pipeline execution settings
    pub pipeline: PipelineConfig,
    /// Parser settings
    pub parser: ParserConfig,
    /// Template model settings
    pub model: ModelConfig,
    /// Field type tables
    pub field_types: FieldTypeTables,
    /// Code generation settings
    pub codegen: CodegenConfig,
    /// Item sets, in registration order
    pub sets: Vec<SetConfig>,
}

impl TemplarConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_concurrency == 0 {
            return Err(PipelineError::config("pipeline.max_concurrency must be > 0"));
        }
        if self.pipeline.item_extension.trim_start_matches('.').is_empty() {
            return Err(PipelineError::config("pipeline.item_extension must not be empty"));
        }
        if self.codegen.file_extension.trim_start_matches('.').is_empty() {
            return Err(PipelineError::config("codegen.file_extension must not be empty"));
        }
        if self.sets.is_empty() {
            return Err(PipelineError::config("at least one [[sets]] entry is required"));
        }

        let mut names = HashSet::new();
        let mut ids = HashMap::new();
        for set in &self.sets {
            if set.name.trim().is_empty() {
                return Err(PipelineError::config("sets.name must not be empty"));
            }
            if !names.insert(set.name.as_str()) {
                return Err(PipelineError::config(format!("duplicate set name '{}'", set.name)));
            }
            if let Some(other) = ids.insert(set.resolved_id(), set.name.as_str()) {
                return Err(PipelineError::config(format!(
                    "sets '{}' and '{}' share the id {}",
                    other,
                    set.name,
                    set.resolved_id()
                )));
            }
        }
        for set in &self.sets {
            for reference in &set.references {
                if !names.contains(reference.as_str()) {
                    return Err(PipelineError::config(format!(
                        "set '{}' references unknown set '{}'",
                        set.name, reference
                    )));
                }
            }
        }

        FieldTypeResolver::new(&self.field_types)?;
        Ok(())
    }

    /// Resolve relative set paths against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for set in &mut self.sets {
            if set.item_path.is_relative() {
                set.item_path = base.join(&set.item_path);
            }
            if let Some(output) = set.output_path.as_mut() {
                if output.is_relative() {
                    *output = base.join(&*output);
                }
            }
        }
    }

    /// Empty item sets in registration order, references resolved to ids
    pub fn item_sets(&self) -> Vec<ItemSet> {
        let ids: HashMap<&str, ItemSetId> = self
            .sets
            .iter()
            .map(|s| (s.name.as_str(), s.resolved_id()))
            .collect();

        self.sets
            .iter()
            .map(|config| {
                let mut set = ItemSet::new(config.resolved_id(), &config.name, &config.namespace)
                    .with_item_path(&config.item_path);
                if let Some(output) = &config.output_path {
                    set = set.with_output_path(output);
                }
                for reference in &config.references {
                    if let Some(id) = ids.get(reference.as_str()) {
                        set = set.with_reference(*id);
                    }
                }
                set
            })
            .collect()
    }

    /// Hint key used when attaching namespace hints to item files
    pub fn namespace_hint_key(&self) -> &str {
        match &self.model.namespace {
            NamespacePolicyConfig::AncestorHint { hint_key, .. } => hint_key.as_str(),
            NamespacePolicyConfig::PathTrim { .. } => "namespace",
        }
    }
}

/// Parse and validate configuration from TOML text
pub fn parse_config(text: &str) -> Result<TemplarConfig> {
    let config: TemplarConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a configuration file
///
/// Relative set paths are resolved against the file's directory.
pub fn load_config(path: &Path) -> Result<TemplarConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    let mut config = parse_config(&content)?;
    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    debug!(path = %path.display(), sets = config.sets.len(), "Loaded configuration");
    Ok(config)
}
