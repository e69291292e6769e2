//! Template model: templates, their fields, sets and the global collection
//!
//! A [`TemplateCollection`] owns every [`TemplateSet`] and a flattened
//! id index over all of their templates. Inheritance queries (direct bases,
//! transitive closure, all fields, template kind) are answered from that
//! index; the two well-known root templates are valid anchors but never
//! appear in closures.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use templar_items::{ItemId, ItemSetId};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::naming;

/// Id of the synthetic set holding the well-known templates
pub const WELL_KNOWN_SET_ID: Uuid = Uuid::nil();

/// A field definition on a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    /// Field definition item id
    pub id: ItemId,
    /// Field name
    pub name: String,
    /// Display name, if the definition carries one
    pub display_name: Option<String>,
    /// Raw field type tag (e.g. "Single-Line Text")
    pub field_type: String,
    /// Name of the section owning the field
    pub section: String,
    /// Template owning the field
    pub template_id: ItemId,
}

impl TemplateField {
    /// Display name, falling back to the field name
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Lowercase lookup key of the field
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Whether a template models content or a flat parameter bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// Ordinary content template
    Ordinary,
    /// Key/value configuration record (rendering parameters)
    ParameterBag,
}

/// A template definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Template item id
    pub id: ItemId,
    /// Template name
    pub name: String,
    /// Display name (falls back to the name)
    pub display_name: String,
    /// Own fields, sorted by name
    pub fields: Vec<TemplateField>,
    /// Direct base template ids, in declaration order
    pub base_template_ids: Vec<ItemId>,
    /// Namespace relative to the owning set's namespace
    pub local_namespace: String,
    /// Content tree path
    pub path: String,
    /// Owning set
    pub set_id: ItemSetId,
    /// True only for the synthesized root templates
    pub well_known: bool,
}

impl Template {
    /// Create a synthesized well-known root template
    pub fn well_known(id: ItemId, name: &str, path: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            display_name: name.to_string(),
            fields: Vec::new(),
            base_template_ids: Vec::new(),
            local_namespace: String::new(),
            path: path.to_string(),
            set_id: WELL_KNOWN_SET_ID,
            well_known: true,
        }
    }

    /// Sanitized type name of the template
    pub fn type_name(&self) -> String {
        naming::identifier(&self.name)
    }

    /// Sort own fields by name (then id) for deterministic output
    pub fn sort_fields(&mut self) {
        self.fields
            .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }
}

/// Templates of one logical source, plus its output metadata
#[derive(Debug, Clone)]
pub struct TemplateSet {
    /// Set id
    pub id: ItemSetId,
    /// Set name
    pub name: String,
    /// Root namespace for generated code
    pub namespace: String,
    /// Directory the set's items were read from
    pub item_path: PathBuf,
    /// Output root, if the set produces code
    pub output_path: Option<PathBuf>,
    /// Ids of referenced sets
    pub references: Vec<ItemSetId>,
    /// Templates keyed by id
    pub templates: BTreeMap<ItemId, Arc<Template>>,
}

impl TemplateSet {
    /// Create an empty set
    pub fn new(id: ItemSetId, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            namespace: namespace.into(),
            item_path: PathBuf::new(),
            output_path: None,
            references: Vec::new(),
            templates: BTreeMap::new(),
        }
    }

    /// Add a template, keyed by its id
    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.id, Arc::new(template));
    }

    /// Whether this is the synthetic well-known set
    pub fn is_well_known(&self) -> bool {
        self.id == WELL_KNOWN_SET_ID
    }
}

/// A template id present in more than one set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCollision {
    /// The colliding template id
    pub id: ItemId,
    /// Set whose template was kept
    pub kept_set: String,
    /// Set whose template was ignored
    pub skipped_set: String,
}

impl std::fmt::Display for TemplateCollision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "template {} defined in '{}' and '{}', keeping '{}'",
            self.id, self.kept_set, self.skipped_set, self.kept_set
        )
    }
}

/// All template sets with a flattened template index
#[derive(Debug, Clone, Default)]
pub struct TemplateCollection {
    sets: HashMap<ItemSetId, Arc<TemplateSet>>,
    set_order: Vec<ItemSetId>,
    templates: HashMap<ItemId, Arc<Template>>,
    collisions: Vec<TemplateCollision>,
    parameter_base_ids: HashSet<ItemId>,
}

impl TemplateCollection {
    /// Build the collection, flattening templates first-set-wins
    pub fn new(sets: Vec<TemplateSet>, parameter_base_ids: impl IntoIterator<Item = ItemId>) -> Self {
        let mut collection = Self {
            parameter_base_ids: parameter_base_ids.into_iter().collect(),
            ..Self::default()
        };

        for set in sets {
            for (id, template) in &set.templates {
                match collection.templates.get(id) {
                    Some(existing) => {
                        let kept_set = collection
                            .sets
                            .get(&existing.set_id)
                            .map(|s| s.name.clone())
                            .unwrap_or_default();
                        let collision = TemplateCollision {
                            id: *id,
                            kept_set,
                            skipped_set: set.name.clone(),
                        };
                        warn!(%collision, "Template id collision");
                        collection.collisions.push(collision);
                    }
                    None => {
                        collection.templates.insert(*id, template.clone());
                    }
                }
            }
            if !collection.sets.contains_key(&set.id) {
                collection.set_order.push(set.id);
            }
            collection.sets.insert(set.id, Arc::new(set));
        }

        collection
    }

    /// Look up a template by id
    pub fn get(&self, id: &ItemId) -> Option<&Arc<Template>> {
        self.templates.get(id)
    }

    /// Look up a template by id, failing if absent
    pub fn require(&self, id: &ItemId) -> Result<&Arc<Template>> {
        self.get(id).ok_or(ModelError::UnknownTemplate(*id))
    }

    /// Look up a set by id
    pub fn set(&self, id: &ItemSetId) -> Option<&Arc<TemplateSet>> {
        self.sets.get(id)
    }

    /// Sets in insertion order (well-known set first)
    pub fn sets(&self) -> impl Iterator<Item = &Arc<TemplateSet>> {
        self.set_order.iter().filter_map(|id| self.sets.get(id))
    }

    /// Number of indexed templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are indexed
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Every indexed template, sorted by path then id
    pub fn templates(&self) -> Vec<&Arc<Template>> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.id.cmp(&b.id)));
        templates
    }

    /// Cross-set id collisions recorded while flattening
    pub fn collisions(&self) -> &[TemplateCollision] {
        &self.collisions
    }

    /// Full namespace of a template (set namespace + local namespace)
    pub fn namespace_of(&self, template: &Template) -> String {
        let root = self
            .sets
            .get(&template.set_id)
            .map(|s| s.namespace.as_str())
            .unwrap_or_default();
        naming::join_namespace(&[root, &template.local_namespace])
    }

    /// Direct base templates that resolve to a known template
    pub fn direct_bases(&self, id: &ItemId) -> Result<Vec<&Arc<Template>>> {
        let template = self.require(id)?;
        Ok(template
            .base_template_ids
            .iter()
            .filter_map(|base| self.templates.get(base))
            .collect())
    }

    /// Base ids of a template that do not resolve to any template
    pub fn unresolved_bases(&self, id: &ItemId) -> Result<Vec<ItemId>> {
        let template = self.require(id)?;
        Ok(template
            .base_template_ids
            .iter()
            .filter(|base| !self.templates.contains_key(base))
            .copied()
            .collect())
    }

    /// Transitive base templates, depth-first, deduplicated, without well-known roots
    pub fn transitive_bases(&self, id: &ItemId) -> Result<Vec<&Arc<Template>>> {
        let template = self.require(id)?;
        let mut visited = HashSet::new();
        let mut stack = vec![template.id];
        let mut result = Vec::new();
        self.visit_bases(template, &mut stack, &mut visited, &mut result)?;
        Ok(result)
    }

    fn visit_bases<'a>(
        &'a self,
        template: &Template,
        stack: &mut Vec<ItemId>,
        visited: &mut HashSet<ItemId>,
        result: &mut Vec<&'a Arc<Template>>,
    ) -> Result<()> {
        for base_id in &template.base_template_ids {
            if let Some(pos) = stack.iter().position(|id| id == base_id) {
                let mut path = stack[pos..].to_vec();
                path.push(*base_id);
                return Err(ModelError::InheritanceCycle {
                    template: stack[0],
                    path,
                });
            }
            if !visited.insert(*base_id) {
                continue;
            }
            let Some(base) = self.templates.get(base_id) else {
                continue;
            };
            if !base.well_known {
                result.push(base);
            }
            stack.push(*base_id);
            self.visit_bases(base, stack, visited, result)?;
            stack.pop();
        }
        Ok(())
    }

    /// Own fields followed by every transitive base's own fields
    ///
    /// Fields sharing a name across ancestors are kept; each ancestor
    /// contributes its own list.
    pub fn all_fields(&self, id: &ItemId) -> Result<Vec<&TemplateField>> {
        let template = self.require(id)?;
        let mut fields: Vec<&TemplateField> = template.fields.iter().collect();
        for base in self.transitive_bases(id)? {
            fields.extend(base.fields.iter());
        }
        Ok(fields)
    }

    /// Kind of a template, decided by its (possibly unresolved) base ids
    pub fn kind(&self, id: &ItemId) -> Result<TemplateKind> {
        let template = self.require(id)?;
        if self.parameter_base_ids.contains(&template.id) {
            return Ok(TemplateKind::ParameterBag);
        }

        let mut visited = HashSet::new();
        let mut pending: Vec<ItemId> = template.base_template_ids.clone();
        while let Some(base_id) = pending.pop() {
            if !visited.insert(base_id) {
                continue;
            }
            if self.parameter_base_ids.contains(&base_id) {
                return Ok(TemplateKind::ParameterBag);
            }
            if let Some(base) = self.templates.get(&base_id) {
                pending.extend(base.base_template_ids.iter().copied());
            }
        }
        Ok(TemplateKind::Ordinary)
    }
}
