//! Field type tables and their inverted lookup
//!
//! Tables are written as `output type -> [raw tag, ...]` and inverted once
//! into case-insensitive `tag -> output type` maps. A tag claimed by two
//! output types in the same table is a configuration error.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Field type configuration tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTypeTables {
    /// Concrete field type -> raw field type tags
    pub concrete: BTreeMap<String, Vec<String>>,
    /// Value projection type -> raw field type tags
    pub value: BTreeMap<String, Vec<String>>,
    /// Parameter type -> raw field type tags (parameter-bag templates only)
    pub parameter: BTreeMap<String, Vec<String>>,
    /// Concrete type for unmapped tags
    pub fallback: String,
    /// Parameter type for unmapped tags
    pub parameter_fallback: String,
}

fn entry(owner: &str, tags: &[&str]) -> (String, Vec<String>) {
    (
        owner.to_string(),
        tags.iter().map(|t| t.to_string()).collect(),
    )
}

impl Default for FieldTypeTables {
    fn default() -> Self {
        Self {
            concrete: BTreeMap::from([
                entry("Templar.Fields.TextField", &["Single-Line Text", "Multi-Line Text", "text", "memo"]),
                entry("Templar.Fields.RichTextField", &["Rich Text", "html"]),
                entry("Templar.Fields.BooleanField", &["Checkbox"]),
                entry("Templar.Fields.DateTimeField", &["Date", "Datetime"]),
                entry("Templar.Fields.IntegerField", &["Integer"]),
                entry("Templar.Fields.NumericField", &["Number"]),
                entry("Templar.Fields.ImageField", &["Image"]),
                entry("Templar.Fields.FileField", &["File"]),
                entry("Templar.Fields.HyperlinkField", &["General Link", "General Link with Search", "link"]),
                entry("Templar.Fields.ItemReferenceField", &["Droplink", "Droptree", "Grouped Droplink", "reference"]),
                entry("Templar.Fields.ItemReferenceListField", &["Multilist", "Multilist with Search", "Treelist", "TreelistEx", "Checklist", "tree list"]),
            ]),
            value: BTreeMap::from([
                entry("string", &["Single-Line Text", "Multi-Line Text", "text", "memo"]),
                entry("bool", &["Checkbox"]),
                entry("System.DateTime", &["Date", "Datetime"]),
                entry("int", &["Integer"]),
                entry("decimal", &["Number"]),
            ]),
            parameter: BTreeMap::from([
                entry("bool", &["Checkbox"]),
                entry("int", &["Integer"]),
                entry("System.Guid", &["Droplink", "Droptree"]),
            ]),
            fallback: "Templar.Fields.TextField".to_string(),
            parameter_fallback: "string".to_string(),
        }
    }
}

/// Inverted, case-insensitive field type lookup
#[derive(Debug, Clone)]
pub struct FieldTypeResolver {
    concrete: HashMap<String, String>,
    value: HashMap<String, String>,
    parameter: HashMap<String, String>,
    fallback: String,
    parameter_fallback: String,
}

impl FieldTypeResolver {
    /// Invert the configured tables
    pub fn new(tables: &FieldTypeTables) -> Result<Self> {
        if tables.fallback.trim().is_empty() {
            return Err(ModelError::configuration("fallback field type must not be empty"));
        }
        if tables.parameter_fallback.trim().is_empty() {
            return Err(ModelError::configuration(
                "parameter fallback type must not be empty",
            ));
        }

        Ok(Self {
            concrete: invert("concrete", &tables.concrete)?,
            value: invert("value", &tables.value)?,
            parameter: invert("parameter", &tables.parameter)?,
            fallback: tables.fallback.clone(),
            parameter_fallback: tables.parameter_fallback.clone(),
        })
    }

    /// Concrete field type of a raw tag, or the fallback
    pub fn concrete_type(&self, tag: &str) -> &str {
        self.concrete
            .get(&tag.trim().to_lowercase())
            .map(String::as_str)
            .unwrap_or(self.fallback.as_str())
    }

    /// Data-access contract type of a raw tag
    pub fn contract_type(&self, tag: &str) -> String {
        contract_name(self.concrete_type(tag))
    }

    /// Value projection type of a raw tag, if one is mapped
    pub fn value_type(&self, tag: &str) -> Option<&str> {
        self.value.get(&tag.trim().to_lowercase()).map(String::as_str)
    }

    /// Parameter type of a raw tag, or the parameter fallback
    pub fn parameter_type(&self, tag: &str) -> &str {
        self.parameter
            .get(&tag.trim().to_lowercase())
            .map(String::as_str)
            .unwrap_or(self.parameter_fallback.as_str())
    }
}

/// Contract name of a concrete type: `I` prefixed to the last dotted segment
pub fn contract_name(concrete: &str) -> String {
    match concrete.rsplit_once('.') {
        Some((namespace, name)) => format!("{}.I{}", namespace, name),
        None => format!("I{}", concrete),
    }
}

fn invert(table: &str, entries: &BTreeMap<String, Vec<String>>) -> Result<HashMap<String, String>> {
    entries
        .iter()
        .flat_map(|(owner, tags)| tags.iter().map(move |tag| (owner, tag)))
        .try_fold(HashMap::<String, String>::new(), |mut map, (owner, tag)| {
            let key = tag.trim().to_lowercase();
            if let Some(existing) = map.get(&key).filter(|existing| *existing != owner) {
                return Err(ModelError::configuration(format!(
                    "field type tag '{}' in {} table is mapped to both '{}' and '{}'",
                    tag, table, existing, owner
                )));
            }
            map.insert(key, owner.clone());
            Ok(map)
        })
}
