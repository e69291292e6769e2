//! Raw item records produced by the parser
//!
//! These types mirror the serialized records one-to-one. They are created
//! once by the parser and never mutated afterwards; everything downstream
//! shares them behind `Arc`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an item, field or template (128-bit)
pub type ItemId = Uuid;

/// Identifier of an item set
pub type ItemSetId = Uuid;

/// Namespace used to derive stable set ids from set names
const SET_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_8a2e_4d3b_4f0a_9e57_1b2c_3d4e_5f60);

/// Derive a deterministic set id from a set name
pub fn set_id_from_name(name: &str) -> ItemSetId {
    Uuid::new_v5(&SET_ID_NAMESPACE, name.to_lowercase().as_bytes())
}

/// Render an identifier in its canonical bracketed-uppercase form
pub fn bracketed(id: &Uuid) -> String {
    format!("{{{}}}", id.hyphenated()).to_uppercase()
}

/// A single field value on an item or version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field definition id
    pub id: ItemId,
    /// Field name (always interned)
    pub name: Arc<str>,
    /// Raw field value (interned only for configured high-cardinality names)
    pub value: Arc<str>,
}

impl Field {
    /// Create a field from owned parts
    pub fn new(id: ItemId, name: impl Into<Arc<str>>, value: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            name: name.into(),
            value: value.into(),
        }
    }

    /// Whether this field's name matches `name` case-insensitively
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One language/version of an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVersion {
    /// Language code (e.g. "en")
    pub language: String,
    /// Version number within the language
    pub version: u32,
    /// Revision identifier
    pub revision: Uuid,
    /// Versioned fields keyed by field id
    pub fields: BTreeMap<ItemId, Field>,
}

impl LanguageVersion {
    /// Look up a versioned field by name (case-insensitive)
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields.values().find(|f| f.is_named(name))
    }
}

/// A serialized content item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Item id
    pub id: ItemId,
    /// Item name
    pub name: String,
    /// Parent item id
    pub parent_id: ItemId,
    /// Path of the item in the content tree
    pub path: String,
    /// File the item was read from
    pub origin: PathBuf,
    /// Set the item belongs to
    pub set_id: ItemSetId,
    /// Unversioned fields in source order
    pub shared_fields: Vec<Field>,
    /// Template the item is an instance of
    pub template_id: ItemId,
    /// Name of the template the item is an instance of
    pub template_name: String,
    /// Language versions in source order
    pub versions: Vec<LanguageVersion>,
    /// Out-of-band metadata (e.g. an explicit namespace override)
    pub hints: HashMap<String, String>,
}

impl Item {
    /// Look up a shared field by name (case-insensitive)
    pub fn shared_field(&self, name: &str) -> Option<&Field> {
        self.shared_fields.iter().find(|f| f.is_named(name))
    }

    /// Look up a shared field by definition id
    pub fn shared_field_by_id(&self, id: &ItemId) -> Option<&Field> {
        self.shared_fields.iter().find(|f| f.id == *id)
    }

    /// Look up a versioned field, preferring `language` and falling back to any version
    pub fn versioned_field(&self, language: &str, name: &str) -> Option<&Field> {
        self.versions
            .iter()
            .filter(|v| v.language.eq_ignore_ascii_case(language))
            .rev()
            .find_map(|v| v.field_named(name))
            .or_else(|| self.versions.iter().find_map(|v| v.field_named(name)))
    }

    /// Look up a hint value by key (case-insensitive)
    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Segments of the item path, without empty segments
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// A raw serialized file discovered by an external scanner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFile {
    /// Path of the file on disk
    pub path: PathBuf,
    /// Arbitrary string-keyed properties attached by the scanner
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ItemFile {
    /// Create an item file without properties
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            properties: HashMap::new(),
        }
    }

    /// Attach a property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A group of items from one logical source project
#[derive(Debug, Clone)]
pub struct ItemSet {
    /// Set id
    pub id: ItemSetId,
    /// Set name
    pub name: String,
    /// Root namespace for generated code
    pub namespace: String,
    /// Directory the set's items were read from
    pub item_path: PathBuf,
    /// Output root for generated code, if the set produces any
    pub output_path: Option<PathBuf>,
    /// Ids of sets this set depends on
    pub references: Vec<ItemSetId>,
    items: Vec<Arc<Item>>,
    ids: HashSet<ItemId>,
}

impl ItemSet {
    /// Create an empty set
    pub fn new(id: ItemSetId, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            namespace: namespace.into(),
            item_path: PathBuf::new(),
            output_path: None,
            references: Vec::new(),
            items: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Set the directory items are read from
    pub fn with_item_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.item_path = path.into();
        self
    }

    /// Set the output root
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Add a referenced set id
    pub fn with_reference(mut self, id: ItemSetId) -> Self {
        self.references.push(id);
        self
    }

    /// Add an item, returning false if its id already exists in this set
    pub fn push(&mut self, item: Arc<Item>) -> bool {
        if !self.ids.insert(item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Items in insertion order
    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    /// Number of items in the set
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copy of the set metadata without its items
    pub fn descriptor(&self) -> ItemSet {
        ItemSet {
            id: self.id,
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            item_path: self.item_path.clone(),
            output_path: self.output_path.clone(),
            references: self.references.clone(),
            items: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u128) -> Item {
        Item {
            id: Uuid::from_u128(id),
            name: format!("item-{id}"),
            parent_id: Uuid::nil(),
            path: "/sitecore/templates/Feature/Item".to_string(),
            origin: PathBuf::from("item.item"),
            set_id: Uuid::nil(),
            shared_fields: vec![Field::new(Uuid::from_u128(9), "Type", "Single-Line Text")],
            template_id: Uuid::nil(),
            template_name: "Template field".to_string(),
            versions: vec![],
            hints: HashMap::from([("Namespace".to_string(), "Foo.Bar".to_string())]),
        }
    }

    #[test]
    fn test_bracketed_form() {
        let id = Uuid::parse_str("1930bbeb-7805-471a-a3be-4858ac7cf696").unwrap();
        assert_eq!(bracketed(&id), "{1930BBEB-7805-471A-A3BE-4858AC7CF696}");
    }

    #[test]
    fn test_set_id_from_name_is_stable_and_case_insensitive() {
        assert_eq!(set_id_from_name("Feature.Nav"), set_id_from_name("feature.nav"));
        assert_ne!(set_id_from_name("Feature.Nav"), set_id_from_name("Feature.Search"));
    }

    #[test]
    fn test_item_set_rejects_duplicate_ids() {
        let mut set = ItemSet::new(Uuid::nil(), "set", "Ns");
        assert!(set.push(Arc::new(item(1))));
        assert!(!set.push(Arc::new(item(1))));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_item_lookups_are_case_insensitive() {
        let item = item(1);
        assert_eq!(&*item.shared_field("type").unwrap().value, "Single-Line Text");
        assert_eq!(item.hint("namespace"), Some("Foo.Bar"));
        assert_eq!(item.path_segments(), vec!["sitecore", "templates", "Feature", "Item"]);
    }

    #[test]
    fn test_descriptor_drops_items() {
        let mut set = ItemSet::new(Uuid::nil(), "set", "Ns").with_output_path("out");
        set.push(Arc::new(item(1)));
        let descriptor = set.descriptor();
        assert!(descriptor.is_empty());
        assert_eq!(descriptor.output_path, Some(PathBuf::from("out")));
    }
}
